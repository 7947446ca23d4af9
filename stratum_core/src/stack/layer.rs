// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stacking layers and the policy input that assigns windows to them.

use crate::model::{GroupId, OutputId, WindowId};

/// A coarse ordering bucket, bottom to top.
///
/// Windows are sorted into layers before constraints are applied; a window
/// never ends up below a window of a lower layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Layer {
    /// Desktop background windows.
    Desktop,
    /// Windows kept below others.
    Below,
    /// Ordinary windows.
    #[default]
    Normal,
    /// Panels and docks.
    Dock,
    /// Windows kept above others.
    Above,
    /// Notifications.
    Notification,
    /// The active fullscreen window.
    Active,
    /// Popup menus and tooltips.
    Popup,
    /// Notifications that must stay above fullscreen windows.
    CriticalNotification,
    /// On-screen displays (volume, brightness).
    OnScreenDisplay,
    /// Override-redirect windows.
    Unmanaged,
}

impl Layer {
    /// Number of layers.
    pub const COUNT: usize = 11;

    /// Position of the layer in the bottom-to-top order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Functional type of a window, as far as stacking cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum WindowType {
    /// An ordinary top-level window.
    #[default]
    Normal,
    /// The desktop background.
    Desktop,
    /// A panel.
    Dock,
    /// A torn-off toolbar.
    Toolbar,
    /// A torn-off menu.
    Menu,
    /// A dialog.
    Dialog,
    /// A utility window (palette, inspector).
    Utility,
    /// A splash screen.
    Splash,
    /// A notification bubble.
    Notification,
    /// An on-screen display.
    OnScreenDisplay,
}

impl WindowType {
    /// Returns `true` for window types that follow their group up into
    /// higher layers.
    #[must_use]
    pub const fn is_layer_promotable(self) -> bool {
        matches!(self, Self::Dialog | Self::Utility)
    }
}

/// Layering input read by [`StackingOrder::rebuild`](super::StackingOrder::rebuild).
///
/// The policy decides layers; the stacking order only reads them.
pub trait LayerPolicy {
    /// The layer the window manager assigns to `window`.
    fn layer(&self, window: WindowId) -> Layer;

    /// The window's functional type.
    fn window_type(&self, window: WindowId) -> WindowType {
        _ = window;
        WindowType::Normal
    }

    /// The ownership group of `window`, if any.
    fn group(&self, window: WindowId) -> Option<GroupId> {
        _ = window;
        None
    }

    /// Members of `group`, including the window asking.
    fn group_members(&self, group: GroupId) -> &[WindowId] {
        _ = group;
        &[]
    }

    /// The output the window is on.
    fn output(&self, window: WindowId) -> OutputId {
        _ = window;
        OutputId(0)
    }
}

/// Returns the layer `window` is sorted into.
///
/// Dialog and utility windows are raised to the highest layer of any other
/// member of their group on the same output, so a dialog never sinks below
/// its raised parent.
pub(super) fn effective_layer<P: LayerPolicy + ?Sized>(policy: &P, window: WindowId) -> Layer {
    let mut layer = policy.layer(window);
    if !policy.window_type(window).is_layer_promotable() {
        return layer;
    }
    let Some(group) = policy.group(window) else {
        return layer;
    };
    let output = policy.output(window);
    for &member in policy.group_members(group) {
        if member == window || policy.output(member) != output {
            continue;
        }
        layer = layer.max(policy.layer(member));
    }
    layer
}
