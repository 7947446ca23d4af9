// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-window scene records.

use alloc::vec::Vec;

use super::id::NodeId;
use crate::quad::WindowQuadList;
use crate::region::Region;

bitflags::bitflags! {
    /// Reasons a window is currently left out of painting.
    ///
    /// A window is painted only while no reason is set.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PaintDisabled: u32 {
        /// Disabled for an unspecified reason (hidden by the window manager,
        /// or by an effect).
        const DISABLED = 1 << 0;
        /// The window was closed and has no closing animation.
        const BY_DELETE = 1 << 1;
        /// The window is not on the desktop being painted.
        const BY_DESKTOP = 1 << 2;
        /// The window is minimized.
        const BY_MINIMIZE = 1 << 3;
        /// The window is not on the current activity.
        const BY_ACTIVITY = 1 << 5;
    }
}

/// The scene-side record of one window.
///
/// Holds the handles of the window's fixed nodes, the paint order of its
/// tree, and per-frame painting state.
#[derive(Clone, Debug)]
pub struct SceneWindow {
    pub(crate) root: NodeId,
    pub(crate) shadow: Option<NodeId>,
    pub(crate) decoration: Option<NodeId>,
    pub(crate) surface: NodeId,
    pub(crate) paint_order: Vec<NodeId>,
    pub(crate) disabled: PaintDisabled,
    pub(crate) repaints: Region,
    pub(crate) quad_cache: Option<WindowQuadList>,
}

impl SceneWindow {
    pub(crate) fn new(root: NodeId, surface: NodeId) -> Self {
        Self {
            root,
            shadow: None,
            decoration: None,
            surface,
            paint_order: Vec::new(),
            disabled: PaintDisabled::empty(),
            repaints: Region::new(),
            quad_cache: None,
        }
    }

    /// The window's root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The shadow node, while the window has a server-side shadow.
    #[must_use]
    pub fn shadow(&self) -> Option<NodeId> {
        self.shadow
    }

    /// The decoration node, while the window has a server-side decoration.
    #[must_use]
    pub fn decoration(&self) -> Option<NodeId> {
        self.decoration
    }

    /// The node of the window's main surface.
    #[must_use]
    pub fn surface(&self) -> NodeId {
        self.surface
    }

    /// Paintable nodes in paint order (the root excluded). The position of a
    /// node in this slice is its paint-order id.
    #[must_use]
    pub fn paint_order(&self) -> &[NodeId] {
        &self.paint_order
    }

    /// Current painting-disabled reasons.
    #[must_use]
    pub fn painting_disabled(&self) -> PaintDisabled {
        self.disabled
    }

    /// Screen area scheduled for repaint on the next frame.
    #[must_use]
    pub fn repaints(&self) -> &Region {
        &self.repaints
    }
}
