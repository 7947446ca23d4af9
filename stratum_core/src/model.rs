// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The window model as seen by the compositing core.
//!
//! Windows are owned by the surrounding window manager. The core refers to
//! them by [`WindowId`] and reads their state through the [`WindowModel`]
//! trait; it never creates or destroys them.
//!
//! All rectangles returned by [`WindowModel`] are in output (screen)
//! coordinates unless noted otherwise. Regions and positions described as
//! "frame-local" are relative to the top-left corner of the frame geometry.

use core::fmt;

use kurbo::{Point, Rect, Size};

use crate::pixmap::PixelSourceKind;
use crate::region::Region;

/// Identifies a window of the window model.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u32);

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({})", self.0)
    }
}

/// Identifies an ownership group (an application and its transients).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u32);

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

/// Identifies a display output.
///
/// Backends assign output IDs; core code passes them through without
/// interpreting the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutputId(pub u32);

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self.0)
    }
}

/// An opaque reference to a content surface (a window's main surface or one
/// of its sub-surfaces).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u32);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

bitflags::bitflags! {
    /// Window state bits the core reacts to.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WindowState: u32 {
        /// The window is on the virtual desktop currently shown.
        const ON_CURRENT_DESKTOP = 1 << 0;
        /// The window is on the activity currently shown.
        const ON_CURRENT_ACTIVITY = 1 << 1;
        /// The window is minimized.
        const MINIMIZED = 1 << 2;
        /// The window manager hides the window internally.
        const HIDDEN = 1 << 3;
        /// Only the title bar of the window is shown.
        const SHADED = 1 << 4;
        /// The window covers its whole output.
        const FULLSCREEN = 1 << 5;
        /// The window is a closed placeholder kept for a closing animation.
        const DELETED = 1 << 6;
        /// The closed window must not be animated out.
        const SKIPS_CLOSE_ANIMATION = 1 << 7;
        /// The window is the screen locker.
        const LOCK_SCREEN = 1 << 8;
        /// The window is an input method panel.
        const INPUT_METHOD = 1 << 9;
        /// The window is managed (not an override-redirect or unmanaged
        /// window).
        const MANAGED = 1 << 10;
    }
}

impl WindowState {
    /// State of an ordinary, visible, managed window.
    pub const NORMAL: Self = Self::ON_CURRENT_DESKTOP
        .union(Self::ON_CURRENT_ACTIVITY)
        .union(Self::MANAGED);
}

/// A server-side drop shadow.
#[derive(Clone, Debug, PartialEq)]
pub struct Shadow {
    /// Shadow bounds, frame-local. Usually extends beyond the frame.
    pub rect: Rect,
    /// Painted part of the shadow, relative to the top-left of [`rect`](Self::rect).
    pub region: Region,
    /// Whether the window currently wants its shadow rendered.
    pub rendered: bool,
}

/// A server-side decoration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Decoration {
    /// Whether the decoration uses an alpha channel (rounded corners,
    /// translucent title bar).
    pub has_alpha: bool,
}

/// A live preview of another window, embedded in a host window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowThumbnail {
    /// The previewed window. `None` once that window is gone.
    pub target: Option<WindowId>,
    /// Item bounds, frame-local to the host window.
    pub rect: Rect,
    /// Optional clip rectangle, frame-local to the host window.
    pub clip: Option<Rect>,
    /// Whether the preview item is visible.
    pub visible: bool,
    /// Brightness multiplier.
    pub brightness: f64,
    /// Saturation multiplier.
    pub saturation: f64,
}

/// A live preview of a whole virtual desktop, embedded in a host window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesktopThumbnail {
    /// The previewed virtual desktop.
    pub desktop: u32,
    /// Item bounds, frame-local to the host window.
    pub rect: Rect,
    /// Optional clip rectangle, frame-local to the host window.
    pub clip: Option<Rect>,
    /// Whether the preview item is visible.
    pub visible: bool,
}

/// Read access to the window state owned by the window manager.
///
/// The scene graph and paint pipeline call these queries during
/// [`SceneGraph::update`](crate::scene::SceneGraph::update) and painting; they
/// must be cheap and side-effect free.
pub trait WindowModel {
    /// Frame geometry (decoration included), in output coordinates.
    fn frame_geometry(&self, window: WindowId) -> Rect;

    /// Geometry of the main surface buffer, in output coordinates.
    fn buffer_geometry(&self, window: WindowId) -> Rect;

    /// Geometry of the client area (frame minus decoration), in output
    /// coordinates.
    fn client_geometry(&self, window: WindowId) -> Rect;

    /// Window opacity in `0.0..=1.0`.
    fn opacity(&self, window: WindowId) -> f64;

    /// Whether the window content has an alpha channel.
    fn has_alpha(&self, window: WindowId) -> bool;

    /// Part of an alpha window known to be opaque, client-local.
    fn opaque_region(&self, window: WindowId) -> Region {
        _ = window;
        Region::new()
    }

    /// Current state bits.
    fn state(&self, window: WindowId) -> WindowState;

    /// Whether the window is on the given virtual desktop.
    fn is_on_desktop(&self, window: WindowId, desktop: u32) -> bool;

    /// Custom (non-rectangular) window shape, frame-local. `None` means the
    /// whole frame.
    fn shape(&self, window: WindowId) -> Option<Region> {
        _ = window;
        None
    }

    /// Server-side shadow, if any.
    fn shadow(&self, window: WindowId) -> Option<&Shadow> {
        _ = window;
        None
    }

    /// Server-side decoration, if any.
    fn decoration(&self, window: WindowId) -> Option<Decoration> {
        _ = window;
        None
    }

    /// The window's main content surface.
    fn surface(&self, window: WindowId) -> SurfaceId;

    /// Sub-surfaces of `surface`, bottom to top.
    fn sub_surfaces(&self, surface: SurfaceId) -> &[SurfaceId] {
        _ = surface;
        &[]
    }

    /// Position of a sub-surface relative to its parent surface.
    fn sub_surface_position(&self, surface: SurfaceId) -> Point {
        _ = surface;
        Point::ORIGIN
    }

    /// Size of a surface.
    fn surface_size(&self, surface: SurfaceId) -> Size;

    /// Whether a surface currently has content attached.
    fn surface_mapped(&self, surface: SurfaceId) -> bool {
        _ = surface;
        true
    }

    /// Which kind of pixel source backs the window's surfaces.
    fn pixel_source_kind(&self, window: WindowId) -> PixelSourceKind {
        _ = window;
        PixelSourceKind::SharedBuffer
    }

    /// Whether the session is locked.
    fn is_screen_locked(&self) -> bool {
        false
    }

    /// Window previews hosted by `window`.
    fn window_thumbnails(&self, window: WindowId) -> &[WindowThumbnail] {
        _ = window;
        &[]
    }

    /// Desktop previews hosted by `window`.
    fn desktop_thumbnails(&self, window: WindowId) -> &[DesktopThumbnail] {
        _ = window;
        &[]
    }
}
