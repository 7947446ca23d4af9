// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene graph: one node tree per window plus per-window painting state.

use alloc::collections::BTreeMap;

use kurbo::Rect;
use understory_dirty::EagerPolicy;

use super::id::{NodeId, NodeKind};
use super::store::SceneStore;
use super::window::{PaintDisabled, SceneWindow};
use crate::dirty;
use crate::model::{SurfaceId, WindowId, WindowModel, WindowState};
use crate::quad::{QuadKind, WindowQuadList};
use crate::region::Region;

/// Node trees of every composited window.
///
/// Window-model notifications only mark dirty channels; the trees are brought
/// up to date by [`update`](Self::update), once per frame, before painting.
#[derive(Debug, Default)]
pub struct SceneGraph {
    pub(crate) store: SceneStore,
    pub(crate) windows: BTreeMap<WindowId, SceneWindow>,
}

impl SceneGraph {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node store.
    #[must_use]
    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    /// Returns the record of `window`.
    #[must_use]
    pub fn window(&self, window: WindowId) -> Option<&SceneWindow> {
        self.windows.get(&window)
    }

    /// Returns `true` if `window` is part of the scene.
    #[must_use]
    pub fn contains(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    /// Number of windows in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` if the scene has no windows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    // -- Lifecycle --

    /// Adds a window entering compositing.
    ///
    /// The window starts with a root and an unbound main surface node; the
    /// rest of its tree is built by the next [`update`](Self::update).
    ///
    /// # Panics
    ///
    /// Panics if the window is already part of the scene.
    pub fn add_window(&mut self, window: WindowId) {
        assert!(
            !self.windows.contains_key(&window),
            "window already in scene: {window:?}"
        );
        let root = self.store.create_node(NodeKind::Root, window, None);
        let surface = self.store.create_node(NodeKind::Surface, window, None);
        self.store.append_child(root.idx, surface.idx);
        self.store.dirty.mark(root.idx, dirty::CHILDREN);
        self.windows.insert(window, SceneWindow::new(root, surface));
    }

    /// Destroys the tree of a window leaving compositing.
    ///
    /// # Panics
    ///
    /// Panics if the window is not part of the scene.
    pub fn remove_window(&mut self, window: WindowId) {
        let record = self.windows.remove(&window);
        assert!(record.is_some(), "window not in scene: {window:?}");
        if let Some(record) = record {
            self.store.destroy_subtree(record.root);
        }
    }

    /// Handles a window closing.
    ///
    /// With a placeholder, the whole tree (pixmaps included) is handed over
    /// to the placeholder so it can play the closing animation. Without one,
    /// the tree is destroyed.
    ///
    /// # Panics
    ///
    /// Panics if `window` is not part of the scene, or if the placeholder
    /// already is.
    pub fn window_closed(&mut self, window: WindowId, placeholder: Option<WindowId>) {
        let Some(placeholder) = placeholder else {
            self.remove_window(window);
            return;
        };
        assert!(
            !self.windows.contains_key(&placeholder),
            "window already in scene: {placeholder:?}"
        );
        let record = self.windows.remove(&window);
        assert!(record.is_some(), "window not in scene: {window:?}");
        let Some(record) = record else {
            return;
        };
        let nodes: alloc::vec::Vec<u32> = self
            .store
            .descendants(record.root)
            .map(NodeId::index)
            .collect();
        for idx in nodes {
            self.store.window[idx as usize] = placeholder;
        }
        self.windows.insert(placeholder, record);
    }

    // -- Notifications --

    /// The frame geometry or custom shape of `window` changed.
    pub fn geometry_shape_changed(&mut self, window: WindowId) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        record.quad_cache = None;
        self.store
            .dirty
            .mark_with(record.root.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// The sub-surface tree of `window` changed.
    pub fn sub_surfaces_changed(&mut self, window: WindowId) {
        if let Some(record) = self.windows.get(&window) {
            self.store.dirty.mark(record.root.idx, dirty::CHILDREN);
        }
    }

    /// The server-side shadow of `window` appeared, disappeared or changed.
    pub fn shadow_changed(&mut self, window: WindowId) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        record.quad_cache = None;
        self.store.dirty.mark(record.root.idx, dirty::CHILDREN);
        if let Some(shadow) = record.shadow {
            self.store
                .dirty
                .mark_with(shadow.idx, dirty::GEOMETRY, &EagerPolicy);
            self.store
                .dirty
                .mark_with(shadow.idx, dirty::VISIBILITY, &EagerPolicy);
        }
    }

    /// The server-side decoration of `window` appeared, disappeared or
    /// changed.
    pub fn decoration_changed(&mut self, window: WindowId) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        record.quad_cache = None;
        self.store.dirty.mark(record.root.idx, dirty::CHILDREN);
        if let Some(decoration) = record.decoration {
            self.store
                .dirty
                .mark_with(decoration.idx, dirty::GEOMETRY, &EagerPolicy);
        }
    }

    /// The output scale of `window` changed.
    ///
    /// Geometry is recomputed and every pixmap of the window is replaced.
    pub fn scale_changed(&mut self, window: WindowId) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        record.quad_cache = None;
        self.store
            .dirty
            .mark_with(record.root.idx, dirty::GEOMETRY, &EagerPolicy);
        for &node in &record.paint_order {
            if self.store.kind[node.idx as usize] == NodeKind::Surface {
                self.store.dirty.mark(node.idx, dirty::PIXEL_SOURCE);
            }
        }
    }

    /// A new buffer was attached to `surface` of `window`.
    ///
    /// The bound pixmap is replaced and the node's geometry refreshed, since
    /// the buffer may have a different size.
    pub fn buffer_changed(&mut self, window: WindowId, surface: SurfaceId) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        let Some(node) = self
            .store
            .descendants(record.root)
            .find(|n| self.store.surface[n.idx as usize] == Some(surface))
        else {
            return;
        };
        record.quad_cache = None;
        self.store.dirty.mark(node.idx, dirty::PIXEL_SOURCE);
        self.store
            .dirty
            .mark_with(node.idx, dirty::GEOMETRY, &EagerPolicy);
        self.store
            .dirty
            .mark_with(node.idx, dirty::VISIBILITY, &EagerPolicy);
    }

    /// The visibility of `window` (hidden, surface mapping, shadow
    /// rendering) changed.
    pub fn visibility_changed(&mut self, window: WindowId) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        record.quad_cache = None;
        self.store
            .dirty
            .mark_with(record.root.idx, dirty::VISIBILITY, &EagerPolicy);
    }

    /// Schedules `region` (output coordinates) of `window` for repaint.
    pub fn add_repaint(&mut self, window: WindowId, region: &Region) {
        if let Some(record) = self.windows.get_mut(&window) {
            record.repaints |= region;
        }
    }

    /// Takes the pending repaints of `window`.
    pub fn take_repaints(&mut self, window: WindowId) -> Region {
        self.windows
            .get_mut(&window)
            .map(|r| core::mem::take(&mut r.repaints))
            .unwrap_or_default()
    }

    // -- Painting state --

    /// Adds a painting-disabled reason.
    pub fn disable_painting(&mut self, window: WindowId, reason: PaintDisabled) {
        if let Some(record) = self.windows.get_mut(&window) {
            record.disabled |= reason;
        }
    }

    /// Removes a painting-disabled reason.
    pub fn enable_painting(&mut self, window: WindowId, reason: PaintDisabled) {
        if let Some(record) = self.windows.get_mut(&window) {
            record.disabled -= reason;
        }
    }

    /// Replaces the painting-disabled reasons of `window`.
    pub fn set_painting_disabled(&mut self, window: WindowId, reasons: PaintDisabled) {
        if let Some(record) = self.windows.get_mut(&window) {
            record.disabled = reasons;
        }
    }

    /// Returns `true` if no painting-disabled reason is set.
    #[must_use]
    pub fn is_painting_enabled(&self, window: WindowId) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|r| r.disabled.is_empty())
    }

    /// Recomputes the painting-disabled reasons of `window` from its state.
    ///
    /// `rendering_desktop` is the virtual desktop being painted when it is
    /// not the current one (desktop previews).
    pub fn reset_painting_enabled<M: WindowModel + ?Sized>(
        &mut self,
        model: &M,
        window: WindowId,
        rendering_desktop: Option<u32>,
    ) {
        let Some(record) = self.windows.get_mut(&window) else {
            return;
        };
        let state = model.state(window);
        let mut disabled = PaintDisabled::empty();
        if state.contains(WindowState::DELETED) {
            disabled |= PaintDisabled::BY_DELETE;
        }
        let on_desktop = match rendering_desktop {
            Some(desktop) => model.is_on_desktop(window, desktop),
            None => state.contains(WindowState::ON_CURRENT_DESKTOP),
        };
        if !on_desktop {
            disabled |= PaintDisabled::BY_DESKTOP;
        }
        if !state.contains(WindowState::ON_CURRENT_ACTIVITY) {
            disabled |= PaintDisabled::BY_ACTIVITY;
        }
        if state.contains(WindowState::MINIMIZED) {
            disabled |= PaintDisabled::BY_MINIMIZE;
        }
        if state.contains(WindowState::HIDDEN) {
            disabled |= PaintDisabled::DISABLED;
        }
        record.disabled = disabled;
    }

    // -- Queries --

    /// Returns `true` if `window` would be shown on the current desktop.
    #[must_use]
    pub fn is_visible<M: WindowModel + ?Sized>(&self, model: &M, window: WindowId) -> bool {
        let Some(record) = self.windows.get(&window) else {
            return false;
        };
        let state = model.state(window);
        let shown = WindowState::ON_CURRENT_DESKTOP | WindowState::ON_CURRENT_ACTIVITY;
        let hidden = WindowState::DELETED | WindowState::MINIMIZED | WindowState::HIDDEN;
        state.contains(shown)
            && !state.intersects(hidden)
            && self.store.visible[record.root.idx as usize]
    }

    /// Returns `true` if `window` is fully opaque.
    #[must_use]
    pub fn is_opaque<M: WindowModel + ?Sized>(&self, model: &M, window: WindowId) -> bool {
        model.opacity(window) >= 1.0 && !model.has_alpha(window)
    }

    /// Returns the frame-local window shape.
    #[must_use]
    pub fn shape(&self, window: WindowId) -> Region {
        self.windows
            .get(&window)
            .map(|r| self.store.shape[r.root.idx as usize].clone())
            .unwrap_or_default()
    }

    /// Returns the frame-local shape of the client area: empty for shaded
    /// windows, otherwise the window shape clipped to the client rectangle.
    #[must_use]
    pub fn client_shape<M: WindowModel + ?Sized>(&self, model: &M, window: WindowId) -> Region {
        if model.state(window).contains(WindowState::SHADED) {
            return Region::new();
        }
        let frame = model.frame_geometry(window);
        let client = model.client_geometry(window) - frame.origin().to_vec2();
        let mut shape = self.shape(window);
        shape &= client;
        shape
    }

    /// Returns the frame geometry extended by the shadow, in output
    /// coordinates.
    #[must_use]
    pub fn expanded_geometry(&self, window: WindowId) -> Rect {
        let Some(record) = self.windows.get(&window) else {
            return Rect::ZERO;
        };
        let root = record.root.idx;
        let origin = self.store.position[root as usize];
        let frame = Rect::from_origin_size(origin, self.store.size[root as usize]);
        match record.shadow {
            Some(shadow) if self.store.visible[shadow.idx as usize] => {
                let s = shadow.idx as usize;
                let rect = Rect::from_origin_size(self.store.position[s], self.store.size[s]);
                frame.union(rect + origin.to_vec2())
            }
            _ => frame,
        }
    }

    /// Builds the quads of `window`, frame-local, in paint order.
    ///
    /// Only visible nodes contribute; surface nodes also need a valid
    /// pixmap. The result is cached until the window's tree changes.
    pub fn build_quads(&mut self, window: WindowId) -> WindowQuadList {
        let Some(record) = self.windows.get_mut(&window) else {
            return WindowQuadList::new();
        };
        if let Some(cached) = &record.quad_cache {
            return cached.clone();
        }
        let mut quads = WindowQuadList::new();
        for &node in &record.paint_order {
            let i = node.idx as usize;
            if !self.store.visible[i] {
                continue;
            }
            if self.store.kind[i] == NodeKind::Surface
                && !self.store.pixmap[i].as_ref().is_some_and(|p| p.is_valid())
            {
                continue;
            }
            quads.extend_from(&self.store.quads[i]);
        }
        record.quad_cache = Some(quads.clone());
        quads
    }

    /// Returns the node a quad was built from.
    #[must_use]
    pub fn quad_node(&self, window: WindowId, paint_order: u32) -> Option<NodeId> {
        self.windows
            .get(&window)?
            .paint_order
            .get(paint_order as usize)
            .copied()
    }

    /// Returns the quad kind produced by a node kind, or `None` for roots.
    pub(crate) fn quad_kind(kind: NodeKind) -> Option<QuadKind> {
        match kind {
            NodeKind::Root => None,
            NodeKind::Shadow => Some(QuadKind::Shadow),
            NodeKind::Decoration => Some(QuadKind::Decoration),
            NodeKind::Surface => Some(QuadKind::Contents),
        }
    }

    /// Iterates over the windows of the scene in id order.
    pub fn windows(&self) -> impl Iterator<Item = (WindowId, &SceneWindow)> + '_ {
        self.windows.iter().map(|(&w, r)| (w, r))
    }
}
