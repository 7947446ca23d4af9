// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame scene update and change tracking.
//!
//! Update follows a drain-recompute pattern for each dirty channel:
//!
//! 1. **CHILDREN**: Reconcile the tree of every marked window against the
//!    window model, then renumber its nodes in depth-first pre-order.
//! 2. **GEOMETRY**: Recompute position and size per node kind.
//! 3. **SHAPE**: Recompute the node-local shape per node kind.
//! 4. **VISIBILITY**: Recompute the effective visibility flag (the node's
//!    own flag and its ancestors').
//! 5. **QUADS**: Rebuild one quad per shape rectangle.
//! 6. **PIXEL_SOURCE**: Invalidate bound pixmaps.
//!
//! Earlier passes mark later channels, so everything a notification implies
//! is settled in a single update.

use alloc::vec::Vec;

use kurbo::{Point, Size};
use understory_dirty::EagerPolicy;

use super::graph::SceneGraph;
use super::id::{INVALID, NodeId, NodeKind};
use crate::dirty;
use crate::model::{SurfaceId, WindowId, WindowModel, WindowState};
use crate::pixmap::{PixelSourceRequest, PixmapFactory, WindowPixmap};
use crate::quad::WindowQuad;
use crate::region::Region;
use crate::trace::{PixmapFailureEvent, ReconcileEvent, Tracer};

/// The set of changes produced by a single [`SceneGraph::update`] call.
///
/// Node lists contain raw slot indices, usable with
/// [`SceneStore::pixmap_at`](super::SceneStore::pixmap_at) and friends.
#[derive(Clone, Debug, Default)]
pub struct SceneChanges {
    /// Windows whose tree was reconciled.
    pub reconciled: Vec<WindowId>,
    /// Nodes whose position or size was recomputed.
    pub geometry: Vec<u32>,
    /// Nodes whose shape was recomputed.
    pub shapes: Vec<u32>,
    /// Nodes whose visibility was recomputed.
    pub visibility: Vec<u32>,
    /// Nodes whose quads were rebuilt.
    pub quads: Vec<u32>,
    /// Surface nodes whose pixmap was invalidated.
    pub pixel_sources: Vec<u32>,
    /// Nodes created since the last update.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last update.
    pub removed: Vec<u32>,
}

impl SceneChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.reconciled.clear();
        self.geometry.clear();
        self.shapes.clear();
        self.visibility.clear();
        self.quads.clear();
        self.pixel_sources.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reconciled.is_empty()
            && self.geometry.is_empty()
            && self.shapes.is_empty()
            && self.visibility.is_empty()
            && self.quads.is_empty()
            && self.pixel_sources.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

/// Counters of one reconciliation.
#[derive(Clone, Copy, Debug, Default)]
struct Reconciled {
    created: u32,
    reused: u32,
    removed: u32,
}

impl SceneGraph {
    /// Brings every dirty node up to date and returns what changed.
    pub fn update<M: WindowModel + ?Sized>(&mut self, model: &M) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.update_into(model, &mut changes, 0, &mut Tracer::none());
        changes
    }

    /// Like [`update`](Self::update), reporting reconciliations to `tracer`.
    pub fn update_traced<M: WindowModel + ?Sized>(
        &mut self,
        model: &M,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
    ) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.update_into(model, &mut changes, frame_index, tracer);
        changes
    }

    /// Like [`update_traced`](Self::update_traced), but reuses a
    /// caller-provided buffer.
    pub fn update_into<M: WindowModel + ?Sized>(
        &mut self,
        model: &M,
        changes: &mut SceneChanges,
        frame_index: u64,
        tracer: &mut Tracer<'_>,
    ) {
        changes.clear();

        // CHILDREN is keyed by root nodes.
        let roots: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::CHILDREN)
            .deterministic()
            .run()
            .collect();
        for idx in roots {
            let is_root = self.store.is_live_index(idx)
                && self.store.kind[idx as usize] == NodeKind::Root;
            if !is_root {
                continue;
            }
            let window = self.store.window[idx as usize];
            let counts = self.reconcile(model, window);
            tracer.reconcile(&ReconcileEvent {
                window,
                created: counts.created,
                reused: counts.reused,
                removed: counts.removed,
            });
            changes.reconciled.push(window);
        }

        let mut geometry: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::GEOMETRY)
            .affected()
            .deterministic()
            .run()
            .collect();
        geometry.retain(|&idx| self.store.is_live_index(idx));
        for &idx in &geometry {
            self.update_geometry(model, idx);
            self.store.dirty.mark(idx, dirty::SHAPE);
            self.store.dirty.mark(idx, dirty::QUADS);
        }
        changes.geometry = geometry;

        let mut shapes: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::SHAPE)
            .deterministic()
            .run()
            .collect();
        shapes.retain(|&idx| self.store.is_live_index(idx));
        for &idx in &shapes {
            self.update_shape(model, idx);
            self.store.dirty.mark(idx, dirty::QUADS);
        }
        changes.shapes = shapes;

        let mut visibility: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::VISIBILITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        visibility.retain(|&idx| self.store.is_live_index(idx));
        for &idx in &visibility {
            self.update_visibility(model, idx);
        }
        changes.visibility = visibility;

        let mut quads: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::QUADS)
            .deterministic()
            .run()
            .collect();
        quads.retain(|&idx| self.store.is_live_index(idx));
        for &idx in &quads {
            self.update_quads(idx);
        }
        changes.quads = quads;

        let mut pixel_sources: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::PIXEL_SOURCE)
            .deterministic()
            .run()
            .collect();
        pixel_sources.retain(|&idx| self.store.is_live_index(idx));
        for &idx in &pixel_sources {
            if let Some(pixmap) = &mut self.store.pixmap[idx as usize] {
                pixmap.invalidate();
            }
        }
        changes.pixel_sources = pixel_sources;

        // Any touched window rebuilds its quad list on next use.
        for list in [
            &changes.geometry,
            &changes.visibility,
            &changes.quads,
            &changes.pixel_sources,
        ] {
            for &idx in list {
                let window = self.store.window[idx as usize];
                if let Some(record) = self.windows.get_mut(&window) {
                    record.quad_cache = None;
                }
            }
        }

        core::mem::swap(&mut self.store.pending_added, &mut changes.added);
        core::mem::swap(&mut self.store.pending_removed, &mut changes.removed);

        #[cfg(feature = "trace-rich")]
        self.trace_node_changes(changes, frame_index, tracer);
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = frame_index;
        }
    }

    /// (Re)creates pixmaps of visible surface nodes whose pixmap is missing,
    /// invalid or of the wrong size.
    ///
    /// A failed creation leaves the node without pixmap, so it is not
    /// painted, and is reported to `tracer`.
    pub fn update_pixmaps<M, F>(&mut self, model: &M, factory: &mut F, tracer: &mut Tracer<'_>)
    where
        M: WindowModel + ?Sized,
        F: PixmapFactory + ?Sized,
    {
        for (&window, record) in &mut self.windows {
            for &node in &record.paint_order {
                let i = node.idx as usize;
                if self.store.kind[i] != NodeKind::Surface || !self.store.visible[i] {
                    continue;
                }
                let Some(surface) = self.store.surface[i] else {
                    continue;
                };
                let size = self.store.size[i];
                if self.store.pixmap[i]
                    .as_ref()
                    .is_some_and(|p| p.is_usable_for(size))
                {
                    continue;
                }

                record.quad_cache = None;
                let request = PixelSourceRequest {
                    window,
                    surface,
                    kind: model.pixel_source_kind(window),
                    size,
                };
                match WindowPixmap::create(&mut *factory, &request) {
                    Ok(pixmap) => self.store.pixmap[i] = Some(pixmap),
                    Err(error) => {
                        self.store.pixmap[i] = None;
                        tracer.pixmap_failure(&PixmapFailureEvent {
                            window,
                            surface,
                            error,
                        });
                    }
                }
            }
        }
    }

    // -- Reconciliation --

    /// Brings the node set of `window` in line with the model.
    fn reconcile<M: WindowModel + ?Sized>(&mut self, model: &M, window: WindowId) -> Reconciled {
        let mut counts = Reconciled::default();
        let Some(record) = self.windows.get(&window) else {
            return counts;
        };
        let (root, surface_node) = (record.root, record.surface);
        let (mut shadow, mut decoration) = (record.shadow, record.decoration);

        // Shadow goes first under the root.
        match (shadow, model.shadow(window).is_some()) {
            (None, true) => {
                let node = self.store.create_node(NodeKind::Shadow, window, None);
                let first = self.store.first_child[root.idx as usize];
                self.store.link_before(root.idx, node.idx, first);
                shadow = Some(node);
                counts.created += 1;
            }
            (Some(node), false) => {
                counts.removed += self.store.destroy_subtree(node);
                shadow = None;
            }
            _ => {}
        }

        // Decoration sits right below the main surface.
        match (decoration, model.decoration(window).is_some()) {
            (None, true) => {
                let node = self.store.create_node(NodeKind::Decoration, window, None);
                self.store.link_before(root.idx, node.idx, surface_node.idx);
                decoration = Some(node);
                counts.created += 1;
            }
            (Some(node), false) => {
                counts.removed += self.store.destroy_subtree(node);
                decoration = None;
            }
            _ => {}
        }

        let main = model.surface(window);
        let s = surface_node.idx as usize;
        if self.store.surface[s] != Some(main) {
            self.store.surface[s] = Some(main);
            self.store.pixmap[s] = None;
            self.store
                .dirty
                .mark_with(surface_node.idx, dirty::GEOMETRY, &EagerPolicy);
            self.store
                .dirty
                .mark_with(surface_node.idx, dirty::VISIBILITY, &EagerPolicy);
        }
        self.reconcile_surfaces(model, window, surface_node.idx, main, &mut counts);

        // Renumber in pre-order, the root excluded.
        let order: Vec<NodeId> = self.store.descendants(root).skip(1).collect();
        for (id, node) in order.iter().enumerate() {
            let id = index_of(id);
            let slot = &mut self.store.paint_order[node.idx as usize];
            if *slot != id {
                *slot = id;
                self.store.dirty.mark(node.idx, dirty::QUADS);
            }
        }

        if let Some(record) = self.windows.get_mut(&window) {
            record.shadow = shadow;
            record.decoration = decoration;
            record.paint_order = order;
            record.quad_cache = None;
        }
        counts
    }

    /// Matches the children of surface node `node` against the sub-surfaces
    /// of `surface`, depth first.
    fn reconcile_surfaces<M: WindowModel + ?Sized>(
        &mut self,
        model: &M,
        window: WindowId,
        node: u32,
        surface: SurfaceId,
        counts: &mut Reconciled,
    ) {
        let mut cursor = self.store.first_child[node as usize];
        for &sub in model.sub_surfaces(surface) {
            let mut found = cursor;
            while found != INVALID && self.store.surface[found as usize] != Some(sub) {
                found = self.store.next_sibling[found as usize];
            }

            let child = if found == INVALID {
                let created = self.store.create_node(NodeKind::Surface, window, Some(sub));
                self.store.link_before(node, created.idx, cursor);
                counts.created += 1;
                created.idx
            } else {
                if found == cursor {
                    cursor = self.store.next_sibling[cursor as usize];
                } else {
                    self.store.link_before(node, found, cursor);
                }
                counts.reused += 1;
                found
            };
            self.reconcile_surfaces(model, window, child, sub, counts);
        }

        while cursor != INVALID {
            let next = self.store.next_sibling[cursor as usize];
            counts.removed += self.store.destroy_subtree(self.store.handle(cursor));
            cursor = next;
        }
    }

    // -- Per-kind attribute rules --

    fn update_geometry<M: WindowModel + ?Sized>(&mut self, model: &M, idx: u32) {
        let i = idx as usize;
        let window = self.store.window[i];
        let frame = model.frame_geometry(window);
        let (position, size) = match self.store.kind[i] {
            NodeKind::Root => (frame.origin(), frame.size()),
            NodeKind::Shadow => model
                .shadow(window)
                .map_or((Point::ORIGIN, Size::ZERO), |s| (s.rect.origin(), s.rect.size())),
            NodeKind::Decoration => (Point::ORIGIN, frame.size()),
            NodeKind::Surface => match self.store.surface[i] {
                None => (Point::ORIGIN, Size::ZERO),
                Some(surface) => {
                    let parent = self.store.parent[i];
                    if parent != INVALID && self.store.kind[parent as usize] == NodeKind::Root {
                        let buffer = model.buffer_geometry(window);
                        ((buffer.origin() - frame.origin()).to_point(), buffer.size())
                    } else {
                        (
                            model.sub_surface_position(surface),
                            model.surface_size(surface),
                        )
                    }
                }
            },
        };
        self.store.position[i] = position;
        self.store.size[i] = size;
    }

    fn update_shape<M: WindowModel + ?Sized>(&mut self, model: &M, idx: u32) {
        let i = idx as usize;
        let window = self.store.window[i];
        let local = self.store.local_rect_at(idx);
        let shape = match self.store.kind[i] {
            NodeKind::Root => match model.shape(window) {
                Some(mut custom) => {
                    custom &= local;
                    custom
                }
                None => Region::from_rect(local),
            },
            NodeKind::Shadow => model
                .shadow(window)
                .map(|s| s.region.clone())
                .unwrap_or_default(),
            NodeKind::Decoration => {
                let frame = model.frame_geometry(window);
                let client = model.client_geometry(window) - frame.origin().to_vec2();
                let mut shape = Region::from_rect(local);
                shape -= client;
                shape
            }
            NodeKind::Surface => Region::from_rect(local),
        };
        self.store.shape[i] = shape;
    }

    fn update_visibility<M: WindowModel + ?Sized>(&mut self, model: &M, idx: u32) {
        // Walk the ancestors instead of trusting their flags, which may not
        // have been recomputed yet this pass.
        let mut visible = true;
        let mut cur = idx;
        while visible && cur != INVALID {
            visible = self.own_visibility(model, cur);
            cur = self.store.parent[cur as usize];
        }
        self.store.visible[idx as usize] = visible;
    }

    fn own_visibility<M: WindowModel + ?Sized>(&self, model: &M, idx: u32) -> bool {
        let i = idx as usize;
        let window = self.store.window[i];
        match self.store.kind[i] {
            NodeKind::Root => !model.state(window).contains(WindowState::HIDDEN),
            NodeKind::Shadow => model.shadow(window).is_some_and(|s| s.rendered),
            NodeKind::Decoration => true,
            NodeKind::Surface => self.store.surface[i].is_some_and(|s| model.surface_mapped(s)),
        }
    }

    fn update_quads(&mut self, idx: u32) {
        let i = idx as usize;
        let mut quads = core::mem::take(&mut self.store.quads[i]);
        quads.clear();
        if let Some(kind) = Self::quad_kind(self.store.kind[i]) {
            let offset = self.store.frame_offset_at(idx);
            let id = self.store.paint_order[i];
            for &rect in self.store.shape[i].rects() {
                quads.push(WindowQuad::new(kind, id, rect + offset, rect));
            }
        }
        self.store.quads[i] = quads;
    }

    #[cfg(feature = "trace-rich")]
    fn trace_node_changes(&self, changes: &SceneChanges, frame_index: u64, tracer: &mut Tracer<'_>) {
        use crate::trace::{NodeChange, NodeField};

        let mut records = Vec::new();
        for (list, field) in [
            (&changes.geometry, NodeField::Geometry),
            (&changes.shapes, NodeField::Shape),
            (&changes.visibility, NodeField::Visibility),
            (&changes.quads, NodeField::Quads),
            (&changes.pixel_sources, NodeField::PixelSource),
        ] {
            records.extend(list.iter().map(|&node_index| NodeChange { node_index, field }));
        }
        if !records.is_empty() {
            tracer.node_changes(frame_index, &records);
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "node counts never approach u32::MAX"
)]
fn index_of(i: usize) -> u32 {
    i as u32
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::vec;

    use kurbo::Vec2;

    use super::*;
    use crate::model::{Decoration, Shadow};
    use crate::pixmap::{PixelSource, PixmapError, ResourceKey};
    use crate::quad::QuadKind;
    use crate::scene::PaintDisabled;

    const W: WindowId = WindowId(1);
    const MAIN: SurfaceId = SurfaceId(100);

    struct Model {
        frame: Rect,
        client: Rect,
        buffer: Rect,
        state: WindowState,
        shadow: Option<Shadow>,
        decoration: Option<Decoration>,
        subs: BTreeMap<SurfaceId, Vec<SurfaceId>>,
        positions: BTreeMap<SurfaceId, Point>,
        sizes: BTreeMap<SurfaceId, Size>,
        unmapped: Vec<SurfaceId>,
    }

    impl Model {
        fn new() -> Self {
            let frame = Rect::new(100.0, 100.0, 300.0, 250.0);
            Self {
                frame,
                client: frame,
                buffer: frame,
                state: WindowState::NORMAL,
                shadow: None,
                decoration: None,
                subs: BTreeMap::new(),
                positions: BTreeMap::new(),
                sizes: BTreeMap::new(),
                unmapped: Vec::new(),
            }
        }

        fn decorated() -> Self {
            let mut model = Self::new();
            model.client = Rect::new(100.0, 130.0, 300.0, 250.0);
            model.buffer = model.client;
            model.decoration = Some(Decoration { has_alpha: false });
            model
        }
    }

    impl WindowModel for Model {
        fn frame_geometry(&self, _: WindowId) -> Rect {
            self.frame
        }
        fn buffer_geometry(&self, _: WindowId) -> Rect {
            self.buffer
        }
        fn client_geometry(&self, _: WindowId) -> Rect {
            self.client
        }
        fn opacity(&self, _: WindowId) -> f64 {
            1.0
        }
        fn has_alpha(&self, _: WindowId) -> bool {
            false
        }
        fn state(&self, _: WindowId) -> WindowState {
            self.state
        }
        fn is_on_desktop(&self, _: WindowId, desktop: u32) -> bool {
            desktop == 1
        }
        fn shadow(&self, _: WindowId) -> Option<&Shadow> {
            self.shadow.as_ref()
        }
        fn decoration(&self, _: WindowId) -> Option<Decoration> {
            self.decoration
        }
        fn surface(&self, _: WindowId) -> SurfaceId {
            MAIN
        }
        fn sub_surfaces(&self, surface: SurfaceId) -> &[SurfaceId] {
            self.subs.get(&surface).map_or(&[], Vec::as_slice)
        }
        fn sub_surface_position(&self, surface: SurfaceId) -> Point {
            self.positions.get(&surface).copied().unwrap_or(Point::ORIGIN)
        }
        fn surface_size(&self, surface: SurfaceId) -> Size {
            self.sizes
                .get(&surface)
                .copied()
                .unwrap_or(Size::new(10.0, 10.0))
        }
        fn surface_mapped(&self, surface: SurfaceId) -> bool {
            !self.unmapped.contains(&surface)
        }
    }

    #[derive(Default)]
    struct Factory {
        created: u64,
        fail: bool,
    }

    impl PixmapFactory for Factory {
        fn create_pixel_source(
            &mut self,
            request: &PixelSourceRequest,
        ) -> Result<PixelSource, PixmapError> {
            if self.fail {
                return Err(PixmapError::Unavailable);
            }
            self.created += 1;
            Ok(PixelSource {
                key: ResourceKey(self.created),
                kind: request.kind,
                size: request.size,
            })
        }
    }

    fn scene_with(model: &Model) -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.add_window(W);
        let _ = scene.update(model);
        scene
    }

    fn kinds(scene: &SceneGraph) -> Vec<NodeKind> {
        let record = scene.window(W).unwrap();
        record
            .paint_order()
            .iter()
            .map(|&n| scene.store().kind(n))
            .collect()
    }

    fn surfaces(scene: &SceneGraph, parent: NodeId) -> Vec<Option<SurfaceId>> {
        scene
            .store()
            .children(parent)
            .map(|n| scene.store().surface(n))
            .collect()
    }

    #[test]
    fn plain_window_has_root_and_one_surface() {
        let model = Model::new();
        let scene = scene_with(&model);
        let record = scene.window(W).unwrap();
        let store = scene.store();

        assert_eq!(store.descendants(record.root()).count(), 2);
        assert_eq!(record.paint_order(), &[record.surface()]);
        assert_eq!(store.paint_order(record.surface()), Some(0));
        assert_eq!(store.paint_order(record.root()), None);
        assert_eq!(store.surface(record.surface()), Some(MAIN));
    }

    #[test]
    fn shadow_and_decoration_precede_the_surface() {
        let mut model = Model::decorated();
        model.shadow = Some(Shadow {
            rect: Rect::new(-10.0, -10.0, 210.0, 160.0),
            region: Region::from_rect(Rect::new(0.0, 0.0, 220.0, 170.0)),
            rendered: true,
        });
        let scene = scene_with(&model);
        assert_eq!(
            kinds(&scene),
            vec![NodeKind::Shadow, NodeKind::Decoration, NodeKind::Surface]
        );
        assert_eq!(
            scene.expanded_geometry(W),
            Rect::new(90.0, 90.0, 310.0, 260.0)
        );
    }

    #[test]
    fn shadow_is_removed_when_it_goes_away() {
        let mut model = Model::new();
        model.shadow = Some(Shadow {
            rect: Rect::new(-5.0, -5.0, 205.0, 155.0),
            region: Region::new(),
            rendered: true,
        });
        let mut scene = scene_with(&model);
        let shadow = scene.window(W).unwrap().shadow().unwrap();

        model.shadow = None;
        scene.shadow_changed(W);
        let changes = scene.update(&model);
        assert_eq!(changes.reconciled, vec![W]);
        assert_eq!(changes.removed, vec![shadow.index()]);
        assert!(!scene.store().is_alive(shadow));
        assert_eq!(kinds(&scene), vec![NodeKind::Surface]);
        assert_eq!(scene.store().paint_order(scene.window(W).unwrap().surface()), Some(0));
    }

    #[test]
    fn geometry_rules_per_kind() {
        let mut model = Model::decorated();
        model.subs.insert(MAIN, vec![SurfaceId(1)]);
        model.positions.insert(SurfaceId(1), Point::new(5.0, 6.0));
        model.sizes.insert(SurfaceId(1), Size::new(20.0, 30.0));
        let scene = scene_with(&model);
        let record = scene.window(W).unwrap();
        let store = scene.store();

        assert_eq!(store.position(record.root()), Point::new(100.0, 100.0));
        assert_eq!(store.size(record.root()), Size::new(200.0, 150.0));
        let deco = record.decoration().unwrap();
        assert_eq!(store.position(deco), Point::ORIGIN);
        assert_eq!(store.size(deco), Size::new(200.0, 150.0));
        assert_eq!(store.position(record.surface()), Point::new(0.0, 30.0));
        assert_eq!(store.size(record.surface()), Size::new(200.0, 120.0));

        let sub = store.children(record.surface()).next().unwrap();
        assert_eq!(store.position(sub), Point::new(5.0, 6.0));
        assert_eq!(store.size(sub), Size::new(20.0, 30.0));
        assert_eq!(store.frame_offset(sub), Vec2::new(5.0, 36.0));
    }

    #[test]
    fn decoration_shape_excludes_the_client() {
        let model = Model::decorated();
        let scene = scene_with(&model);
        let deco = scene.window(W).unwrap().decoration().unwrap();
        assert_eq!(
            scene.store().shape(deco),
            &Region::from_rect(Rect::new(0.0, 0.0, 200.0, 30.0))
        );
        assert_eq!(
            scene.client_shape(&model, W),
            Region::from_rect(Rect::new(0.0, 30.0, 200.0, 150.0))
        );
    }

    #[test]
    fn custom_shape_is_clipped_to_the_frame() {
        struct Shaped(Model);
        impl WindowModel for Shaped {
            fn frame_geometry(&self, w: WindowId) -> Rect {
                self.0.frame_geometry(w)
            }
            fn buffer_geometry(&self, w: WindowId) -> Rect {
                self.0.buffer_geometry(w)
            }
            fn client_geometry(&self, w: WindowId) -> Rect {
                self.0.client_geometry(w)
            }
            fn opacity(&self, w: WindowId) -> f64 {
                self.0.opacity(w)
            }
            fn has_alpha(&self, w: WindowId) -> bool {
                self.0.has_alpha(w)
            }
            fn state(&self, w: WindowId) -> WindowState {
                self.0.state(w)
            }
            fn is_on_desktop(&self, w: WindowId, d: u32) -> bool {
                self.0.is_on_desktop(w, d)
            }
            fn surface(&self, w: WindowId) -> SurfaceId {
                self.0.surface(w)
            }
            fn surface_size(&self, s: SurfaceId) -> Size {
                self.0.surface_size(s)
            }
            fn shape(&self, _: WindowId) -> Option<Region> {
                Some(Region::from_rect(Rect::new(-50.0, 0.0, 100.0, 400.0)))
            }
        }

        let model = Shaped(Model::new());
        let mut scene = SceneGraph::new();
        scene.add_window(W);
        let _ = scene.update(&model);
        assert_eq!(
            scene.shape(W),
            Region::from_rect(Rect::new(0.0, 0.0, 100.0, 150.0))
        );
    }

    #[test]
    fn reconciliation_is_stable() {
        let mut model = Model::new();
        model.subs.insert(MAIN, vec![SurfaceId(1), SurfaceId(2)]);
        model.subs.insert(SurfaceId(1), vec![SurfaceId(3)]);
        let mut scene = scene_with(&model);
        let before = scene.window(W).unwrap().paint_order().to_vec();
        let ids: Vec<_> = before
            .iter()
            .map(|&n| scene.store().paint_order(n))
            .collect();

        scene.sub_surfaces_changed(W);
        let changes = scene.update(&model);
        assert!(changes.added.is_empty());
        assert!(changes.removed.is_empty());
        assert!(changes.quads.is_empty());
        let after = scene.window(W).unwrap().paint_order().to_vec();
        assert_eq!(before, after);
        let ids_after: Vec<_> = after
            .iter()
            .map(|&n| scene.store().paint_order(n))
            .collect();
        assert_eq!(ids, ids_after);
        assert_eq!(ids, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn reordered_sub_surfaces_are_relinked_not_recreated() {
        let mut model = Model::new();
        model.subs.insert(MAIN, vec![SurfaceId(1), SurfaceId(2)]);
        let mut scene = scene_with(&model);
        let surface = scene.window(W).unwrap().surface();
        let old: Vec<_> = scene.store().children(surface).collect();

        model.subs.insert(MAIN, vec![SurfaceId(2), SurfaceId(1)]);
        scene.sub_surfaces_changed(W);
        let changes = scene.update(&model);
        assert!(changes.added.is_empty());
        let new: Vec<_> = scene.store().children(surface).collect();
        assert_eq!(new, vec![old[1], old[0]]);
        assert_eq!(
            surfaces(&scene, surface),
            vec![Some(SurfaceId(2)), Some(SurfaceId(1))]
        );
        assert_eq!(scene.store().paint_order(old[1]), Some(1));
        assert_eq!(scene.store().paint_order(old[0]), Some(2));
    }

    #[test]
    fn stale_sub_surfaces_are_deleted_with_their_subtree() {
        let mut model = Model::new();
        model.subs.insert(MAIN, vec![SurfaceId(1), SurfaceId(2)]);
        model.subs.insert(SurfaceId(1), vec![SurfaceId(3)]);
        let mut scene = scene_with(&model);
        let surface = scene.window(W).unwrap().surface();

        model.subs.insert(MAIN, vec![SurfaceId(2), SurfaceId(4)]);
        scene.sub_surfaces_changed(W);
        let changes = scene.update(&model);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.removed.len(), 2);
        assert_eq!(
            surfaces(&scene, surface),
            vec![Some(SurfaceId(2)), Some(SurfaceId(4))]
        );
        assert_eq!(scene.window(W).unwrap().paint_order().len(), 3);
    }

    #[test]
    fn quads_are_frame_local_and_tagged() {
        let model = Model::decorated();
        let mut scene = scene_with(&model);
        let mut factory = Factory::default();
        scene.update_pixmaps(&model, &mut factory, &mut Tracer::none());

        let quads = scene.build_quads(W);
        assert_eq!(quads.len(), 2);
        let deco = quads.as_slice()[0];
        assert_eq!(deco.kind(), QuadKind::Decoration);
        assert_eq!(deco.id(), 0);
        assert_eq!(deco.rect(), Rect::new(0.0, 0.0, 200.0, 30.0));
        let contents = quads.as_slice()[1];
        assert_eq!(contents.kind(), QuadKind::Contents);
        assert_eq!(contents.id(), 1);
        assert_eq!(contents.rect(), Rect::new(0.0, 30.0, 200.0, 150.0));
        assert_eq!(contents.texture(), Rect::new(0.0, 0.0, 200.0, 120.0));
        assert_eq!(scene.quad_node(W, 1), Some(scene.window(W).unwrap().surface()));
    }

    #[test]
    fn surfaces_without_pixmap_have_no_quads() {
        let model = Model::new();
        let mut scene = scene_with(&model);
        assert!(scene.build_quads(W).is_empty());

        let mut factory = Factory {
            fail: true,
            ..Factory::default()
        };
        scene.update_pixmaps(&model, &mut factory, &mut Tracer::none());
        assert!(scene.build_quads(W).is_empty());

        factory.fail = false;
        scene.update_pixmaps(&model, &mut factory, &mut Tracer::none());
        assert_eq!(scene.build_quads(W).len(), 1);
    }

    #[test]
    fn buffer_change_replaces_the_pixmap() {
        let mut model = Model::new();
        let mut scene = scene_with(&model);
        let mut factory = Factory::default();
        scene.update_pixmaps(&model, &mut factory, &mut Tracer::none());
        let surface = scene.window(W).unwrap().surface();
        let first = scene.store().pixmap(surface).unwrap().clone();

        model.buffer = Rect::new(100.0, 100.0, 400.0, 250.0);
        scene.buffer_changed(W, MAIN);
        let changes = scene.update(&model);
        assert!(changes.pixel_sources.contains(&surface.index()));
        assert!(!scene.store().pixmap(surface).unwrap().is_valid());

        scene.update_pixmaps(&model, &mut factory, &mut Tracer::none());
        let second = scene.store().pixmap(surface).unwrap();
        assert!(second.is_valid());
        assert_ne!(first.key(), second.key());
        assert_eq!(second.size(), Size::new(300.0, 150.0));
        assert_eq!(factory.created, 2);
    }

    #[test]
    fn hidden_windows_hide_every_node() {
        let mut model = Model::decorated();
        let mut scene = scene_with(&model);
        let record = scene.window(W).unwrap().clone();
        assert!(scene.store().is_visible(record.surface()));

        model.state |= WindowState::HIDDEN;
        scene.visibility_changed(W);
        let changes = scene.update(&model);
        assert_eq!(changes.visibility.len(), 3);
        for &node in record.paint_order() {
            assert!(!scene.store().is_visible(node));
        }
        assert!(!scene.is_visible(&model, W));
    }

    #[test]
    fn unmapped_sub_surface_is_invisible() {
        let mut model = Model::new();
        model.subs.insert(MAIN, vec![SurfaceId(1)]);
        model.unmapped.push(SurfaceId(1));
        let scene = scene_with(&model);
        let surface = scene.window(W).unwrap().surface();
        let sub = scene.store().children(surface).next().unwrap();
        assert!(scene.store().is_visible(surface));
        assert!(!scene.store().is_visible(sub));
    }

    #[test]
    fn unchanged_scene_updates_to_nothing() {
        let model = Model::new();
        let mut scene = scene_with(&model);
        assert!(scene.update(&model).is_empty());
    }

    #[test]
    fn closing_hands_the_tree_to_the_placeholder() {
        let model = Model::new();
        let mut scene = scene_with(&model);
        let mut factory = Factory::default();
        scene.update_pixmaps(&model, &mut factory, &mut Tracer::none());
        let root = scene.window(W).unwrap().root();
        let placeholder = WindowId(9);

        scene.window_closed(W, Some(placeholder));
        assert!(!scene.contains(W));
        let record = scene.window(placeholder).unwrap();
        assert_eq!(record.root(), root);
        assert!(scene
            .store()
            .descendants(root)
            .all(|n| scene.store().window(n) == placeholder));
        assert!(scene.store().pixmap(record.surface()).is_some());

        scene.window_closed(placeholder, None);
        assert!(scene.is_empty());
        assert!(!scene.store().is_alive(root));
    }

    #[test]
    fn painting_reasons_follow_state() {
        let mut model = Model::new();
        let mut scene = scene_with(&model);
        scene.reset_painting_enabled(&model, W, None);
        assert!(scene.is_painting_enabled(W));

        model.state = WindowState::ON_CURRENT_ACTIVITY | WindowState::MINIMIZED;
        scene.reset_painting_enabled(&model, W, None);
        let reasons = scene.window(W).unwrap().painting_disabled();
        assert_eq!(
            reasons,
            PaintDisabled::BY_DESKTOP | PaintDisabled::BY_MINIMIZE
        );

        // Painting desktop 1 for a preview ignores the current desktop.
        model.state = WindowState::ON_CURRENT_ACTIVITY;
        scene.reset_painting_enabled(&model, W, Some(1));
        assert!(scene.is_painting_enabled(W));
    }

    #[test]
    fn repaints_accumulate_until_taken() {
        let model = Model::new();
        let mut scene = scene_with(&model);
        scene.add_repaint(W, &Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        scene.add_repaint(W, &Region::from_rect(Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert_eq!(
            scene.take_repaints(W),
            Region::from_rect(Rect::new(0.0, 0.0, 20.0, 10.0))
        );
        assert!(scene.take_repaints(W).is_empty());
    }

    #[test]
    #[should_panic(expected = "window already in scene")]
    fn double_add_panics() {
        let mut scene = SceneGraph::new();
        scene.add_window(W);
        scene.add_window(W);
    }

    #[test]
    #[should_panic(expected = "window not in scene")]
    fn removing_unknown_window_panics() {
        let mut scene = SceneGraph::new();
        scene.remove_window(W);
    }
}
