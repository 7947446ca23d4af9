// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays scene node storage with allocation and topology
//! management.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, NodeId, NodeKind};
use super::traverse::{Children, Descendants};
use crate::dirty;
use crate::model::{SurfaceId, WindowId};
use crate::pixmap::WindowPixmap;
use crate::quad::WindowQuadList;
use crate::region::Region;

/// Struct-of-arrays storage for the scene nodes of every window.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies a
/// slot in parallel arrays. Destroyed nodes are recycled via a free list, and
/// generation counters prevent stale handle access.
///
/// Node attributes are written by [`SceneGraph::update`](super::SceneGraph::update);
/// the store itself only exposes them read-only.
#[derive(Debug)]
pub struct SceneStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Binding --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) window: Vec<WindowId>,
    pub(crate) surface: Vec<Option<SurfaceId>>,

    // -- Computed attributes --
    pub(crate) position: Vec<Point>,
    pub(crate) size: Vec<Size>,
    pub(crate) shape: Vec<Region>,
    pub(crate) quads: Vec<WindowQuadList>,
    pub(crate) paint_order: Vec<u32>,
    pub(crate) visible: Vec<bool>,
    pub(crate) pixmap: Vec<Option<WindowPixmap>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            window: Vec::new(),
            surface: Vec::new(),
            position: Vec::new(),
            size: Vec::new(),
            shape: Vec::new(),
            quads: Vec::new(),
            paint_order: Vec::new(),
            visible: Vec::new(),
            pixmap: Vec::new(),
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation --

    /// Creates a detached node owned by `window`.
    ///
    /// Every attribute channel of the new node is marked dirty so the next
    /// update computes it from the window model.
    pub(crate) fn create_node(
        &mut self,
        kind: NodeKind,
        window: WindowId,
        surface: Option<SurfaceId>,
    ) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.window[i] = window;
            self.surface[i] = surface;
            self.position[i] = Point::ORIGIN;
            self.size[i] = Size::ZERO;
            self.shape[i].clear();
            self.quads[i].clear();
            self.paint_order[i] = INVALID;
            self.visible[i] = false;
            self.pixmap[i] = None;
            self.live[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.window.push(window);
            self.surface.push(surface);
            self.position.push(Point::ORIGIN);
            self.size.push(Size::ZERO);
            self.shape.push(Region::new());
            self.quads.push(WindowQuadList::new());
            self.paint_order.push(INVALID);
            self.visible.push(false);
            self.pixmap.push(None);
            self.generation.push(0);
            self.live.push(true);
            idx
        };

        self.pending_added.push(idx);
        self.dirty.mark_with(idx, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::VISIBILITY, &EagerPolicy);
        self.dirty.mark(idx, dirty::SHAPE);
        self.dirty.mark(idx, dirty::QUADS);
        if kind == NodeKind::Surface {
            self.dirty.mark(idx, dirty::PIXEL_SOURCE);
        }

        self.handle(idx)
    }

    /// Destroys a node and its whole subtree. Returns the number of nodes
    /// destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn destroy_subtree(&mut self, id: NodeId) -> u32 {
        self.validate(id);
        if self.parent[id.idx as usize] != INVALID {
            self.unlink(id.idx);
        }
        let doomed: Vec<u32> = self.descendants(id).map(NodeId::index).collect();
        for &idx in &doomed {
            let i = idx as usize;
            self.dirty.remove_key(idx);
            self.generation[i] += 1;
            self.live[i] = false;
            self.pixmap[i] = None;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.free_list.push(idx);
            self.pending_removed.push(idx);
        }
        len_of(doomed.len())
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.live[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Returns whether the raw slot `idx` holds a live node.
    #[must_use]
    pub fn is_live_index(&self, idx: u32) -> bool {
        idx < self.len && self.live[idx as usize]
    }

    // -- Topology --

    /// Links `child` into `parent`'s child list, before `before` or at the end
    /// if `before` is [`INVALID`].
    ///
    /// A child that is already linked somewhere is unlinked first.
    pub(crate) fn link_before(&mut self, parent: u32, child: u32, before: u32) {
        if child == before {
            return;
        }
        if self.parent[child as usize] != INVALID {
            self.unlink(child);
        }
        let (p, c) = (parent as usize, child as usize);
        self.parent[c] = parent;
        if before == INVALID {
            let last = self.last_child[p];
            self.prev_sibling[c] = last;
            self.next_sibling[c] = INVALID;
            if last == INVALID {
                self.first_child[p] = child;
            } else {
                self.next_sibling[last as usize] = child;
            }
            self.last_child[p] = child;
        } else {
            debug_assert_eq!(
                self.parent[before as usize], parent,
                "sibling has another parent"
            );
            let prev = self.prev_sibling[before as usize];
            self.prev_sibling[c] = prev;
            self.next_sibling[c] = before;
            self.prev_sibling[before as usize] = child;
            if prev == INVALID {
                self.first_child[p] = child;
            } else {
                self.next_sibling[prev as usize] = child;
            }
        }

        let _ = self.dirty.add_dependency(child, parent, dirty::GEOMETRY);
        let _ = self.dirty.add_dependency(child, parent, dirty::VISIBILITY);
        self.dirty.mark_with(child, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark_with(child, dirty::VISIBILITY, &EagerPolicy);
    }

    /// Appends `child` as the last child of `parent`.
    pub(crate) fn append_child(&mut self, parent: u32, child: u32) {
        self.link_before(parent, child, INVALID);
    }

    /// Removes `idx` from its parent's child list.
    pub(crate) fn unlink(&mut self, idx: u32) {
        let i = idx as usize;
        let p = self.parent[i];
        let prev = self.prev_sibling[i];
        let next = self.next_sibling[i];

        if prev == INVALID {
            self.first_child[p as usize] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last_child[p as usize] = prev;
        } else {
            self.prev_sibling[next as usize] = prev;
        }

        self.dirty.remove_dependency(idx, p, dirty::GEOMETRY);
        self.dirty.remove_dependency(idx, p, dirty::VISIBILITY);

        self.parent[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.next_sibling[i] = INVALID;
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.handle(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns a depth-first pre-order iterator over `id` and its
    /// descendants.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    // -- Attribute getters --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the window that owns a node.
    #[must_use]
    pub fn window(&self, id: NodeId) -> WindowId {
        self.validate(id);
        self.window[id.idx as usize]
    }

    /// Returns the surface bound to a surface node.
    #[must_use]
    pub fn surface(&self, id: NodeId) -> Option<SurfaceId> {
        self.validate(id);
        self.surface[id.idx as usize]
    }

    /// Returns the position of a node relative to its parent.
    ///
    /// Root nodes are positioned in output coordinates.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Point {
        self.validate(id);
        self.position[id.idx as usize]
    }

    /// Returns the size of a node.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.size[id.idx as usize]
    }

    /// Returns the node-local pixel-space shape of a node.
    #[must_use]
    pub fn shape(&self, id: NodeId) -> &Region {
        self.validate(id);
        &self.shape[id.idx as usize]
    }

    /// Returns the quads built for a node, frame-local.
    #[must_use]
    pub fn quads(&self, id: NodeId) -> &WindowQuadList {
        self.validate(id);
        &self.quads[id.idx as usize]
    }

    /// Returns the paint-order id of a node, or `None` for roots.
    #[must_use]
    pub fn paint_order(&self, id: NodeId) -> Option<u32> {
        self.validate(id);
        let order = self.paint_order[id.idx as usize];
        (order != INVALID).then_some(order)
    }

    /// Returns whether the node and all of its ancestors are visible.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Returns the pixmap bound to a surface node.
    #[must_use]
    pub fn pixmap(&self, id: NodeId) -> Option<&WindowPixmap> {
        self.validate(id);
        self.pixmap[id.idx as usize].as_ref()
    }

    /// Returns the pixmap at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not a live slot.
    #[must_use]
    pub fn pixmap_at(&self, idx: u32) -> Option<&WindowPixmap> {
        assert!(self.is_live_index(idx), "slot index {idx} is not live");
        self.pixmap[idx as usize].as_ref()
    }

    /// Returns the offset of a node from its window's frame origin.
    #[must_use]
    pub fn frame_offset(&self, id: NodeId) -> Vec2 {
        self.validate(id);
        self.frame_offset_at(id.idx)
    }

    // -- Internal helpers --

    /// Builds the current handle for a live slot.
    pub(crate) fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Sums positions from `idx` up to, but excluding, the root.
    pub(crate) fn frame_offset_at(&self, idx: u32) -> Vec2 {
        let mut offset = Vec2::ZERO;
        let mut cur = idx;
        while self.parent[cur as usize] != INVALID {
            offset += self.position[cur as usize].to_vec2();
            cur = self.parent[cur as usize];
        }
        offset
    }

    /// Returns the node-local bounds of slot `idx`.
    pub(crate) fn local_rect_at(&self, idx: u32) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size[idx as usize])
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "node counts never approach u32::MAX"
)]
fn len_of(n: usize) -> u32 {
    n as u32
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    const W: WindowId = WindowId(1);

    fn node(store: &mut SceneStore, kind: NodeKind) -> NodeId {
        store.create_node(kind, W, None)
    }

    #[test]
    fn create_and_destroy() {
        let mut store = SceneStore::new();
        let id = node(&mut store, NodeKind::Root);
        assert!(store.is_alive(id));
        assert_eq!(store.destroy_subtree(id), 1);
        assert!(!store.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = SceneStore::new();
        let id1 = node(&mut store, NodeKind::Surface);
        store.destroy_subtree(id1);
        let id2 = node(&mut store, NodeKind::Surface);
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn link_before_orders_children() {
        let mut store = SceneStore::new();
        let root = node(&mut store, NodeKind::Root);
        let a = node(&mut store, NodeKind::Shadow);
        let b = node(&mut store, NodeKind::Decoration);
        let c = node(&mut store, NodeKind::Surface);
        store.append_child(root.idx, c.idx);
        store.link_before(root.idx, a.idx, c.idx);
        store.link_before(root.idx, b.idx, c.idx);

        let kids: Vec<_> = store.children(root).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(store.parent(b), Some(root));
        assert_eq!(store.last_child[root.idx as usize], c.idx);
    }

    #[test]
    fn relinking_moves_a_child() {
        let mut store = SceneStore::new();
        let root = node(&mut store, NodeKind::Root);
        let a = node(&mut store, NodeKind::Surface);
        let b = node(&mut store, NodeKind::Surface);
        store.append_child(root.idx, a.idx);
        store.append_child(root.idx, b.idx);
        store.link_before(root.idx, b.idx, a.idx);

        let kids: Vec<_> = store.children(root).collect();
        assert_eq!(kids, vec![b, a]);
        assert_eq!(store.last_child[root.idx as usize], a.idx);
    }

    #[test]
    fn descendants_are_preorder() {
        let mut store = SceneStore::new();
        let root = node(&mut store, NodeKind::Root);
        let a = node(&mut store, NodeKind::Surface);
        let a1 = node(&mut store, NodeKind::Surface);
        let a2 = node(&mut store, NodeKind::Surface);
        let b = node(&mut store, NodeKind::Surface);
        store.append_child(root.idx, a.idx);
        store.append_child(root.idx, b.idx);
        store.append_child(a.idx, a1.idx);
        store.append_child(a.idx, a2.idx);

        let order: Vec<_> = store.descendants(root).collect();
        assert_eq!(order, vec![root, a, a1, a2, b]);
        let sub: Vec<_> = store.descendants(a).collect();
        assert_eq!(sub, vec![a, a1, a2]);
    }

    #[test]
    fn destroy_subtree_frees_descendants() {
        let mut store = SceneStore::new();
        let root = node(&mut store, NodeKind::Root);
        let a = node(&mut store, NodeKind::Surface);
        let a1 = node(&mut store, NodeKind::Surface);
        let b = node(&mut store, NodeKind::Surface);
        store.append_child(root.idx, a.idx);
        store.append_child(a.idx, a1.idx);
        store.append_child(root.idx, b.idx);

        assert_eq!(store.destroy_subtree(a), 2);
        assert!(!store.is_alive(a1));
        let kids: Vec<_> = store.children(root).collect();
        assert_eq!(kids, vec![b]);
    }

    #[test]
    fn frame_offset_sums_positions_below_root() {
        let mut store = SceneStore::new();
        let root = node(&mut store, NodeKind::Root);
        let s = node(&mut store, NodeKind::Surface);
        let sub = node(&mut store, NodeKind::Surface);
        store.append_child(root.idx, s.idx);
        store.append_child(s.idx, sub.idx);
        store.position[root.idx as usize] = Point::new(100.0, 100.0);
        store.position[s.idx as usize] = Point::new(4.0, 20.0);
        store.position[sub.idx as usize] = Point::new(10.0, 10.0);

        assert_eq!(store.frame_offset(sub), Vec2::new(14.0, 30.0));
        assert_eq!(store.frame_offset(root), Vec2::ZERO);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics() {
        let mut store = SceneStore::new();
        let id = node(&mut store, NodeKind::Root);
        store.destroy_subtree(id);
        let _ = store.kind(id);
    }
}
