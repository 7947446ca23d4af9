// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constraint graph storage.
//!
//! Constraints live in a slab addressed by `u32` keys. Each constraint keeps
//! the keys of its parents (constraints whose `above` is this constraint's
//! `below`) and children (constraints whose `below` is this constraint's
//! `above`), so evaluation can walk the graph without searching.

use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;

use crate::model::WindowId;

/// A "`below` must end up earlier than `above`" edge.
#[derive(Clone, Debug)]
pub(super) struct Constraint {
    pub(super) below: WindowId,
    pub(super) above: WindowId,
    pub(super) parents: Vec<u32>,
    pub(super) children: Vec<u32>,
    pub(super) enqueued: bool,
}

/// Slab of live constraints.
#[derive(Clone, Debug, Default)]
pub(super) struct ConstraintGraph {
    slots: Vec<Option<Constraint>>,
    free: Vec<u32>,
    len: usize,
}

impl ConstraintGraph {
    pub(super) fn len(&self) -> usize {
        self.len
    }

    pub(super) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn get(&self, key: u32) -> Option<&Constraint> {
        self.slots.get(key as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, key: u32) -> Option<&mut Constraint> {
        self.slots.get_mut(key as usize).and_then(Option::as_mut)
    }

    fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(k, _)| key_of(k))
    }

    /// Iterates over live `(below, above)` pairs.
    pub(super) fn pairs(&self) -> impl Iterator<Item = (WindowId, WindowId)> + '_ {
        self.slots.iter().flatten().map(|c| (c.below, c.above))
    }

    pub(super) fn find(&self, below: WindowId, above: WindowId) -> Option<u32> {
        self.keys().find(|&k| {
            self.get(k)
                .is_some_and(|c| c.below == below && c.above == above)
        })
    }

    /// Returns the keys of every constraint `window` takes part in.
    pub(super) fn involving(&self, window: WindowId) -> Vec<u32> {
        self.keys()
            .filter(|&k| {
                self.get(k)
                    .is_some_and(|c| c.below == window || c.above == window)
            })
            .collect()
    }

    /// Returns `true` if an edge `below -> above` would close a cycle, that
    /// is if `below` is already reachable from `above`.
    pub(super) fn would_cycle(&self, below: WindowId, above: WindowId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = alloc::vec![above];
        while let Some(w) = stack.pop() {
            if w == below {
                return true;
            }
            if !visited.insert(w) {
                continue;
            }
            stack.extend(self.slots.iter().flatten().filter(|c| c.below == w).map(|c| c.above));
        }
        false
    }

    /// Adds a new edge and links it to its neighbours.
    pub(super) fn insert(&mut self, below: WindowId, above: WindowId) -> u32 {
        let mut parents = Vec::new();
        let mut children = Vec::new();
        for k in self.keys() {
            if let Some(c) = self.get(k) {
                if c.below == above {
                    children.push(k);
                } else if c.above == below {
                    parents.push(k);
                }
            }
        }

        let constraint = Constraint {
            below,
            above,
            parents: parents.clone(),
            children: children.clone(),
            enqueued: false,
        };
        let key = if let Some(key) = self.free.pop() {
            self.slots[key as usize] = Some(constraint);
            key
        } else {
            self.slots.push(Some(constraint));
            key_of(self.slots.len() - 1)
        };
        self.len += 1;

        for p in parents {
            if let Some(parent) = self.get_mut(p) {
                parent.children.push(key);
            }
        }
        for ch in children {
            if let Some(child) = self.get_mut(ch) {
                child.parents.push(key);
            }
        }
        key
    }

    /// Removes an edge and detaches it from its neighbours.
    pub(super) fn remove(&mut self, key: u32) -> Option<Constraint> {
        let constraint = self.slots.get_mut(key as usize)?.take()?;
        self.free.push(key);
        self.len -= 1;
        for &p in &constraint.parents {
            if let Some(parent) = self.get_mut(p) {
                parent.children.retain(|&k| k != key);
            }
        }
        for &ch in &constraint.children {
            if let Some(child) = self.get_mut(ch) {
                child.parents.retain(|&k| k != key);
            }
        }
        Some(constraint)
    }

    /// Removes an edge and connects each of its parents to each of its
    /// children, so the remaining graph keeps its propagation order.
    pub(super) fn remove_relinking(&mut self, key: u32) {
        let Some(constraint) = self.remove(key) else {
            return;
        };
        for &p in &constraint.parents {
            for &ch in &constraint.children {
                if p == ch {
                    continue;
                }
                let linked = self.get(p).is_some_and(|c| c.children.contains(&ch));
                if linked || self.get(ch).is_none() {
                    continue;
                }
                if let Some(parent) = self.get_mut(p) {
                    parent.children.push(ch);
                }
                if let Some(child) = self.get_mut(ch) {
                    child.parents.push(p);
                }
            }
        }
    }

    /// Rewrites every reference to `before` into `after`.
    pub(super) fn replace_window(&mut self, before: WindowId, after: WindowId) {
        for c in self.slots.iter_mut().flatten() {
            if c.below == before {
                c.below = after;
            }
            if c.above == before {
                c.above = after;
            }
        }
    }

    /// Returns the `(below, above)` pair of a live key.
    pub(super) fn pair(&self, key: u32) -> Option<(WindowId, WindowId)> {
        self.get(key).map(|c| (c.below, c.above))
    }

    /// Orders constraints so that every constraint comes after all of its
    /// parents.
    ///
    /// The queue is seeded with the constraints that have no parents; a child
    /// is enqueued exactly once, when its last parent was processed. Returns
    /// the processing order and the number of constraints that could not be
    /// reached (non-zero only for cyclic graphs).
    pub(super) fn topological_order(&mut self) -> (Vec<u32>, usize) {
        let mut pending: Vec<usize> = self
            .slots
            .iter()
            .map(|s| s.as_ref().map_or(0, |c| c.parents.len()))
            .collect();
        let mut queue = VecDeque::with_capacity(self.len);
        for (k, slot) in self.slots.iter_mut().enumerate() {
            if let Some(c) = slot {
                c.enqueued = pending[k] == 0;
                if c.enqueued {
                    queue.push_back(key_of(k));
                }
            }
        }

        let mut order = Vec::with_capacity(self.len);
        while let Some(key) = queue.pop_front() {
            order.push(key);
            let child_count = self.get(key).map_or(0, |c| c.children.len());
            for i in 0..child_count {
                let Some(child) = self.get(key).map(|c| c.children[i]) else {
                    continue;
                };
                let slot = &mut pending[child as usize];
                *slot = slot.saturating_sub(1);
                if *slot != 0 {
                    continue;
                }
                if let Some(c) = self.get_mut(child)
                    && !c.enqueued
                {
                    c.enqueued = true;
                    queue.push_back(child);
                }
            }
        }
        let unresolved = self.len - order.len();
        (order, unresolved)
    }

    /// Returns the children of the `(below, above)` edge as pairs.
    #[cfg(test)]
    pub(super) fn children_of(&self, below: WindowId, above: WindowId) -> Vec<(WindowId, WindowId)> {
        let Some(key) = self.find(below, above) else {
            return Vec::new();
        };
        self.get(key)
            .map(|c| c.children.iter().filter_map(|&ch| self.pair(ch)).collect())
            .unwrap_or_default()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "constraint slab never approaches u32::MAX entries"
)]
fn key_of(index: usize) -> u32 {
    index as u32
}
