// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::SceneStore;

/// An iterator over the direct children of a node.
///
/// Created by [`SceneStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a SceneStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a SceneStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.handle(idx))
    }
}

/// A depth-first pre-order iterator over a subtree, the subtree root
/// included.
///
/// Created by [`SceneStore::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    store: &'a SceneStore,
    root: u32,
    current: u32,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(store: &'a SceneStore, root: u32) -> Self {
        Self {
            store,
            root,
            current: root,
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        let s = self.store;

        // Descend first, then try siblings, climbing until one is found.
        self.current = s.first_child[idx as usize];
        if self.current == INVALID {
            let mut up = idx;
            while up != self.root && up != INVALID {
                let next = s.next_sibling[up as usize];
                if next != INVALID {
                    self.current = next;
                    break;
                }
                up = s.parent[up as usize];
            }
        }
        Some(s.handle(idx))
    }
}
