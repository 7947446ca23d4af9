// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The global window order.

use alloc::vec::Vec;

use crate::model::WindowId;
use crate::trace::{StackingChangedEvent, Tracer};

use super::constraint::ConstraintGraph;
use super::layer::{Layer, LayerPolicy, effective_layer};

/// Sentinel position for windows that are not stacked.
const INVALID: u32 = u32::MAX;

/// Bottom-to-top order of every composited window.
///
/// The sequence is the single source of truth the paint pipeline walks each
/// frame. Each window's index is cached in a table keyed by [`WindowId`], so
/// window ids are expected to be dense, as handed out by a slot arena.
///
/// Mutations (`add`, `restack`, `constrain`, ...) only touch the sequence and
/// the constraint graph. [`rebuild`](Self::rebuild) re-sorts the sequence by
/// layer and then applies every constraint.
#[derive(Clone, Debug, Default)]
pub struct StackingOrder {
    windows: Vec<WindowId>,
    positions: Vec<u32>,
    constraints: ConstraintGraph,
}

impl StackingOrder {
    /// Creates an empty stacking order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the windows, bottom to top.
    #[must_use]
    pub fn windows(&self) -> &[WindowId] {
        &self.windows
    }

    /// Number of stacked windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` if no window is stacked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Returns the index of `window`, or `None` if it is not stacked.
    #[must_use]
    pub fn position(&self, window: WindowId) -> Option<usize> {
        match self.positions.get(window.0 as usize) {
            Some(&p) if p != INVALID => Some(p as usize),
            _ => None,
        }
    }

    /// Returns `true` if `window` is stacked.
    #[must_use]
    pub fn contains(&self, window: WindowId) -> bool {
        self.position(window).is_some()
    }

    /// Number of live constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Returns `true` if the `(below, above)` constraint exists.
    #[must_use]
    pub fn is_constrained(&self, below: WindowId, above: WindowId) -> bool {
        self.constraints.find(below, above).is_some()
    }

    /// Iterates over the live `(below, above)` constraint pairs.
    pub fn constraints(&self) -> impl Iterator<Item = (WindowId, WindowId)> + '_ {
        self.constraints.pairs()
    }

    /// Appends `window` at the top of the sequence.
    ///
    /// # Panics
    ///
    /// Panics if `window` is already stacked.
    pub fn add(&mut self, window: WindowId) {
        assert!(!self.contains(window), "window already stacked: {window:?}");
        let slot = window.0 as usize;
        if self.positions.len() <= slot {
            self.positions.resize(slot + 1, INVALID);
        }
        self.positions[slot] = index_of(self.windows.len());
        self.windows.push(window);
    }

    /// Removes `window` and every constraint it takes part in.
    ///
    /// The parents of each deleted constraint are linked to its children so
    /// the remaining graph propagates in the same order.
    ///
    /// # Panics
    ///
    /// Panics if `window` is not stacked.
    pub fn remove(&mut self, window: WindowId) {
        let pos = self.expect_position(window);
        self.windows.remove(pos);
        self.positions[window.0 as usize] = INVALID;
        self.shift(pos, self.windows.len());

        for key in self.constraints.involving(window) {
            self.constraints.remove_relinking(key);
        }
    }

    /// Puts `after` at `before`'s index and rewrites every constraint that
    /// mentions `before`.
    ///
    /// Used when a closing window is swapped for the placeholder that plays
    /// its closing animation.
    ///
    /// # Panics
    ///
    /// Panics if `before` is not stacked or `after` already is.
    pub fn replace(&mut self, before: WindowId, after: WindowId) {
        let pos = self.expect_position(before);
        assert!(!self.contains(after), "window already stacked: {after:?}");
        self.positions[before.0 as usize] = INVALID;
        let slot = after.0 as usize;
        if self.positions.len() <= slot {
            self.positions.resize(slot + 1, INVALID);
        }
        self.positions[slot] = index_of(pos);
        self.windows[pos] = after;
        self.constraints.replace_window(before, after);
    }

    /// Moves `above` directly after `below`, unless it already comes later.
    ///
    /// # Panics
    ///
    /// Panics if either window is not stacked.
    pub fn restack(&mut self, below: WindowId, above: WindowId) {
        let bp = self.expect_position(below);
        let ap = self.expect_position(above);
        if bp < ap {
            return;
        }
        // Removing `above` shifts `below` down by one, so `bp` is now the
        // slot right after it.
        self.windows.remove(ap);
        self.windows.insert(bp, above);
        self.shift(ap, bp + 1);
    }

    /// Restacks each adjacent pair of `windows`, so they end up in the given
    /// relative order.
    ///
    /// # Panics
    ///
    /// Panics if any window is not stacked.
    pub fn restack_all(&mut self, windows: &[WindowId]) {
        for pair in windows.windows(2) {
            self.restack(pair[0], pair[1]);
        }
    }

    /// Moves `window` to the top of the sequence.
    ///
    /// After the next [`rebuild`](Self::rebuild) it is topmost within its
    /// layer, subject to constraints.
    ///
    /// # Panics
    ///
    /// Panics if `window` is not stacked.
    pub fn raise(&mut self, window: WindowId) {
        let pos = self.expect_position(window);
        self.windows.remove(pos);
        self.windows.push(window);
        self.shift(pos, self.windows.len());
    }

    /// Moves `window` to the bottom of the sequence.
    ///
    /// # Panics
    ///
    /// Panics if `window` is not stacked.
    pub fn lower(&mut self, window: WindowId) {
        let pos = self.expect_position(window);
        self.windows.remove(pos);
        self.windows.insert(0, window);
        self.shift(0, pos + 1);
    }

    /// Requires `below` to end up earlier than `above`.
    ///
    /// Returns `false` if the constraint already existed.
    ///
    /// # Panics
    ///
    /// Panics if `below == above`, if either window is not stacked, or if the
    /// new edge would close a cycle.
    pub fn constrain(&mut self, below: WindowId, above: WindowId) -> bool {
        assert!(
            below != above,
            "cannot constrain a window against itself: {below:?}"
        );
        self.expect_position(below);
        self.expect_position(above);
        if self.constraints.find(below, above).is_some() {
            return false;
        }
        assert!(
            !self.constraints.would_cycle(below, above),
            "constraint cycle: {below:?} is already above {above:?}"
        );
        self.constraints.insert(below, above);
        true
    }

    /// Drops the `(below, above)` constraint.
    ///
    /// Returns `false` if it did not exist.
    pub fn unconstrain(&mut self, below: WindowId, above: WindowId) -> bool {
        let Some(key) = self.constraints.find(below, above) else {
            return false;
        };
        self.constraints.remove(key);
        true
    }

    /// Recomputes the order from layers and constraints.
    ///
    /// Returns `true` if the sequence changed.
    pub fn rebuild<P: LayerPolicy + ?Sized>(&mut self, policy: &P) -> bool {
        let previous = self.windows.clone();
        self.evaluate_layers(policy);
        self.evaluate_constraints();
        self.windows != previous
    }

    /// Like [`rebuild`](Self::rebuild), reporting a change to `tracer`.
    pub fn rebuild_traced<P: LayerPolicy + ?Sized>(
        &mut self,
        policy: &P,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let changed = self.rebuild(policy);
        if changed {
            tracer.stacking_changed(&StackingChangedEvent {
                window_count: index_of(self.windows.len()),
                constraint_count: index_of(self.constraints.len()),
            });
        }
        changed
    }

    /// Stable bucket sort by effective layer.
    fn evaluate_layers<P: LayerPolicy + ?Sized>(&mut self, policy: &P) {
        let mut buckets: [Vec<WindowId>; Layer::COUNT] = Default::default();
        for &window in &self.windows {
            buckets[effective_layer(policy, window).index()].push(window);
        }
        self.windows.clear();
        for bucket in buckets {
            self.windows.extend(bucket);
        }
        self.shift(0, self.windows.len());
    }

    /// Applies every constraint, parents before children.
    fn evaluate_constraints(&mut self) {
        if self.constraints.is_empty() {
            return;
        }
        let (order, unresolved) = self.constraints.topological_order();
        debug_assert_eq!(unresolved, 0, "constraint cycle left {unresolved} unresolved");
        for key in order {
            if let Some((below, above)) = self.constraints.pair(key) {
                self.restack(below, above);
            }
        }
    }

    /// Refreshes cached positions for `start..end`.
    fn shift(&mut self, start: usize, end: usize) {
        for i in start..end {
            self.positions[self.windows[i].0 as usize] = index_of(i);
        }
    }

    fn expect_position(&self, window: WindowId) -> usize {
        let pos = self.position(window);
        assert!(pos.is_some(), "window is not stacked: {window:?}");
        pos.unwrap_or_default()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "window counts never approach u32::MAX"
)]
fn index_of(i: usize) -> u32 {
    i as u32
}
