// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window stacking.
//!
//! [`StackingOrder`] keeps the bottom-to-top sequence of windows. Each
//! [`rebuild`](StackingOrder::rebuild) runs two passes:
//!
//! 1. A stable bucket sort by [`Layer`], read from a [`LayerPolicy`]. Dialog
//!    and utility windows inherit the highest layer of their group on the
//!    same output.
//! 2. A topological walk of the constraint graph. Each constraint
//!    `(below, above)` moves `above` directly after `below` when needed;
//!    parents are applied before children, so chains of constraints settle
//!    in one pass.
//!
//! The constraint graph is kept acyclic: [`StackingOrder::constrain`] panics
//! on an edge that would close a cycle.

mod constraint;
mod layer;
mod order;

pub use layer::{Layer, LayerPolicy, WindowType};
pub use order::StackingOrder;
