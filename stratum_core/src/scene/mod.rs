// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-window scene trees.
//!
//! Every composited window owns a small tree of *scene nodes*:
//!
//! ```text
//! Root
//! ├── Shadow?        server-side drop shadow
//! ├── Decoration?    server-side decoration
//! └── Surface        main content surface
//!     └── Surface*   sub-surfaces, recursively, in model order
//! ```
//!
//! Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: parent, first/last child and sibling links forming an ordered
//!   tree. Children paint after their parent, siblings first to last.
//! - **Computed attributes** written by [`SceneGraph::update`]: position,
//!   size, pixel-space shape, window quads, visibility and a paint-order id
//!   assigned in depth-first pre-order (the root has none).
//! - For surface nodes, the bound surface and its [`WindowPixmap`](crate::pixmap::WindowPixmap).
//!
//! Nodes live in struct-of-arrays storage ([`SceneStore`]) shared by all
//! windows.
//!
//! # Dirty tracking
//!
//! Window-model notifications mark the channels of [`dirty`](crate::dirty)
//! and return. The next [`SceneGraph::update`] reconciles node sets and
//! recomputes only what was marked. Reconciliation keeps existing nodes
//! (relinking them when the model reorders sub-surfaces), so node handles
//! and paint-order ids are stable while the model is.

mod graph;
mod id;
mod store;
mod traverse;
mod update;
mod window;

pub use graph::SceneGraph;
pub use id::{INVALID, NodeId, NodeKind};
pub use store::SceneStore;
pub use traverse::{Children, Descendants};
pub use update::SceneChanges;
pub use window::{PaintDisabled, SceneWindow};
