// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The scene graph uses multi-channel dirty tracking (via [`understory_dirty`])
//! to defer all work triggered by window-model notifications to the next
//! [`SceneGraph::update`](crate::scene::SceneGraph::update). Keys are raw node
//! slot indices. Each channel represents an independent attribute of a scene
//! node.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] and [`VISIBILITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and have dependency edges
//!   from child to parent. Marking a window's root node dirty marks every
//!   node of its tree, because a frame move or a hidden window affects all
//!   of them.
//!
//! - **Local-only**: [`SHAPE`], [`QUADS`] and [`PIXEL_SOURCE`] are marked
//!   with the default policy and only concern the marked node.
//!
//! - **Structural**: [`CHILDREN`] is marked on a window's root node when the
//!   set of nodes the window needs may have changed (sub-surfaces, shadow,
//!   decoration). It triggers reconciliation of that window's tree.
//!
//! # Consumption
//!
//! Window-model notifications only mark channels. Each
//! [`SceneGraph::update`](crate::scene::SceneGraph::update) call drains all
//! channels once, in the order CHILDREN, GEOMETRY, SHAPE, VISIBILITY, QUADS,
//! PIXEL\_SOURCE, and reports what it recomputed as
//! [`SceneChanges`](crate::scene::SceneChanges).

use understory_dirty::Channel;

/// Position or size changed; recomputed for the node and its descendants.
pub const GEOMETRY: Channel = Channel::new(0);

/// Visibility changed; recomputed for the node and its descendants.
pub const VISIBILITY: Channel = Channel::new(1);

/// Pixel-space shape changed; no propagation needed.
pub const SHAPE: Channel = Channel::new(2);

/// The window's node set may have changed; triggers reconciliation.
pub const CHILDREN: Channel = Channel::new(3);

/// Window quads need rebuilding; no propagation needed.
pub const QUADS: Channel = Channel::new(4);

/// The bound pixel source is stale; no propagation needed.
pub const PIXEL_SOURCE: Channel = Channel::new(5);
