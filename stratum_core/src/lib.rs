// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window ordering, scene tree and pixmap lifecycle for a desktop compositor.
//!
//! `stratum_core` holds everything a compositor needs to know about windows
//! before it paints them. It is `no_std` compatible (with `alloc`) and keeps
//! its scene tree in struct-of-arrays storage addressed by generational
//! handles.
//!
//! # Architecture
//!
//! ```text
//!   WindowModel notifications ──► SceneGraph (dirty bits only)
//!                                      │
//!   LayerPolicy ──► StackingOrder::rebuild()
//!                          │           │
//!                          ▼           ▼
//!                  ordered windows   SceneGraph::update() ──► SceneChanges
//!                          │           │
//!                          └─────┬─────┘
//!                                ▼
//!                    paint pipeline (stratum_render)
//! ```
//!
//! **[`stack`]**: The single authoritative bottom-to-top window order,
//! produced from a fixed layer policy plus a graph of "must stay below"
//! constraints.
//!
//! **[`scene`]**: Per-window trees of paintable nodes (root, shadow,
//! decoration, surfaces), reconciled incrementally against the window model.
//!
//! **[`dirty`]**: Multi-channel dirty tracking via `understory_dirty`.
//! GEOMETRY and VISIBILITY propagate to descendants; the other channels are
//! local to one node.
//!
//! **[`pixmap`]**: Pixel sources created by the backend and bound to
//! surface nodes with a replace-on-invalidation lifecycle.
//!
//! **[`region`]**: Sets of disjoint rectangles used for shapes, damage and
//! clipping.
//!
//! **[`quad`]**: Window quads, the textured rectangles a window is drawn
//! from.
//!
//! **[`model`]**: The [`WindowModel`](model::WindowModel) trait through which
//! the core reads window state it does not own.
//!
//! **[`time`]**: Monotonic host time and the frame clock that yields the
//! time elapsed between painting passes.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   change and damage-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod model;
pub mod pixmap;
pub mod quad;
pub mod region;
pub mod scene;
pub mod stack;
pub mod time;
pub mod trace;
