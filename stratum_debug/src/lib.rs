// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for stratum
//! diagnostics.
//!
//! This crate provides [`TraceSink`](stratum_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] writes one human-readable line per event.
//! - [`recorder::RecorderSink`] records events in a compact binary form,
//!   read back with [`recorder::decode`].
//! - [`chrome::export`] turns a recording into Chrome Trace Event Format
//!   JSON.

pub mod chrome;
pub mod pretty;
pub mod recorder;
