// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame painting for stratum.
//!
//! Turns the stacking order and scene graph of [`stratum_core`] into backend
//! draw calls, one frame at a time. A frame runs in three phases:
//!
//! 1. **Pre-paint.** The screen, then every stacked window, is offered to
//!    the [`EffectChain`], which may widen the area to repaint, mark windows
//!    translucent or transformed, or disable painting of a window.
//! 2. **Paint.** The screen is painted through the chain. Without
//!    transformations the *simple* strategy clips every window against the
//!    opaque windows above it and paints only damaged areas; once anything
//!    is transformed the *generic* strategy paints everything, back to front.
//! 3. **Post-paint.** Effects get a final look at every window and the
//!    screen, and may schedule repaints for the next frame.
//!
//! The [`Compositor`] then reports the regions that changed (the update
//! region) and that are now correct in the back buffer (the valid region).
//!
//! Backends implement [`Backend`]; [`DamageJournal`] helps them answer
//! buffer-age queries.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod backend;
mod damage;
mod data;
mod effect;
mod mask;
mod pipeline;
mod thumbnail;

pub use backend::Backend;
pub use damage::DamageJournal;
pub use data::{ScreenPaintData, ScreenPrePaintData, WindowPaintData, WindowPrePaintData};
pub use effect::{Effect, EffectChain, EffectWindow, Next};
pub use mask::{PaintMask, PaintStrategy};
pub use pipeline::{Compositor, CompositorConfig, FrameContext, FrameOutput};
pub use thumbnail::{DesktopThumbnailPlacement, WindowThumbnailPlacement};
