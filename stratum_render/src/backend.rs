// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for rendering integrations.
//!
//! A backend owns the GPU (or CPU) resources of one output. Besides
//! creating pixel sources for surfaces ([`PixmapFactory`]) it provides:
//!
//! - **Frame bracketing.** [`prepare_rendering_frame`](Backend::prepare_rendering_frame)
//!   returns what the back buffer is missing given its age, and
//!   [`end_rendering_frame`](Backend::end_rendering_frame) receives the valid
//!   and update regions of the finished frame.
//! - **Drawing.** [`paint_background`](Backend::paint_background) clears
//!   exposed areas and [`perform_paint`](Backend::perform_paint) draws one
//!   window's quads.
//! - **Presentation.** [`present`](Backend::present) swaps or commits the
//!   frame.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_vblank() {
//!     scene.geometry_shape_changed(moved_window);
//!     stacking.rebuild(&policy);
//!
//!     let out = compositor.paint(&damage, FrameContext {
//!         model: &wm,
//!         scene: &mut scene,
//!         stacking: &stacking,
//!         effects: &effects,
//!         backend: &mut backend,
//!         clock: &now,
//!     });
//!     if out.repaint_requested {
//!         schedule_next_frame();
//!     }
//! }
//! ```

use stratum_core::model::OutputId;
use stratum_core::pixmap::PixmapFactory;
use stratum_core::region::Region;
use stratum_core::scene::SceneGraph;

use crate::data::WindowPaintData;
use crate::effect::EffectWindow;
use crate::mask::PaintMask;

/// Draws frames for one output.
pub trait Backend: PixmapFactory {
    /// The output this backend renders.
    fn output(&self) -> OutputId;

    /// Age of the current back buffer in frames; 0 when unknown.
    fn buffer_age(&self) -> u32;

    /// Starts a frame and returns the area the back buffer is missing
    /// compared to the front buffer, in output coordinates.
    fn prepare_rendering_frame(&mut self) -> Region;

    /// Clears `region` to the background.
    fn paint_background(&mut self, region: &Region);

    /// Draws the quads in `data` for `window`, clipped to `region`.
    ///
    /// Surface quads resolve to nodes through
    /// [`SceneGraph::quad_node`]; their pixel source is the node's pixmap.
    fn perform_paint(
        &mut self,
        scene: &SceneGraph,
        window: &EffectWindow,
        mask: PaintMask,
        region: &Region,
        data: &WindowPaintData,
    );

    /// Lets the backend grow the repaint area, for example to whole
    /// buffer tiles. `opaque_fullscreen` is set when the topmost window
    /// covers the output opaquely.
    fn extend_paint_region(&mut self, region: &mut Region, opaque_fullscreen: bool) {
        _ = (region, opaque_fullscreen);
    }

    /// Finishes the frame. `valid` is what the back buffer now holds
    /// correctly; `update` is what changed on screen.
    fn end_rendering_frame(&mut self, valid: &Region, update: &Region);

    /// Presents the finished frame.
    fn present(&mut self);
}
