// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data handed through the effect chain during a frame.

use kurbo::{Affine, Point, Rect, Vec2};
use stratum_core::model::OutputId;
use stratum_core::quad::WindowQuadList;
use stratum_core::region::Region;
use stratum_core::scene::PaintDisabled;

use crate::mask::PaintMask;

/// Screen pre-paint negotiation.
#[derive(Clone, Debug, Default)]
pub struct ScreenPrePaintData {
    /// Screen paint mask. Effects add transformation flags here.
    pub mask: PaintMask,
    /// Area to repaint, in output coordinates. Effects may only grow it.
    pub paint: Region,
}

/// Window pre-paint negotiation.
#[derive(Clone, Debug, Default)]
pub struct WindowPrePaintData {
    /// Window paint mask.
    pub mask: PaintMask,
    /// Area of this window to repaint, in output coordinates.
    pub paint: Region,
    /// Area this window covers opaquely; windows below are culled there.
    pub clip: Region,
    /// The window's quads. Effects may split or filter them here, but must
    /// not transform them.
    pub quads: WindowQuadList,
    disabled: PaintDisabled,
}

impl WindowPrePaintData {
    pub(crate) fn new(mask: PaintMask, disabled: PaintDisabled) -> Self {
        Self {
            mask,
            disabled,
            ..Self::default()
        }
    }

    /// Marks the window translucent. It no longer occludes anything.
    pub fn set_translucent(&mut self) {
        self.mask |= PaintMask::WINDOW_TRANSLUCENT;
        self.mask -= PaintMask::WINDOW_OPAQUE;
        self.clip.clear();
    }

    /// Marks the window transformed. Its clip is then ignored for
    /// occlusion.
    pub fn set_transformed(&mut self) {
        self.mask |= PaintMask::WINDOW_TRANSFORMED;
    }

    /// Adds a reason not to paint the window this frame.
    pub fn disable_painting(&mut self, reason: PaintDisabled) {
        self.disabled |= reason;
    }

    /// Clears a reason not to paint the window, for example to keep a
    /// minimized window on screen during an animation.
    pub fn enable_painting(&mut self, reason: PaintDisabled) {
        self.disabled -= reason;
    }

    /// Current painting-disabled reasons.
    #[must_use]
    pub fn painting_disabled(&self) -> PaintDisabled {
        self.disabled
    }
}

/// Screen paint parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPaintData {
    /// The output being painted.
    pub output: OutputId,
    /// Output rectangle.
    pub display: Rect,
    /// Transformation applied to everything painted on this screen.
    pub transform: Affine,
}

impl ScreenPaintData {
    /// Untransformed paint data for `output`.
    #[must_use]
    pub fn new(output: OutputId, display: Rect) -> Self {
        Self {
            output,
            display,
            transform: Affine::IDENTITY,
        }
    }

    /// Returns `true` if the screen is painted with a transformation.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        self.transform != Affine::IDENTITY
    }
}

/// Window paint parameters.
///
/// Quads are frame-local. A quad point `p` lands on the output at
/// `screen_transform * (frame_origin + translation + p * scale)`.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowPaintData {
    /// Opacity multiplier in `0.0..=1.0`.
    pub opacity: f64,
    /// Brightness multiplier.
    pub brightness: f64,
    /// Saturation multiplier.
    pub saturation: f64,
    /// Horizontal scale.
    pub x_scale: f64,
    /// Vertical scale.
    pub y_scale: f64,
    /// Offset added after scaling.
    pub translation: Vec2,
    /// Quads to paint.
    pub quads: WindowQuadList,
    /// Transformation of the screen the window is painted on.
    pub screen_transform: Affine,
}

impl WindowPaintData {
    /// Untransformed paint data.
    #[must_use]
    pub fn new(opacity: f64, quads: WindowQuadList, screen_transform: Affine) -> Self {
        Self {
            opacity,
            brightness: 1.0,
            saturation: 1.0,
            x_scale: 1.0,
            y_scale: 1.0,
            translation: Vec2::ZERO,
            quads,
            screen_transform,
        }
    }

    /// Returns `true` if the window itself is scaled or moved.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        self.x_scale != 1.0 || self.y_scale != 1.0 || self.translation != Vec2::ZERO
    }

    /// Multiplies the opacity.
    pub fn multiply_opacity(&mut self, factor: f64) {
        self.opacity = (self.opacity * factor).clamp(0.0, 1.0);
    }

    /// The frame-local to output transformation for a window whose frame
    /// starts at `frame_origin`.
    #[must_use]
    pub fn transform(&self, frame_origin: Point) -> Affine {
        self.screen_transform
            * Affine::translate(frame_origin.to_vec2() + self.translation)
            * Affine::scale_non_uniform(self.x_scale, self.y_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_translucent_drops_clip_and_opacity_flag() {
        let mut data = WindowPrePaintData::new(PaintMask::WINDOW_OPAQUE, PaintDisabled::empty());
        data.clip = Region::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        data.set_translucent();
        assert!(data.clip.is_empty());
        assert!(data.mask.contains(PaintMask::WINDOW_TRANSLUCENT));
        assert!(!data.mask.contains(PaintMask::WINDOW_OPAQUE));
    }

    #[test]
    fn painting_reasons_toggle() {
        let mut data = WindowPrePaintData::new(PaintMask::empty(), PaintDisabled::BY_MINIMIZE);
        data.disable_painting(PaintDisabled::DISABLED);
        data.enable_painting(PaintDisabled::BY_MINIMIZE);
        assert_eq!(data.painting_disabled(), PaintDisabled::DISABLED);
    }

    #[test]
    fn window_transform_scales_then_translates() {
        let mut data = WindowPaintData::new(1.0, WindowQuadList::new(), Affine::IDENTITY);
        assert!(!data.is_transformed());
        data.x_scale = 0.5;
        data.y_scale = 0.5;
        data.translation = Vec2::new(-95.0, -95.0);
        assert!(data.is_transformed());
        let p = data.transform(Point::new(100.0, 100.0)) * Point::new(-10.0, -10.0);
        assert_eq!(p, Point::new(0.0, 0.0));
    }

    #[test]
    fn opacity_is_clamped() {
        let mut data = WindowPaintData::new(0.8, WindowQuadList::new(), Affine::IDENTITY);
        data.multiply_opacity(2.0);
        assert_eq!(data.opacity, 1.0);
    }
}
