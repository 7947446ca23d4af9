// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement of window and desktop previews inside their items.

use kurbo::{Affine, Rect, Size, Vec2};

/// Where a previewed window is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowThumbnailPlacement {
    /// Horizontal scale applied to the previewed window.
    pub x_scale: f64,
    /// Vertical scale applied to the previewed window.
    pub y_scale: f64,
    /// Offset of the scaled frame from the window's real frame origin.
    pub translation: Vec2,
    /// Output area covered by the preview, shadow included.
    pub target: Rect,
}

impl WindowThumbnailPlacement {
    /// Fits a window into `item` (output coordinates).
    ///
    /// `frame` and `visual` are the previewed window's frame and expanded
    /// geometry. The visual rectangle is scaled to fit the item, keeping its
    /// aspect ratio and never enlarged, then centered. Returns `None` if
    /// either the item or the window is empty.
    #[must_use]
    pub fn fit(item: Rect, frame: Rect, visual: Rect) -> Option<Self> {
        if visual.is_zero_area() || item.is_zero_area() {
            return None;
        }
        let mut size = fit_size(visual.size(), item.size());
        if size.width > visual.width() || size.height > visual.height() {
            size = visual.size();
        }
        let x = item.x0 + (item.width() - size.width) / 2.0;
        let y = item.y0 + (item.height() - size.height) / 2.0;
        let x_scale = size.width / visual.width();
        let y_scale = size.height / visual.height();
        let translation = Vec2::new(
            x - frame.x0 + (frame.x0 - visual.x0) * x_scale,
            y - frame.y0 + (frame.y0 - visual.y0) * y_scale,
        );
        Some(Self {
            x_scale,
            y_scale,
            translation,
            target: Rect::from_origin_size((x, y), size),
        })
    }
}

/// Where a previewed desktop is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesktopThumbnailPlacement {
    /// Output-to-preview transformation for everything on the desktop.
    pub transform: Affine,
    /// Output area covered by the preview.
    pub target: Rect,
}

impl DesktopThumbnailPlacement {
    /// Fits the whole `display` into `item` (output coordinates), keeping
    /// the aspect ratio, centered. Returns `None` if either is empty.
    #[must_use]
    pub fn fit(display: Rect, item: Rect) -> Option<Self> {
        if display.is_zero_area() || item.is_zero_area() {
            return None;
        }
        let size = fit_size(display.size(), item.size());
        let x = item.x0 + (item.width() - size.width) / 2.0;
        let y = item.y0 + (item.height() - size.height) / 2.0;
        let transform = Affine::translate((x, y))
            * Affine::scale_non_uniform(
                size.width / display.width(),
                size.height / display.height(),
            )
            * Affine::translate(-display.origin().to_vec2());
        Some(Self {
            transform,
            target: Rect::from_origin_size((x, y), size),
        })
    }
}

/// Scales `size` to fit in `bounds`, keeping the aspect ratio.
fn fit_size(size: Size, bounds: Size) -> Size {
    let scale = (bounds.width / size.width).min(bounds.height / size.height);
    Size::new(size.width * scale, size.height * scale)
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;

    #[test]
    fn window_preview_keeps_aspect_and_aligns_visual_edge() {
        let frame = Rect::new(100.0, 100.0, 300.0, 250.0);
        let visual = Rect::new(90.0, 90.0, 310.0, 260.0);
        let item = Rect::new(0.0, 0.0, 110.0, 200.0);
        let p = WindowThumbnailPlacement::fit(item, frame, visual).unwrap();

        assert_eq!(p.x_scale, 0.5);
        assert_eq!(p.y_scale, 0.5);
        assert_eq!(p.target, Rect::new(0.0, 57.5, 110.0, 142.5));
        // The shadow's top-left corner lands on the target's top-left.
        let corner = frame.origin() + p.translation + (visual.origin() - frame.origin()) * 0.5;
        assert_eq!(corner, Point::new(0.0, 57.5));
    }

    #[test]
    fn window_preview_is_never_enlarged() {
        let frame = Rect::new(0.0, 0.0, 100.0, 50.0);
        let item = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let p = WindowThumbnailPlacement::fit(item, frame, frame).unwrap();

        assert_eq!((p.x_scale, p.y_scale), (1.0, 1.0));
        assert_eq!(p.target, Rect::new(450.0, 475.0, 550.0, 525.0));
        assert_eq!(p.translation, Vec2::new(450.0, 475.0));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let frame = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(WindowThumbnailPlacement::fit(Rect::ZERO, frame, frame).is_none());
        assert!(DesktopThumbnailPlacement::fit(frame, Rect::ZERO).is_none());
    }

    #[test]
    fn desktop_preview_letterboxes() {
        let display = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        let item = Rect::new(100.0, 100.0, 580.0, 580.0);
        let p = DesktopThumbnailPlacement::fit(display, item).unwrap();

        assert_eq!(p.target, Rect::new(100.0, 205.0, 580.0, 475.0));
        assert_eq!(p.transform * Point::ORIGIN, Point::new(100.0, 205.0));
        assert_eq!(
            p.transform * Point::new(1920.0, 1080.0),
            Point::new(580.0, 475.0)
        );
    }
}
