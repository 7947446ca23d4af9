// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint masks and painting strategies.

bitflags::bitflags! {
    /// Flags describing how the screen or a window is painted.
    ///
    /// Screen-level flags are negotiated during pre-paint; window-level
    /// flags are set per window and refined by effects.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PaintMask: u32 {
        /// The window is fully opaque and may occlude windows below it.
        const WINDOW_OPAQUE = 1 << 0;
        /// The window is (partially) translucent.
        const WINDOW_TRANSLUCENT = 1 << 1;
        /// The window is painted with a scale or offset.
        const WINDOW_TRANSFORMED = 1 << 2;
        /// Only a region of the screen is painted.
        const SCREEN_REGION = 1 << 3;
        /// The whole screen is painted with a transformation.
        const SCREEN_TRANSFORMED = 1 << 4;
        /// At least one window is transformed; no region painting.
        const SCREEN_WITH_TRANSFORMED_WINDOWS = 1 << 5;
        /// The background is cleared before any window is painted.
        const SCREEN_BACKGROUND_FIRST = 1 << 6;
        /// Use high-quality filtering for scaled window contents.
        const WINDOW_LANCZOS = 1 << 8;
    }
}

impl PaintMask {
    /// Returns `true` if the mask forces the generic strategy.
    #[must_use]
    pub const fn is_transformed(self) -> bool {
        self.intersects(Self::SCREEN_TRANSFORMED.union(Self::SCREEN_WITH_TRANSFORMED_WINDOWS))
    }

    /// The strategy used to paint a screen with this mask.
    #[must_use]
    pub const fn strategy(self) -> PaintStrategy {
        if self.is_transformed() {
            PaintStrategy::Generic
        } else {
            PaintStrategy::Simple
        }
    }
}

/// How the windows of a screen are painted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaintStrategy {
    /// Region painting with occlusion culling. Used when nothing is
    /// transformed.
    #[default]
    Simple,
    /// Every window painted whole, back to front, with no culling.
    Generic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformed_masks_select_generic() {
        assert_eq!(PaintMask::empty().strategy(), PaintStrategy::Simple);
        assert_eq!(PaintMask::SCREEN_REGION.strategy(), PaintStrategy::Simple);
        assert_eq!(
            PaintMask::SCREEN_TRANSFORMED.strategy(),
            PaintStrategy::Generic
        );
        assert_eq!(
            (PaintMask::SCREEN_REGION | PaintMask::SCREEN_WITH_TRANSFORMED_WINDOWS).strategy(),
            PaintStrategy::Generic
        );
    }

    #[test]
    fn lanczos_skips_bit_seven() {
        assert_eq!(PaintMask::WINDOW_LANCZOS.bits(), 256);
        assert_eq!(PaintMask::SCREEN_BACKGROUND_FIRST.bits(), 64);
    }
}
