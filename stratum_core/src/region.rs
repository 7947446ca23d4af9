// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectilinear regions.
//!
//! A [`Region`] is a set of pairwise-disjoint, axis-aligned rectangles. It is
//! used for window shapes, opaque clips, damage and paint regions. Equality
//! compares the covered point sets, so two regions built from different
//! rectangle decompositions of the same area are equal.

use alloc::vec::Vec;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub, SubAssign};

use kurbo::{Point, Rect, Vec2};

/// Half-extent of [`Region::infinite`].
const INFINITE_EXTENT: f64 = 1_073_741_824.0;

/// A set of disjoint axis-aligned rectangles.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region covering `rect`. Zero-area rectangles yield an empty
    /// region.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        if is_degenerate(rect) {
            Self::new()
        } else {
            Self {
                rects: alloc::vec![rect],
            }
        }
    }

    /// A region large enough to contain any output.
    ///
    /// Used when painting is not restricted to a region, for example while a
    /// transform is in effect.
    #[must_use]
    pub fn infinite() -> Self {
        Self::from_rect(Rect::new(
            -INFINITE_EXTENT,
            -INFINITE_EXTENT,
            INFINITE_EXTENT,
            INFINITE_EXTENT,
        ))
    }

    /// Returns `true` if the region covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Returns the disjoint rectangles making up the region.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Returns the smallest rectangle containing the region, or
    /// [`Rect::ZERO`] if it is empty.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        let mut iter = self.rects.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(*first, |acc, r| acc.union(*r))
    }

    /// Returns the covered area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(Rect::area).sum()
    }

    /// Returns `true` if `point` lies inside the region.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        self.rects.iter().any(|r| r.contains(point))
    }

    /// Returns `true` if every point of `rect` lies inside the region.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        let mut rest = Self::from_rect(rect);
        rest.subtract(self);
        rest.is_empty()
    }

    /// Returns `true` if the region and `rect` overlap.
    #[must_use]
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.rects
            .iter()
            .any(|r| !is_degenerate(r.intersect(rect)))
    }

    /// Removes every rectangle.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Adds `rect` to the region.
    pub fn union_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        if is_degenerate(rect) {
            return;
        }
        let mut pieces = alloc::vec![rect];
        let mut scratch = Vec::new();
        for existing in &self.rects {
            scratch.clear();
            for piece in &pieces {
                subtract_rect(*piece, *existing, &mut scratch);
            }
            core::mem::swap(&mut pieces, &mut scratch);
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
    }

    /// Adds every rectangle of `other` to the region.
    pub fn union(&mut self, other: &Self) {
        if self.is_empty() {
            self.rects.clone_from(&other.rects);
            return;
        }
        for rect in &other.rects {
            self.union_rect(*rect);
        }
    }

    /// Removes `rect` from the region.
    pub fn subtract_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        if is_degenerate(rect) || self.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.rects.len());
        for existing in &self.rects {
            subtract_rect(*existing, rect, &mut out);
        }
        self.rects = out;
    }

    /// Removes every rectangle of `other` from the region.
    pub fn subtract(&mut self, other: &Self) {
        for rect in &other.rects {
            if self.is_empty() {
                return;
            }
            self.subtract_rect(*rect);
        }
    }

    /// Restricts the region to `rect`.
    pub fn intersect_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.rects = self
            .rects
            .iter()
            .map(|r| r.intersect(rect))
            .filter(|r| !is_degenerate(*r))
            .collect();
    }

    /// Restricts the region to the area it shares with `other`.
    pub fn intersect(&mut self, other: &Self) {
        let mut out = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                let i = a.intersect(*b);
                if !is_degenerate(i) {
                    out.push(i);
                }
            }
        }
        self.rects = out;
    }

    /// Moves the region by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        for rect in &mut self.rects {
            *rect = *rect + offset;
        }
    }

    /// Returns a copy of the region moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        let mut out = self.clone();
        out.translate(offset);
        out
    }
}

/// Returns `true` for rectangles that cover no area (including NaN extents).
fn is_degenerate(rect: Rect) -> bool {
    !(rect.width() > 0.0 && rect.height() > 0.0)
}

/// Pushes the parts of `a` not covered by `b` onto `out`.
fn subtract_rect(a: Rect, b: Rect, out: &mut Vec<Rect>) {
    let i = a.intersect(b);
    if is_degenerate(i) {
        out.push(a);
        return;
    }
    if i.y0 > a.y0 {
        out.push(Rect::new(a.x0, a.y0, a.x1, i.y0));
    }
    if i.y1 < a.y1 {
        out.push(Rect::new(a.x0, i.y1, a.x1, a.y1));
    }
    if i.x0 > a.x0 {
        out.push(Rect::new(a.x0, i.y0, i.x0, i.y1));
    }
    if i.x1 < a.x1 {
        out.push(Rect::new(i.x1, i.y0, a.x1, i.y1));
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        if self.rects == other.rects {
            return true;
        }
        let mut a = self.clone();
        a.subtract(other);
        if !a.is_empty() {
            return false;
        }
        let mut b = other.clone();
        b.subtract(self);
        b.is_empty()
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl FromIterator<Rect> for Region {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        let mut region = Self::new();
        for rect in iter {
            region.union_rect(rect);
        }
        region
    }
}

impl BitOrAssign<&Self> for Region {
    fn bitor_assign(&mut self, rhs: &Self) {
        self.union(rhs);
    }
}

impl BitOrAssign<Rect> for Region {
    fn bitor_assign(&mut self, rhs: Rect) {
        self.union_rect(rhs);
    }
}

impl SubAssign<&Self> for Region {
    fn sub_assign(&mut self, rhs: &Self) {
        self.subtract(rhs);
    }
}

impl SubAssign<Rect> for Region {
    fn sub_assign(&mut self, rhs: Rect) {
        self.subtract_rect(rhs);
    }
}

impl BitAndAssign<&Self> for Region {
    fn bitand_assign(&mut self, rhs: &Self) {
        self.intersect(rhs);
    }
}

impl BitAndAssign<Rect> for Region {
    fn bitand_assign(&mut self, rhs: Rect) {
        self.intersect_rect(rhs);
    }
}

impl BitOr for &Region {
    type Output = Region;

    fn bitor(self, rhs: Self) -> Region {
        let mut out = self.clone();
        out.union(rhs);
        out
    }
}

impl Sub for &Region {
    type Output = Region;

    fn sub(self, rhs: Self) -> Region {
        let mut out = self.clone();
        out.subtract(rhs);
        out
    }
}

impl BitAnd for &Region {
    type Output = Region;

    fn bitand(self, rhs: Self) -> Region {
        let mut out = self.clone();
        out.intersect(rhs);
        out
    }
}
