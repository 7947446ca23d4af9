// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window quads.
//!
//! A [`WindowQuad`] is one textured rectangle of a window. Quads are produced
//! per scene node (one per rectangle of the node's shape), expressed in
//! frame-local coordinates, and tagged with the node's paint-order id so the
//! backend can find the pixel source to sample from.
//!
//! Effects may transform quads while painting. A quad remembers whether it
//! was moved, which lets the pipeline reject transformations made during
//! pre-paint.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

/// Which kind of scene node a quad was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuadKind {
    /// Drop shadow.
    Shadow,
    /// Server-side decoration.
    Decoration,
    /// Surface content.
    Contents,
}

/// One textured rectangle of a window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowQuad {
    kind: QuadKind,
    id: u32,
    rect: Rect,
    texture: Rect,
    transformed: bool,
}

impl WindowQuad {
    /// Creates an untransformed quad.
    ///
    /// `rect` is frame-local, `texture` is in the pixel space of the node the
    /// quad samples from.
    #[must_use]
    pub const fn new(kind: QuadKind, id: u32, rect: Rect, texture: Rect) -> Self {
        Self {
            kind,
            id,
            rect,
            texture,
            transformed: false,
        }
    }

    /// Kind of the originating node.
    #[must_use]
    pub const fn kind(&self) -> QuadKind {
        self.kind
    }

    /// Paint-order id of the originating node.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Current (possibly transformed) geometry, frame-local.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Texture coordinates.
    #[must_use]
    pub const fn texture(&self) -> Rect {
        self.texture
    }

    /// Returns `true` if the geometry was changed since construction.
    #[must_use]
    pub const fn is_transformed(&self) -> bool {
        self.transformed
    }

    /// Moves the quad.
    pub fn translate(&mut self, offset: Vec2) {
        if offset != Vec2::ZERO {
            self.rect = self.rect + offset;
            self.transformed = true;
        }
    }

    /// Scales the quad around the frame origin.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        if sx != 1.0 || sy != 1.0 {
            let r = self.rect;
            self.rect = Rect::new(r.x0 * sx, r.y0 * sy, r.x1 * sx, r.y1 * sy);
            self.transformed = true;
        }
    }
}

/// An ordered list of window quads, back to front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowQuadList {
    quads: Vec<WindowQuad>,
}

impl WindowQuadList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { quads: Vec::new() }
    }

    /// Appends a quad.
    pub fn push(&mut self, quad: WindowQuad) {
        self.quads.push(quad);
    }

    /// Appends every quad of `other`.
    pub fn extend_from(&mut self, other: &Self) {
        self.quads.extend_from_slice(&other.quads);
    }

    /// Removes all quads.
    pub fn clear(&mut self) {
        self.quads.clear();
    }

    /// Number of quads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Returns `true` if there are no quads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Returns the quads as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[WindowQuad] {
        &self.quads
    }

    /// Iterates over the quads.
    pub fn iter(&self) -> core::slice::Iter<'_, WindowQuad> {
        self.quads.iter()
    }

    /// Returns `true` if any quad was transformed.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        self.quads.iter().any(WindowQuad::is_transformed)
    }

    /// Returns the quads of one kind.
    #[must_use]
    pub fn filter(&self, kind: QuadKind) -> Self {
        self.quads.iter().filter(|q| q.kind == kind).copied().collect()
    }

    /// Returns the union of all quad rectangles, or [`Rect::ZERO`].
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        let mut iter = self.quads.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(first.rect, |acc, q| acc.union(q.rect))
    }

    /// Moves every quad.
    pub fn translate(&mut self, offset: Vec2) {
        for quad in &mut self.quads {
            quad.translate(offset);
        }
    }

    /// Scales every quad around the frame origin.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        for quad in &mut self.quads {
            quad.scale(sx, sy);
        }
    }
}

impl FromIterator<WindowQuad> for WindowQuadList {
    fn from_iter<I: IntoIterator<Item = WindowQuad>>(iter: I) -> Self {
        Self {
            quads: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a WindowQuadList {
    type Item = &'a WindowQuad;
    type IntoIter = core::slice::Iter<'a, WindowQuad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(kind: QuadKind, id: u32, x: f64) -> WindowQuad {
        let r = Rect::new(x, 0.0, x + 10.0, 10.0);
        WindowQuad::new(kind, id, r, r)
    }

    #[test]
    fn identity_transforms_keep_quads_pristine() {
        let mut list: WindowQuadList = [quad(QuadKind::Contents, 0, 0.0)].into_iter().collect();
        list.translate(Vec2::ZERO);
        list.scale(1.0, 1.0);
        assert!(!list.is_transformed());
    }

    #[test]
    fn translate_marks_transformed() {
        let mut list: WindowQuadList = [
            quad(QuadKind::Decoration, 0, 0.0),
            quad(QuadKind::Contents, 1, 10.0),
        ]
        .into_iter()
        .collect();
        list.translate(Vec2::new(5.0, 0.0));
        assert!(list.is_transformed());
        assert_eq!(list.bounding_rect(), Rect::new(5.0, 0.0, 25.0, 10.0));
        // Texture coordinates are untouched.
        assert_eq!(list.as_slice()[0].texture(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn filter_by_kind() {
        let list: WindowQuadList = [
            quad(QuadKind::Shadow, 0, 0.0),
            quad(QuadKind::Contents, 1, 10.0),
            quad(QuadKind::Contents, 2, 20.0),
        ]
        .into_iter()
        .collect();
        let contents = list.filter(QuadKind::Contents);
        assert_eq!(contents.len(), 2);
        assert!(contents.iter().all(|q| q.kind() == QuadKind::Contents));
    }
}
