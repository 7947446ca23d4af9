// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel sources bound to surface nodes.
//!
//! A [`PixelSource`] is created by the backend through [`PixmapFactory`] and
//! describes a resource holding a surface's pixels (a platform pixmap, a
//! shared client buffer or an offscreen render target). A [`WindowPixmap`]
//! shares one pixel source with the backend and is bound to exactly one
//! surface node.
//!
//! Pixmaps are never patched. Once a pixmap is [invalidated](WindowPixmap::invalidate)
//! (the surface was resized or its buffer was destroyed) it stays invalid and
//! a new one is created in its place by
//! [`SceneGraph::update_pixmaps`](crate::scene::SceneGraph::update_pixmaps).

use alloc::rc::Rc;
use core::fmt;

use kurbo::Size;

use crate::model::{SurfaceId, WindowId};

/// An opaque handle to a backend-managed pixel resource.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(pub u64);

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({})", self.0)
    }
}

/// Where a surface's pixels come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelSourceKind {
    /// A platform pixmap owned by the display server.
    Platform,
    /// A buffer shared by the client.
    SharedBuffer,
    /// An offscreen render target owned by the compositor.
    Offscreen,
}

/// Parameters for creating a pixel source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelSourceRequest {
    /// Window owning the surface.
    pub window: WindowId,
    /// The surface whose pixels are requested.
    pub surface: SurfaceId,
    /// Kind of pixel source to create.
    pub kind: PixelSourceKind,
    /// Size of the surface in pixels.
    pub size: Size,
}

/// A backend resource holding one surface's pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelSource {
    /// Backend handle.
    pub key: ResourceKey,
    /// Kind of the resource.
    pub kind: PixelSourceKind,
    /// Size in pixels.
    pub size: Size,
}

/// Why a pixel source could not be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PixmapError {
    /// The surface has no area.
    #[error("pixel source has zero size")]
    EmptySize,
    /// The surface has no content attached yet, or the buffer was released.
    #[error("pixel source is not available")]
    Unavailable,
    /// The backend cannot import this kind of pixel source.
    #[error("{0:?} pixel sources are not supported by this backend")]
    UnsupportedKind(PixelSourceKind),
}

/// Creates pixel sources. Implemented by rendering backends.
pub trait PixmapFactory {
    /// Creates a pixel source for the requested surface.
    fn create_pixel_source(
        &mut self,
        request: &PixelSourceRequest,
    ) -> Result<PixelSource, PixmapError>;
}

/// A pixel source bound to a surface node.
#[derive(Clone, Debug)]
pub struct WindowPixmap {
    source: Rc<PixelSource>,
    valid: bool,
}

impl WindowPixmap {
    /// Creates a pixmap for `request`.
    ///
    /// Zero-sized requests are rejected before reaching the factory.
    pub fn create<F: PixmapFactory + ?Sized>(
        factory: &mut F,
        request: &PixelSourceRequest,
    ) -> Result<Self, PixmapError> {
        if !(request.size.width > 0.0 && request.size.height > 0.0) {
            return Err(PixmapError::EmptySize);
        }
        let source = factory.create_pixel_source(request)?;
        Ok(Self {
            source: Rc::new(source),
            valid: true,
        })
    }

    /// Returns whether the pixmap may still be used for painting.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the pixmap unusable. It is replaced, never revalidated.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Returns the shared pixel source.
    #[must_use]
    pub fn source(&self) -> &Rc<PixelSource> {
        &self.source
    }

    /// Returns the backend handle of the pixel source.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.source.key
    }

    /// Returns the size of the pixel source.
    #[must_use]
    pub fn size(&self) -> Size {
        self.source.size
    }

    /// Returns `true` if the pixmap is valid and matches `size`.
    #[must_use]
    pub fn is_usable_for(&self, size: Size) -> bool {
        self.valid && self.source.size == size
    }
}
