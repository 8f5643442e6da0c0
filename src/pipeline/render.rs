//! Page rasterisation: page handle + scale → a painted [`Surface`].
//!
//! ## Viewport
//!
//! The viewport is the page's intrinsic size in points multiplied by the
//! scale and rounded to whole device pixels. Both sides must come out as at
//! least one pixel; a zero-sized viewport is a rasterisation failure rather
//! than an empty image.
//!
//! ## Surface allocation
//!
//! Allocation is the point where a browser canvas can refuse to hand out a
//! 2D context. Here the equivalent refusals are explicit: a viewport beyond
//! [`SurfaceLimits`] or a failed memory reservation becomes
//! [`ConvertError::Rasterization`] instead of an abort.

use crate::backend::{BackendDocument, PageSize};
use crate::config::{RenderQuality, SurfaceLimits};
use crate::error::ConvertError;
use crate::pipeline::open::PageHandle;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Render dimensions in device pixels. Both sides are ≥ 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Scale `page` by `scale`, rounding to whole pixels.
    pub fn for_page(page: PageSize, scale: f32) -> Result<Self, ConvertError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConvertError::raster(format!(
                "scale must be a positive number, got {scale}"
            )));
        }
        if !(page.width.is_finite() && page.height.is_finite())
            || page.width <= 0.0
            || page.height <= 0.0
        {
            return Err(ConvertError::raster(format!(
                "page has no drawable area ({} × {} pt)",
                page.width, page.height
            )));
        }

        let width = (f64::from(page.width) * f64::from(scale)).round();
        let height = (f64::from(page.height) * f64::from(scale)).round();
        if width < 1.0 || height < 1.0 {
            return Err(ConvertError::raster(format!(
                "viewport {width} × {height} px is empty at scale {scale}"
            )));
        }
        if width > f64::from(u32::MAX) || height > f64::from(u32::MAX) {
            return Err(ConvertError::raster(format!(
                "viewport {width} × {height} px is too large"
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An RGBA pixel buffer of exactly one viewport's size.
///
/// Starts opaque white, is painted in place by the backend, and is read once
/// by the encoder.
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Allocate a white surface for `viewport`, refusing sizes beyond `limits`.
    pub fn allocate(viewport: Viewport, limits: &SurfaceLimits) -> Result<Self, ConvertError> {
        if viewport.width > limits.max_side || viewport.height > limits.max_side {
            return Err(ConvertError::raster(format!(
                "cannot acquire a {viewport} drawing surface: sides are limited to {} px",
                limits.max_side
            )));
        }
        if viewport.pixel_count() > limits.max_pixels {
            return Err(ConvertError::raster(format!(
                "cannot acquire a {viewport} drawing surface: area is limited to {} px",
                limits.max_pixels
            )));
        }

        let len = usize::try_from(viewport.pixel_count() * 4).map_err(|_| {
            ConvertError::raster(format!("{viewport} drawing surface exceeds address space"))
        })?;
        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(len).map_err(|e| {
            ConvertError::raster(format!("cannot acquire a {viewport} drawing surface: {e}"))
        })?;
        buf.resize(len, 255);

        let pixels = RgbaImage::from_raw(viewport.width, viewport.height, buf).ok_or_else(|| {
            ConvertError::raster(format!("{viewport} drawing surface has the wrong size"))
        })?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Read access to the pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Write access to the pixels, for backends that paint pixel by pixel.
    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Copy `image` onto the surface at the origin, clipping anything that
    /// does not fit. The surface keeps its size.
    pub fn draw(&mut self, image: &RgbaImage) {
        image::imageops::replace(&mut self.pixels, image, 0, 0);
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Rasterise `page` at `scale`.
///
/// # Errors
/// [`ConvertError::Rasterization`] for an invalid scale, a surface that
/// cannot be allocated, or a failed paint.
pub fn render_page<D: BackendDocument>(
    page: &PageHandle<D>,
    scale: f32,
    quality: RenderQuality,
    limits: &SurfaceLimits,
) -> Result<Surface, ConvertError> {
    let viewport = Viewport::for_page(page.size(), scale)?;
    debug!(
        "Page {} is {} × {} pt → viewport {} at scale {}",
        page.index() + 1,
        page.size().width,
        page.size().height,
        viewport,
        scale
    );

    let mut surface = Surface::allocate(viewport, limits)?;
    page.document()
        .paint_page(page.index(), &mut surface, quality)
        .map_err(|e| ConvertError::raster(format!("paint failed: {e}")))?;

    info!("Rendered page {} → {} px", page.index() + 1, viewport);
    Ok(surface)
}
