//! The rendering backend seam.
//!
//! The pipeline needs four things from a PDF engine: open a document, ask how
//! many pages it has, ask a page's size, and paint a page into a surface.
//! [`RenderBackend`] and [`BackendDocument`] expose exactly those, so the
//! pipeline can run against pdfium in production and a scripted double in
//! tests.
//!
//! - [`loader`]: lazy, deduplicated, retryable initialisation of a backend
//! - [`pdfium`]: the pdfium implementation and its library location

pub mod loader;
pub mod pdfium;

use crate::config::RenderQuality;
use crate::error::BackendError;
use crate::pipeline::render::Surface;
use serde::{Deserialize, Serialize};

/// A loaded document engine.
///
/// Implementations are shared behind an `Arc` by every conversion in the
/// process, and documents are opened on blocking worker threads.
pub trait RenderBackend: Send + Sync + 'static {
    /// An opened document. It may borrow the backend and the input bytes.
    type Document<'a>: BackendDocument
    where
        Self: 'a;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Parse `bytes` as a document.
    fn open_document<'a>(&'a self, bytes: &'a [u8]) -> Result<Self::Document<'a>, BackendError>;
}

/// An opened document.
pub trait BackendDocument {
    fn page_count(&self) -> usize;

    /// Intrinsic size of page `index` at scale 1.
    fn page_size(&self, index: usize) -> Result<PageSize, BackendError>;

    /// Paint page `index` into `surface`, filling it exactly.
    fn paint_page(
        &self,
        index: usize,
        surface: &mut Surface,
        quality: RenderQuality,
    ) -> Result<(), BackendError>;
}

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}
