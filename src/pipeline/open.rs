//! Document opening: parse the bytes and extract the first page.

use crate::backend::{BackendDocument, PageSize, RenderBackend};
use crate::error::ConvertError;
use crate::pipeline::input::RawDocument;
use tracing::debug;

/// Index of the only page a preview is rendered from.
pub const FIRST_PAGE: usize = 0;

/// A page ready for rasterisation.
///
/// The page keeps its document open; both are released together when the
/// handle is dropped after rendering.
pub struct PageHandle<D> {
    document: D,
    index: usize,
    size: PageSize,
}

impl<D: BackendDocument> PageHandle<D> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Intrinsic size at scale 1, in points.
    pub fn size(&self) -> PageSize {
        self.size
    }

    pub(crate) fn document(&self) -> &D {
        &self.document
    }
}

/// Parse `raw` with `backend` and extract its first page.
///
/// # Errors
/// - [`ConvertError::DocumentParse`] when the bytes are not a document the
///   backend can read (including an empty buffer)
/// - [`ConvertError::PageNotFound`] when the document has no pages
pub fn open_first_page<'a, B: RenderBackend>(
    backend: &'a B,
    raw: &'a RawDocument,
) -> Result<PageHandle<B::Document<'a>>, ConvertError> {
    if raw.is_empty() {
        return Err(ConvertError::parse("input is empty (0 bytes), not a valid PDF"));
    }

    let document = backend
        .open_document(raw.as_bytes())
        .map_err(|e| ConvertError::parse(format!("not a valid PDF: {e}")))?;

    let pages = document.page_count();
    debug!("{} opened document: {} pages", backend.name(), pages);
    if pages == 0 {
        return Err(ConvertError::PageNotFound);
    }

    let size = document
        .page_size(FIRST_PAGE)
        .map_err(|e| ConvertError::parse(format!("unreadable first page: {e}")))?;

    Ok(PageHandle {
        document,
        index: FIRST_PAGE,
        size,
    })
}
