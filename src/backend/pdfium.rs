//! The pdfium backend and the process-wide location of its library.
//!
//! ## Library location
//!
//! pdfium ships as a platform shared library (`libpdfium.so`,
//! `libpdfium.dylib`, `pdfium.dll`) that must be bound before the first
//! document is parsed. Where it lives is fixed once per process:
//!
//! 1. [`configure_library`]: set explicitly by the host application before
//!    the first conversion.
//! 2. `PDFIUM_LIB_PATH`: a file path or a directory containing the platform
//!    library, read on first load if nothing was configured.
//! 3. The system library search path.
//!
//! Once a location has been used it can no longer change.
//!
//! ## Thread safety
//!
//! The backend is shared by every conversion through an `Arc`, and documents
//! are opened on `spawn_blocking` threads. pdfium-render's `thread_safe`
//! feature serialises calls into the C library, and its `sync` feature adds
//! the `Send + Sync` impls on `Pdfium` that [`RenderBackend`] requires.

use super::loader::BackendLoader;
use super::{BackendDocument, PageSize, RenderBackend};
use crate::config::RenderQuality;
use crate::error::{BackendError, ConfigError, LoadError};
use crate::pipeline::render::Surface;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Where the pdfium shared library is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryLocation {
    /// An explicit library file.
    File(PathBuf),
    /// A directory containing the platform library under its usual name.
    Directory(PathBuf),
    /// The operating system's library search path.
    System,
}

impl LibraryLocation {
    /// Resolve the location from `PDFIUM_LIB_PATH`, falling back to
    /// [`LibraryLocation::System`].
    pub fn from_env() -> Self {
        match std::env::var_os("PDFIUM_LIB_PATH") {
            Some(raw) if !raw.is_empty() => Self::from_path(PathBuf::from(raw)),
            _ => LibraryLocation::System,
        }
    }

    /// Treat `path` as a directory if it is one, otherwise as a library file.
    pub fn from_path(path: PathBuf) -> Self {
        if path.is_dir() {
            LibraryLocation::Directory(path)
        } else {
            LibraryLocation::File(path)
        }
    }
}

impl fmt::Display for LibraryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryLocation::File(p) => write!(f, "{}", p.display()),
            LibraryLocation::Directory(d) => write!(f, "{} (directory)", d.display()),
            LibraryLocation::System => f.write_str("system library path"),
        }
    }
}

static LIBRARY_LOCATION: OnceLock<LibraryLocation> = OnceLock::new();

/// Fix the pdfium library location for this process.
///
/// Succeeds the first time, and when repeating the location already in
/// effect. Fails once a different location has been configured or used.
pub fn configure_library(location: LibraryLocation) -> Result<(), ConfigError> {
    let current = LIBRARY_LOCATION.get_or_init(|| location.clone());
    if *current == location {
        Ok(())
    } else {
        Err(ConfigError::LibraryAlreadyConfigured {
            current: current.to_string(),
        })
    }
}

/// The library location in effect, resolving it from the environment if
/// nothing was configured.
pub fn library_location() -> &'static LibraryLocation {
    LIBRARY_LOCATION.get_or_init(LibraryLocation::from_env)
}

/// The process-wide loader for the pdfium backend.
///
/// Binding runs on a blocking thread; the first caller triggers it and every
/// concurrent caller waits for the same bind.
pub fn pdfium_loader() -> Arc<BackendLoader<PdfiumBackend>> {
    static LOADER: OnceLock<Arc<BackendLoader<PdfiumBackend>>> = OnceLock::new();
    Arc::clone(LOADER.get_or_init(|| {
        Arc::new(BackendLoader::new(|| async {
            let location = library_location().clone();
            tokio::task::spawn_blocking(move || PdfiumBackend::bind(&location))
                .await
                .map_err(|e| LoadError::new(format!("pdfium bind task failed: {e}")))?
        }))
    }))
}

/// pdfium, bound and ready to parse documents.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind the pdfium library at `location`.
    pub fn bind(location: &LibraryLocation) -> Result<Self, LoadError> {
        let bindings = match location {
            LibraryLocation::File(path) => Pdfium::bind_to_library(path),
            LibraryLocation::Directory(dir) => {
                Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            LibraryLocation::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            LoadError::new(format!(
                "cannot bind pdfium from {location}: {e}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium on the library path."
            ))
        })?;

        info!("Bound pdfium from {}", location);
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl RenderBackend for PdfiumBackend {
    type Document<'a>
        = PdfiumDocument<'a>
    where
        Self: 'a;

    fn name(&self) -> &str {
        "pdfium"
    }

    fn open_document<'a>(&'a self, bytes: &'a [u8]) -> Result<PdfiumDocument<'a>, BackendError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| match e {
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                    BackendError::new("document is password-protected")
                }
                other => BackendError::new(format!("{other:?}")),
            })?;
        Ok(PdfiumDocument { document })
    }
}

/// A document opened by pdfium.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, BackendError> {
        let page_index = u16::try_from(index)
            .map_err(|_| BackendError::new(format!("page index {index} out of range")))?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|e| BackendError::new(format!("page {}: {e:?}", index + 1)))
    }
}

impl BackendDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, BackendError> {
        let page = self.page(index)?;
        Ok(PageSize::new(page.width().value, page.height().value))
    }

    fn paint_page(
        &self,
        index: usize,
        surface: &mut Surface,
        quality: RenderQuality,
    ) -> Result<(), BackendError> {
        let page = self.page(index)?;
        let smoothing = quality.smoothing();

        let render_config = PdfRenderConfig::new()
            .set_target_width(surface.width() as i32)
            .set_target_height(surface.height() as i32)
            .render_form_data(true)
            .use_print_quality(quality.print_quality())
            .set_text_smoothing(smoothing)
            .set_image_smoothing(smoothing)
            .set_path_smoothing(smoothing);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| BackendError::new(format!("{e:?}")))?;

        let image = bitmap.as_image().into_rgba8();
        debug!(
            "pdfium painted page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        surface.draw(&image);
        Ok(())
    }
}
