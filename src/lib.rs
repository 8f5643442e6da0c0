//! # pdf2png
//!
//! Render the first page of a PDF into a PNG preview.
//!
//! Hand over the bytes of a document and the name it was uploaded under; get
//! back a revocable image reference plus a `image/png` file named after the
//! input (`report.pdf` → `report.png`). Failures never escape as panics or
//! `Err`: every call ends in a [`ConversionResult`] whose failure arm carries
//! a readable message.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + name
//!  │
//!  ├─ 1. Load    bind pdfium once per process (deduplicated, retryable)
//!  ├─ 2. Open    parse the document, take page 1        ┐ spawn_blocking
//!  ├─ 3. Render  viewport = page size × scale, paint    ┘
//!  ├─ 4. Encode  PNG bytes → file name + image reference
//!  └─ 5. Result  { imageUrl, file } or { error }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2png::{ConversionConfig, Converter, PreviewSlot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::pdfium(ConversionConfig::builder().scale(1.5).build()?);
//!     let bytes = std::fs::read("invoice.pdf")?;
//!
//!     let result = converter.convert(bytes, "invoice.pdf").await;
//!     if let Some(image) = result.into_converted() {
//!         // Keep the preview alive while it is shown; replacing or dropping
//!         // the slot releases the bytes.
//!         let mut preview = PreviewSlot::new(converter.registry().clone());
//!         preview.show(image.image_url);
//!         std::fs::write(&image.file.name, &image.file.bytes)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## pdfium
//!
//! The pdfium shared library is located once per process: via
//! [`configure_library`], else `PDFIUM_LIB_PATH`, else the system library
//! path. A failed bind is reported as a load failure and retried by the next
//! conversion.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2png` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2png = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod object_url;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::loader::{BackendLoader, LoaderPhase};
pub use backend::pdfium::{configure_library, LibraryLocation, PdfiumBackend};
pub use backend::{BackendDocument, PageSize, RenderBackend};
pub use config::{ConversionConfig, ConversionConfigBuilder, RenderQuality, SurfaceLimits};
pub use convert::{convert, convert_blocking, convert_file, convert_to_file, Converter};
pub use error::{
    BackendError, ConfigError, ConvertError, FailureKind, FileError, LoadError, Stage,
};
pub use object_url::{ImageUrl, ObjectUrlRegistry, PreviewSlot, ScopedImageUrl};
pub use output::{save_png, ConversionFailure, ConversionResult, ConvertedImage, PngFile};
pub use pipeline::input::RawDocument;
pub use pipeline::render::{Surface, Viewport};
pub use progress::{ConversionObserver, NoopObserver};
pub use stream::convert_many;
