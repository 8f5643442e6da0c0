//! The conversion facade: one document in, one [`ConversionResult`] out.
//!
//! A [`Converter`] sequences the pipeline for a single call:
//!
//! ```text
//! Start ─▶ BackendReady ─▶ DocumentOpened ─▶ Rasterized ─▶ Encoded ─▶ Done
//!   └────────────┴──────────────┴──────────────┴────────────┴──▶ Failed
//! ```
//!
//! Every error on the way, including a panicking blocking task or an expired
//! deadline, is caught here and returned as [`ConversionResult::Failed`]. The
//! facade itself never returns `Err` and never retries.

use crate::backend::loader::BackendLoader;
use crate::backend::pdfium::{pdfium_loader, PdfiumBackend};
use crate::backend::RenderBackend;
use crate::config::ConversionConfig;
use crate::error::{ConvertError, FailureKind, FileError, Stage};
use crate::object_url::ObjectUrlRegistry;
use crate::output::{save_png_async, ConversionResult, ConvertedImage};
use crate::pipeline::input::{read_document, RawDocument};
use crate::pipeline::{encode, open, render};
use crate::progress::ConversionObserver;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts first pages to PNG with a shared backend and image registry.
///
/// Cheap to clone; clones share the backend loader, the registry and the
/// configuration.
pub struct Converter<B: RenderBackend = PdfiumBackend> {
    loader: Arc<BackendLoader<B>>,
    registry: Arc<ObjectUrlRegistry>,
    config: Arc<ConversionConfig>,
}

impl<B: RenderBackend> Clone for Converter<B> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: RenderBackend> fmt::Debug for Converter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("loader", &self.loader)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Converter<PdfiumBackend> {
    /// A converter backed by the process-wide pdfium loader and the global
    /// image registry.
    pub fn pdfium(config: ConversionConfig) -> Self {
        Self::new(pdfium_loader(), config)
    }
}

impl Default for Converter<PdfiumBackend> {
    fn default() -> Self {
        Self::pdfium(ConversionConfig::default())
    }
}

impl<B: RenderBackend> Converter<B> {
    /// A converter that loads its backend through `loader` and registers
    /// images in [`ObjectUrlRegistry::global`].
    pub fn new(loader: Arc<BackendLoader<B>>, config: ConversionConfig) -> Self {
        Self {
            loader,
            registry: ObjectUrlRegistry::global(),
            config: Arc::new(config),
        }
    }

    /// Register images in `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<ObjectUrlRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<BackendLoader<B>> {
        &self.loader
    }

    /// Render the first page of `document` at the configured scale.
    ///
    /// `name` is the name the document was declared under; it only feeds
    /// the output file name and log lines.
    pub async fn convert(&self, document: impl Into<RawDocument>, name: &str) -> ConversionResult {
        self.convert_at_scale(document, name, self.config.scale).await
    }

    /// Like [`Converter::convert`], overriding the configured scale.
    pub async fn convert_at_scale(
        &self,
        document: impl Into<RawDocument>,
        name: &str,
        scale: f32,
    ) -> ConversionResult {
        let document = document.into();
        let started = Instant::now();
        info!(
            "Converting '{}' ({} bytes) at scale {}",
            name,
            document.len(),
            scale
        );
        self.notify(name, Stage::Start);

        match self.try_convert(document, name, scale).await {
            Ok(converted) => {
                self.notify(name, Stage::Done);
                info!(
                    "Converted '{}' → {} ({} bytes) in {}ms",
                    name,
                    converted.file.name,
                    converted.file.size(),
                    started.elapsed().as_millis()
                );
                ConversionResult::Converted(converted)
            }
            Err(e) => {
                let kind = e.kind();
                let message = e.to_string();
                warn!("Conversion of '{}' failed ({:?}): {}", name, kind, message);
                if let Some(observer) = &self.config.observer {
                    observer.on_failed(name, kind, &message);
                }
                ConversionResult::failed(message, kind)
            }
        }
    }

    async fn try_convert(
        &self,
        document: RawDocument,
        name: &str,
        scale: f32,
    ) -> Result<ConvertedImage, ConvertError> {
        // ── Backend ──────────────────────────────────────────────────────
        let ready = self.loader.ensure_ready();
        let backend = match self.config.load_timeout() {
            Some(limit) => tokio::time::timeout(limit, ready).await.map_err(|_| {
                ConvertError::Timeout {
                    stage: Stage::BackendReady,
                    secs: limit.as_secs(),
                }
            })??,
            None => ready.await?,
        };
        self.notify(name, Stage::BackendReady);

        // ── Open + rasterise ─────────────────────────────────────────────
        let observer = self.config.observer.clone();
        let task_name = name.to_string();
        let quality = self.config.quality;
        let limits = self.config.limits;
        let raster = tokio::task::spawn_blocking(move || {
            let page = open::open_first_page(&*backend, &document)?;
            notify(observer.as_deref(), &task_name, Stage::DocumentOpened);
            let surface = render::render_page(&page, scale, quality, &limits)?;
            notify(observer.as_deref(), &task_name, Stage::Rasterized);
            Ok::<_, ConvertError>(surface)
        });
        let joined = match self.config.render_timeout() {
            Some(limit) => tokio::time::timeout(limit, raster).await.map_err(|_| {
                ConvertError::Timeout {
                    stage: Stage::Rasterized,
                    secs: limit.as_secs(),
                }
            })?,
            None => raster.await,
        };
        let surface = joined
            .map_err(|e| ConvertError::Internal(format!("render task panicked: {}", e)))??;

        // ── Encode ───────────────────────────────────────────────────────
        let registry = Arc::clone(&self.registry);
        let base_name = name.to_string();
        let converted = tokio::task::spawn_blocking(move || {
            encode::encode_surface(&surface, &base_name, &registry)
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("encode task panicked: {}", e)))??;
        self.notify(name, Stage::Encoded);

        debug!("'{}' registered as {}", name, converted.image_url);
        Ok(converted)
    }

    fn notify(&self, name: &str, stage: Stage) {
        notify(self.config.observer.as_deref(), name, stage);
    }
}

fn notify(observer: Option<&dyn ConversionObserver>, name: &str, stage: Stage) {
    debug!("'{}' reached {}", name, stage);
    if let Some(observer) = observer {
        observer.on_stage(name, stage);
    }
}

// ── Convenience entry points ─────────────────────────────────────────────

/// Convert with the process-wide pdfium backend, the global registry and the
/// default configuration.
///
/// # Example
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// let bytes = std::fs::read("report.pdf").unwrap();
/// let result = pdf2png::convert(bytes, "report.pdf").await;
/// match result.file() {
///     Some(file) => println!("{} ({} bytes) at {}", file.name, file.size(), result.image_url()),
///     None => eprintln!("{}", result.error().unwrap_or_default()),
/// }
/// # }
/// ```
pub async fn convert(document: impl Into<RawDocument>, name: &str) -> ConversionResult {
    Converter::<PdfiumBackend>::default()
        .convert(document, name)
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally; do not call it from inside
/// an async context.
pub fn convert_blocking(document: impl Into<RawDocument>, name: &str) -> ConversionResult {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(convert(document, name)),
        Err(e) => ConversionResult::failed(
            ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)).to_string(),
            FailureKind::Internal,
        ),
    }
}

/// Read `path` and convert it under its file name.
///
/// # Errors
/// Only file-system failures are errors; a failed conversion is returned as
/// [`ConversionResult::Failed`].
pub async fn convert_file<B: RenderBackend>(
    path: impl AsRef<Path>,
    converter: &Converter<B>,
) -> Result<ConversionResult, FileError> {
    let source = read_document(path).await?;
    Ok(converter.convert(source.document, &source.name).await)
}

/// Convert `path` and save the PNG into `out_dir`, returning the written path.
///
/// The image reference is released once the file is on disk.
pub async fn convert_to_file<B: RenderBackend>(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    converter: &Converter<B>,
) -> Result<PathBuf, FileError> {
    let source = read_document(path).await?;
    let result = converter.convert(source.document, &source.name).await;

    let converted = match result {
        ConversionResult::Converted(converted) => converted,
        ConversionResult::Failed(failure) => {
            return Err(FileError::Conversion {
                name: source.name,
                kind: failure.kind,
                message: failure.error,
            })
        }
    };

    let saved = save_png_async(converted.file, out_dir.as_ref().to_path_buf()).await;
    converter.registry().revoke(converted.image_url.as_str());
    saved
}
