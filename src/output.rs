//! Conversion results and the PNG file they carry.
//!
//! Every conversion ends in exactly one [`ConversionResult`]. Serialised, both
//! arms share one shape so a UI can bind to it without matching:
//!
//! ```json
//! { "imageUrl": "blob:pdf2png/…", "file": { "name": "a.png", "type": "image/png", "size": 1234 } }
//! { "imageUrl": "", "file": null, "error": "Failed to parse document: …" }
//! ```

use crate::error::{FailureKind, FileError};
use crate::object_url::ImageUrl;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Media type of every file this crate produces.
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// An encoded PNG with the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl PngFile {
    pub fn media_type(&self) -> &'static str {
        PNG_MEDIA_TYPE
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// `data:image/png;base64,…`, for embedding where a registry reference
    /// cannot be resolved (HTML reports, JSON payloads).
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", PNG_MEDIA_TYPE, STANDARD.encode(&self.bytes))
    }
}

impl Serialize for PngFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PngFile", 3)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("type", PNG_MEDIA_TYPE)?;
        s.serialize_field("size", &self.size())?;
        s.end()
    }
}

/// A successful conversion.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    /// Revocable reference to `file.bytes`.
    pub image_url: ImageUrl,
    pub file: PngFile,
}

/// A failed conversion, reduced to what a user needs to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    pub error: String,
    pub kind: FailureKind,
}

/// Outcome of one conversion.
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Converted(ConvertedImage),
    Failed(ConversionFailure),
}

impl ConversionResult {
    pub(crate) fn failed(error: impl Into<String>, kind: FailureKind) -> Self {
        ConversionResult::Failed(ConversionFailure {
            error: error.into(),
            kind,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Converted(_))
    }

    /// The image reference, or `""` on failure.
    pub fn image_url(&self) -> &str {
        match self {
            ConversionResult::Converted(c) => c.image_url.as_str(),
            ConversionResult::Failed(_) => "",
        }
    }

    pub fn file(&self) -> Option<&PngFile> {
        match self {
            ConversionResult::Converted(c) => Some(&c.file),
            ConversionResult::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ConversionResult::Converted(_) => None,
            ConversionResult::Failed(f) => Some(&f.error),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ConversionResult::Converted(_) => None,
            ConversionResult::Failed(f) => Some(f.kind),
        }
    }

    pub fn into_converted(self) -> Option<ConvertedImage> {
        match self {
            ConversionResult::Converted(c) => Some(c),
            ConversionResult::Failed(_) => None,
        }
    }
}

impl Serialize for ConversionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConversionResult::Converted(c) => {
                let mut s = serializer.serialize_struct("ConversionResult", 2)?;
                s.serialize_field("imageUrl", &c.image_url)?;
                s.serialize_field("file", &c.file)?;
                s.end()
            }
            ConversionResult::Failed(f) => {
                let mut s = serializer.serialize_struct("ConversionResult", 3)?;
                s.serialize_field("imageUrl", "")?;
                s.serialize_field("file", &Option::<PngFile>::None)?;
                s.serialize_field("error", &f.error)?;
                s.end()
            }
        }
    }
}

// ── Saving ───────────────────────────────────────────────────────────────

/// Write `file` into `dir` under its own name.
///
/// The name must be a single plain file name; anything that would resolve
/// outside `dir` is refused with [`FileError::WriteFailed`]. The bytes go to
/// a temporary file in `dir` first and are renamed into place, so a reader
/// never observes a half-written PNG.
pub fn save_png(file: &PngFile, dir: &Path) -> Result<PathBuf, FileError> {
    let target = dir.join(&file.name);
    let write_failed = |source: std::io::Error| FileError::WriteFailed {
        path: target.clone(),
        source,
    };

    if !is_plain_file_name(&file.name) {
        return Err(write_failed(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{}' is not a plain file name", file.name),
        )));
    }

    std::fs::create_dir_all(dir).map_err(write_failed)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(&file.bytes).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(&target).map_err(|e| write_failed(e.error))?;

    debug!("Wrote {} ({} bytes)", target.display(), file.size());
    Ok(target)
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Async wrapper around [`save_png`].
pub async fn save_png_async(file: PngFile, dir: PathBuf) -> Result<PathBuf, FileError> {
    let target = dir.join(&file.name);
    tokio::task::spawn_blocking(move || save_png(&file, &dir))
        .await
        .map_err(|e| FileError::WriteFailed {
            path: target,
            source: std::io::Error::other(format!("write task panicked: {e}")),
        })?
}
