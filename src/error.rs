//! Error types for the pdf2png library.
//!
//! Errors are layered the same way the pipeline is:
//!
//! * [`BackendError`]: raised by a [`crate::backend::RenderBackend`]
//!   implementation. It carries no stage information; the pipeline stage that
//!   called the backend decides which [`ConvertError`] it becomes.
//!
//! * [`LoadError`]: the backend could not be initialised. It is `Clone`
//!   because every caller waiting on the same in-flight load receives it.
//!
//! * [`ConvertError`]: the stage-specific taxonomy used *inside* the
//!   pipeline. It never crosses the [`crate::Converter`] boundary: the facade
//!   collapses it into [`crate::ConversionResult::Failed`], keeping only the
//!   message and its [`FailureKind`].
//!
//! * [`ConfigError`] and [`FileError`]: configuration validation and the
//!   file-system collaborators used by `convert_file` / `convert_to_file`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// An error reported by a rendering backend.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The backend failed to initialise.
#[derive(Debug, Clone, Error)]
#[error("Failed to load rendering backend: {reason}")]
pub struct LoadError {
    reason: String,
}

impl LoadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Stages of a single conversion, in the order they are reached.
///
/// `Failed` is not a stage: any stage may end the conversion with a failure,
/// which is reported separately (see [`crate::progress::ConversionObserver`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Start,
    BackendReady,
    DocumentOpened,
    Rasterized,
    Encoded,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::BackendReady => "backend load",
            Stage::DocumentOpened => "document open",
            Stage::Rasterized => "rasterization",
            Stage::Encoded => "encoding",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Stage-specific failure inside the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The backend could not be initialised.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The bytes are not a well-formed document of a supported format.
    #[error("Failed to parse document: {detail}")]
    DocumentParse { detail: String },

    /// The document parsed but has no page to render.
    #[error("Page not found: the document contains no pages")]
    PageNotFound,

    /// The drawing surface could not be set up, or painting failed.
    #[error("Rasterization failed: {detail}")]
    Rasterization { detail: String },

    /// PNG serialisation failed or produced no data.
    #[error("Encoding failed: {detail}")]
    Encoding { detail: String },

    /// A caller-supplied deadline expired.
    #[error("Timed out after {secs}s during {stage}")]
    Timeout { stage: Stage, secs: u64 },

    /// A blocking task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::Load(_) => FailureKind::Load,
            ConvertError::DocumentParse { .. } => FailureKind::DocumentParse,
            ConvertError::PageNotFound => FailureKind::PageNotFound,
            ConvertError::Rasterization { .. } => FailureKind::Rasterization,
            ConvertError::Encoding { .. } => FailureKind::Encoding,
            ConvertError::Timeout { .. } => FailureKind::Timeout,
            ConvertError::Internal(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn parse(detail: impl fmt::Display) -> Self {
        ConvertError::DocumentParse {
            detail: detail.to_string(),
        }
    }

    pub(crate) fn raster(detail: impl fmt::Display) -> Self {
        ConvertError::Rasterization {
            detail: detail.to_string(),
        }
    }

    pub(crate) fn encoding(detail: impl fmt::Display) -> Self {
        ConvertError::Encoding {
            detail: detail.to_string(),
        }
    }
}

/// The kind of a failed conversion, kept for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Load,
    DocumentParse,
    PageNotFound,
    Rasterization,
    Encoding,
    Timeout,
    Internal,
    /// Reading the input or writing the output failed; nothing was converted.
    Io,
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The pdfium library location was already fixed for this process.
    #[error(
        "pdfium library location is already set to {current}; \
it can only be configured once, before the first conversion"
    )]
    LibraryAlreadyConfigured { current: String },
}

/// Errors from the file-system helpers around the core conversion.
#[derive(Debug, Error)]
pub enum FileError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other read failure.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output PNG file.
    #[error("Failed to write output file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The conversion itself failed.
    #[error("Conversion of '{name}' failed: {message}")]
    Conversion {
        name: String,
        kind: FailureKind,
        message: String,
    },
}

impl FileError {
    /// The failure kind to report for this error alongside conversion results.
    pub fn kind(&self) -> FailureKind {
        match self {
            FileError::Conversion { kind, .. } => *kind,
            _ => FailureKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_converts_and_keeps_reason() {
        let e: ConvertError = LoadError::new("libpdfium.so: cannot open shared object").into();
        assert_eq!(e.kind(), FailureKind::Load);
        assert!(e.to_string().contains("libpdfium.so"), "got: {e}");
    }

    #[test]
    fn page_not_found_is_distinct_from_parse() {
        let e = ConvertError::PageNotFound;
        assert_eq!(e.kind(), FailureKind::PageNotFound);
        assert!(e.to_string().contains("no pages"));
        assert_ne!(ConvertError::parse("bad xref").kind(), e.kind());
    }

    #[test]
    fn timeout_display_names_stage() {
        let e = ConvertError::Timeout {
            stage: Stage::Rasterized,
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert!(e.to_string().contains("rasterization"));
        assert_eq!(e.kind(), FailureKind::Timeout);
    }

    #[test]
    fn failure_kind_serialises_snake_case() {
        let json = serde_json::to_string(&FailureKind::PageNotFound).unwrap();
        assert_eq!(json, "\"page_not_found\"");
    }

    #[test]
    fn file_errors_are_io_unless_conversion_failed() {
        let missing = FileError::FileNotFound {
            path: PathBuf::from("missing.pdf"),
        };
        assert_eq!(missing.kind(), FailureKind::Io);

        let denied = FileError::PermissionDenied {
            path: PathBuf::from("locked.pdf"),
        };
        assert_eq!(denied.kind(), FailureKind::Io);

        let failed = FileError::Conversion {
            name: "a.pdf".into(),
            kind: FailureKind::PageNotFound,
            message: "no pages".into(),
        };
        assert_eq!(failed.kind(), FailureKind::PageNotFound);
    }

    #[test]
    fn already_configured_display() {
        let e = ConfigError::LibraryAlreadyConfigured {
            current: "/opt/pdfium/libpdfium.so".into(),
        };
        assert!(e.to_string().contains("/opt/pdfium"));
    }
}
