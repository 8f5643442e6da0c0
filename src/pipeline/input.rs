//! Input documents: the raw byte buffer and the local-file byte provider.
//!
//! The pipeline never inspects the bytes before handing them to the backend:
//! whether they are a PDF is decided by the parse, not by magic bytes or a
//! declared media type.

use crate::error::FileError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The complete input file, shared read-only with the blocking render task.
#[derive(Clone, PartialEq, Eq)]
pub struct RawDocument(Arc<[u8]>);

impl RawDocument {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawDocument")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl From<Vec<u8>> for RawDocument {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for RawDocument {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<Arc<[u8]>> for RawDocument {
    fn from(bytes: Arc<[u8]>) -> Self {
        Self(bytes)
    }
}

/// A document read from disk together with the name it was declared under.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub document: RawDocument,
}

/// Read a local file in full.
///
/// The declared name is the file name component of `path`, which is what the
/// output PNG name is derived from.
pub async fn read_document(path: impl AsRef<Path>) -> Result<SourceDocument, FileError> {
    let path = path.as_ref().to_path_buf();

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FileError::FileNotFound { path: path.clone() },
        std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied { path: path.clone() },
        _ => FileError::ReadFailed {
            path: path.clone(),
            source: e,
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(SourceDocument {
        name,
        document: RawDocument::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn raw_document_conversions_share_contents() {
        let a = RawDocument::from(vec![1u8, 2, 3]);
        let b = RawDocument::from(&[1u8, 2, 3][..]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(!a.is_empty());
        assert!(RawDocument::from(Vec::new()).is_empty());
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let doc = RawDocument::from(vec![0u8; 4096]);
        assert_eq!(format!("{doc:?}"), "RawDocument(4096 bytes)");
    }

    #[tokio::test]
    async fn read_document_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("résumé.PDF");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let source = read_document(&path).await.unwrap();
        assert_eq!(source.name, "résumé.PDF");
        assert_eq!(source.document.as_bytes(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn read_missing_file() {
        let err = read_document("/definitely/not/a/real/file.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::FileNotFound { .. }));
        assert_eq!(err.kind(), FailureKind::Io);
    }
}
