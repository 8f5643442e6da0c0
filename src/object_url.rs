//! Revocable, process-local references to encoded images.
//!
//! A successful conversion hands back an [`ImageUrl`] (`blob:pdf2png/…`)
//! that resolves to the PNG bytes for as long as it stays registered. The
//! registry keeps those bytes alive, so every reference that is no longer
//! displayed must be revoked:
//!
//! - call [`ObjectUrlRegistry::revoke`] directly, or
//! - wrap the reference in a [`ScopedImageUrl`], which revokes on drop, or
//! - keep the on-screen preview in a [`PreviewSlot`], which revokes the old
//!   reference whenever a new one replaces it.

use crate::output::ConversionResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const URL_PREFIX: &str = "blob:pdf2png/";

/// A revocable reference to in-memory image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ImageUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The bytes behind a live [`ImageUrl`].
#[derive(Debug, Clone)]
pub struct ObjectBlob {
    pub bytes: Arc<[u8]>,
    pub media_type: &'static str,
}

/// Registry of live references.
#[derive(Debug)]
pub struct ObjectUrlRegistry {
    entries: Mutex<HashMap<String, ObjectBlob>>,
    next_id: AtomicU64,
}

impl Default for ObjectUrlRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The registry shared by the whole process.
    pub fn global() -> Arc<ObjectUrlRegistry> {
        static GLOBAL: Lazy<Arc<ObjectUrlRegistry>> = Lazy::new(|| Arc::new(ObjectUrlRegistry::new()));
        Arc::clone(&GLOBAL)
    }

    /// Register `bytes` and return a fresh reference to them.
    pub fn create(&self, bytes: Arc<[u8]>, media_type: &'static str) -> ImageUrl {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("{URL_PREFIX}{:x}-{id:08x}", std::process::id());
        debug!("Created {} ({} bytes)", url, bytes.len());
        self.lock()
            .insert(url.clone(), ObjectBlob { bytes, media_type });
        ImageUrl(url)
    }

    /// The blob behind `url`, if it has not been revoked.
    pub fn resolve(&self, url: &str) -> Option<ObjectBlob> {
        self.lock().get(url).cloned()
    }

    /// Release `url`. Returns `false` if it was not live; revoking twice is
    /// harmless.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            debug!("Revoked {}", url);
        }
        removed
    }

    /// Number of references that are still live.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ObjectBlob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An [`ImageUrl`] that is revoked when dropped.
#[derive(Debug)]
pub struct ScopedImageUrl {
    url: Option<ImageUrl>,
    registry: Arc<ObjectUrlRegistry>,
}

impl ScopedImageUrl {
    pub fn new(url: ImageUrl, registry: Arc<ObjectUrlRegistry>) -> Self {
        Self {
            url: Some(url),
            registry,
        }
    }

    pub fn url(&self) -> &ImageUrl {
        self.url
            .as_ref()
            .unwrap_or_else(|| unreachable!("url is only taken by into_inner"))
    }

    /// Stop managing the reference and hand it back un-revoked.
    pub fn into_inner(mut self) -> ImageUrl {
        self.url
            .take()
            .unwrap_or_else(|| unreachable!("url is only taken by into_inner"))
    }
}

impl Drop for ScopedImageUrl {
    fn drop(&mut self) {
        if let Some(url) = self.url.take() {
            self.registry.revoke(url.as_str());
        }
    }
}

/// Holds the reference currently on display.
///
/// Showing a new image revokes the previous one; clearing or dropping the
/// slot revokes the current one.
#[derive(Debug)]
pub struct PreviewSlot {
    registry: Arc<ObjectUrlRegistry>,
    current: Option<ScopedImageUrl>,
}

impl PreviewSlot {
    pub fn new(registry: Arc<ObjectUrlRegistry>) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    /// Display `url`, releasing whatever was displayed before.
    pub fn show(&mut self, url: ImageUrl) -> &ImageUrl {
        let scoped = ScopedImageUrl::new(url, Arc::clone(&self.registry));
        self.current.insert(scoped).url()
    }

    /// Display the image of `result`, or nothing if it failed. The previous
    /// image is released either way.
    pub fn replace(&mut self, result: &ConversionResult) -> Option<&ImageUrl> {
        match result {
            ConversionResult::Converted(converted) => Some(self.show(converted.image_url.clone())),
            ConversionResult::Failed(_) => {
                self.clear();
                None
            }
        }
    }

    pub fn current(&self) -> Option<&ImageUrl> {
        self.current.as_ref().map(ScopedImageUrl::url)
    }

    /// Release the displayed reference, if any.
    pub fn clear(&mut self) {
        self.current = None;
    }
}
