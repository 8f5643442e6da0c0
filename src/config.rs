//! Configuration types for first-page PDF previews.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a
//! [`crate::Converter`] can be cloned across tasks and logged as a whole.

use crate::error::ConfigError;
use crate::progress::ConversionObserver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Scale used when none is configured: 2 device pixels per PDF point.
pub const DEFAULT_SCALE: f32 = 2.0;

/// Configuration for a first-page conversion.
///
/// # Example
/// ```rust
/// use pdf2png::{ConversionConfig, RenderQuality};
///
/// let config = ConversionConfig::builder()
///     .scale(1.5)
///     .quality(RenderQuality::Fast)
///     .render_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 1.5);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Device pixels per PDF point. Range: 0.1–8.0. Default: 2.0.
    ///
    /// A US-letter page (612 × 792 pt) renders at 1224 × 1584 px with the
    /// default, which keeps body text legible in a full-width preview.
    pub scale: f32,

    /// Rendering quality tier. Default: [`RenderQuality::High`].
    pub quality: RenderQuality,

    /// Upper bounds on the drawing surface.
    pub limits: SurfaceLimits,

    /// Deadline for loading the rendering backend, in seconds. Default: none.
    ///
    /// The first load may bind a shared library from disk; a wedged
    /// filesystem would otherwise stall every conversion waiting on it.
    pub load_timeout_secs: Option<u64>,

    /// Deadline for opening and rasterising the document, in seconds. Default: none.
    pub render_timeout_secs: Option<u64>,

    /// Receives stage transitions for every conversion.
    pub observer: Option<Arc<dyn ConversionObserver>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            quality: RenderQuality::default(),
            limits: SurfaceLimits::default(),
            load_timeout_secs: None,
            render_timeout_secs: None,
            observer: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("quality", &self.quality)
            .field("limits", &self.limits)
            .field("load_timeout_secs", &self.load_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "<dyn ConversionObserver>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_secs.map(Duration::from_secs)
    }

    pub(crate) fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn quality(mut self, quality: RenderQuality) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn limits(mut self, limits: SurfaceLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.load_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ConversionObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConfigError> {
        let c = &self.config;
        if !c.scale.is_finite() || !(0.1..=8.0).contains(&c.scale) {
            return Err(ConfigError::Invalid(format!(
                "scale must be 0.1–8.0, got {}",
                c.scale
            )));
        }
        if c.limits.max_side == 0 || c.limits.max_pixels == 0 {
            return Err(ConfigError::Invalid(
                "surface limits must be ≥ 1 pixel".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Quality tier passed to the backend's paint operation.
///
/// Previews are rendered once per uploaded document, so the default favours
/// fidelity over speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    /// No anti-aliasing, screen-quality rendering.
    Fast,
    /// Text, image and path smoothing with the print-quality tier. (default)
    #[default]
    High,
}

impl RenderQuality {
    pub fn smoothing(self) -> bool {
        matches!(self, RenderQuality::High)
    }

    pub fn print_quality(self) -> bool {
        matches!(self, RenderQuality::High)
    }
}

/// Largest drawing surface the rasterizer will allocate.
///
/// The defaults match the limits browsers place on a 2D canvas, so a preview
/// that renders here would also render in a web view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceLimits {
    /// Maximum width or height in pixels. Default: 16 384.
    pub max_side: u32,
    /// Maximum `width × height`. Default: 268 435 456 (16 384²).
    pub max_pixels: u64,
}

impl Default for SurfaceLimits {
    fn default() -> Self {
        Self {
            max_side: 16_384,
            max_pixels: 16_384 * 16_384,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.scale, 2.0);
        assert_eq!(c.quality, RenderQuality::High);
        assert!(c.load_timeout().is_none());
        assert!(c.render_timeout().is_none());
    }

    #[test]
    fn builder_rejects_bad_scale() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY, 9.0] {
            let err = ConversionConfig::builder().scale(scale).build();
            assert!(err.is_err(), "scale {scale} should be rejected");
        }
    }

    #[test]
    fn builder_sets_timeouts() {
        let c = ConversionConfig::builder()
            .load_timeout_secs(5)
            .render_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.load_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(c.render_timeout(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn quality_flags() {
        assert!(RenderQuality::High.smoothing());
        assert!(RenderQuality::High.print_quality());
        assert!(!RenderQuality::Fast.smoothing());
    }

    #[test]
    fn debug_hides_observer() {
        let c = ConversionConfig::builder()
            .observer(Arc::new(crate::progress::NoopObserver))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn ConversionObserver>"));
    }
}
