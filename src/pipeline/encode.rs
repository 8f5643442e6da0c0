//! Surface encoding: painted pixels → PNG bytes, file name and image reference.
//!
//! PNG is lossless, so text edges in the preview stay as crisp as the
//! rasteriser drew them. Compression is set to the best level with adaptive
//! filtering: a preview is encoded once and displayed or saved many times.

use crate::error::ConvertError;
use crate::object_url::ObjectUrlRegistry;
use crate::output::{ConvertedImage, PngFile, PNG_MEDIA_TYPE};
use crate::pipeline::render::Surface;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Name used when the input was declared without one.
pub const FALLBACK_NAME: &str = "document.png";

/// Derive the output name from the input's declared name.
///
/// Only the last path component is kept, with `/` and `\` both treated as
/// separators. A trailing `.pdf` (any case) then becomes `.png`; any other
/// name gets `.png` appended. Blank names and `.`/`..` fall back to
/// [`FALLBACK_NAME`].
pub fn output_file_name(declared: &str) -> String {
    let base = declared.rsplit(['/', '\\']).next().unwrap_or(declared);
    if base.trim().is_empty() || base == "." || base == ".." {
        return FALLBACK_NAME.to_string();
    }
    if PDF_SUFFIX.is_match(base) {
        PDF_SUFFIX.replace(base, ".png").into_owned()
    } else {
        format!("{base}.png")
    }
}

/// Encode `surface` as PNG.
///
/// # Errors
/// [`ConvertError::Encoding`] if the encoder fails or produces no bytes.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>, ConvertError> {
    let pixels = surface.pixels();
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ConvertError::encoding(format!("PNG encoder: {e}")))?;

    if buf.is_empty() {
        return Err(ConvertError::encoding("PNG encoder produced no data"));
    }
    debug!(
        "Encoded {}x{} surface → {} bytes PNG",
        pixels.width(),
        pixels.height(),
        buf.len()
    );
    Ok(buf)
}

/// Encode `surface`, name the file after `base_name` and register an image
/// reference for it in `registry`.
pub fn encode_surface(
    surface: &Surface,
    base_name: &str,
    registry: &ObjectUrlRegistry,
) -> Result<ConvertedImage, ConvertError> {
    let bytes: Arc<[u8]> = encode_png(surface)?.into();
    let file = PngFile {
        name: output_file_name(base_name),
        bytes,
    };
    let image_url = registry.create(Arc::clone(&file.bytes), PNG_MEDIA_TYPE);
    Ok(ConvertedImage { image_url, file })
}
