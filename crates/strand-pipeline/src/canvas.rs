//! Image decoding and canvas fitting.
//!
//! The filter chain expects a square `canvas_size x canvas_size` RGBA
//! bitmap. Arbitrary input images are decoded from bytes (PNG, JPEG, BMP,
//! WebP) and stretched onto that canvas. Aspect ratio is not preserved.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::types::{PipelineError, RgbaImage};

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Stretch an image onto a square canvas.
///
/// Images already at the target size are converted without resampling.
#[must_use = "returns the fitted bitmap"]
pub fn fit_to_canvas(img: &DynamicImage, canvas_size: u32) -> RgbaImage {
    if img.width() == canvas_size && img.height() == canvas_size {
        return img.to_rgba8();
    }
    img.resize_exact(canvas_size, canvas_size, FilterType::Triangle)
        .to_rgba8()
}

/// [`decode`] followed by [`fit_to_canvas`].
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_to_canvas(bytes: &[u8], canvas_size: u32) -> Result<RgbaImage, PipelineError> {
    let img = decode(bytes)?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        canvas_size,
        "decoded input image"
    );
    Ok(fit_to_canvas(&img, canvas_size))
}
