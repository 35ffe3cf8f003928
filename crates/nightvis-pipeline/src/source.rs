//! Image decoding into a [`SourceImage`].
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! immutable source image the pipeline renders from. Decoding happens
//! once, before the first render; failures surface here and never
//! reach the pipeline.

use image::DynamicImage;

use crate::types::{PipelineError, SourceImage};

/// Decode raw image bytes into a three-channel RGB source image.
///
/// Grayscale inputs are expanded to RGB and any alpha channel is
/// dropped, so channel indices `0`, `1`, `2` always mean red, green,
/// blue.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if `bytes` is empty or the
/// decoded image has a zero dimension. Returns
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<SourceImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::InvalidImage(
            "input image data is empty".to_string(),
        ));
    }

    let image = image::load_from_memory(bytes).map_err(PipelineError::ImageDecode)?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        bytes = bytes.len(),
        "decoded source image"
    );
    from_dynamic(&image)
}

/// Convert an already-decoded image into a three-channel RGB source
/// image.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if the image has a zero
/// dimension.
pub fn from_dynamic(image: &DynamicImage) -> Result<SourceImage, PipelineError> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    SourceImage::from_raw(width, height, 3, rgb.into_raw())
}
