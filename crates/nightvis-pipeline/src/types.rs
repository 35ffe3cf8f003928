//! Shared types for the nightvis transform pipeline.
//!
//! Rasters are stored row-major with interleaved channels, one `u8` per
//! channel. [`SourceImage`] can only be built through validating
//! constructors, so every instance the pipeline sees is rectangular,
//! non-empty, and has a consistent channel count.

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

/// Maximum number of interleaved channels per pixel.
pub const MAX_CHANNELS: u8 = 4;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Number of bytes a `width x height x channels` raster occupies, or
/// `None` if the product does not fit in `usize`.
fn raster_len(width: u32, height: u32, channels: u8) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(usize::from(channels))
}

/// The immutable input image.
///
/// Loaded once per session and shared (typically behind an `Arc`) by
/// every render. Pixel data is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    dimensions: Dimensions,
    channels: u8,
    data: Vec<u8>,
}

impl SourceImage {
    /// Build a source image from a raw interleaved buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if either dimension is
    /// zero, `channels` is outside `1..=4`, or `data` does not hold
    /// exactly `width * height * channels` bytes.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
    ) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidImage(format!(
                "image has zero dimension ({width}x{height})"
            )));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(PipelineError::InvalidImage(format!(
                "unsupported channel count {channels} (expected 1..={MAX_CHANNELS})"
            )));
        }
        let expected = raster_len(width, height, channels).ok_or_else(|| {
            PipelineError::InvalidImage(format!("image too large ({width}x{height}x{channels})"))
        })?;
        if data.len() != expected {
            return Err(PipelineError::InvalidImage(format!(
                "buffer holds {} bytes, expected {expected} for {width}x{height}x{channels}",
                data.len(),
            )));
        }
        Ok(Self {
            dimensions: Dimensions { width, height },
            channels,
            data,
        })
    }

    /// Build a source image from nested rows of pixels.
    ///
    /// `rows[y][x]` is the channel vector of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if there are no rows, a
    /// row is empty, rows have different lengths, or pixels have
    /// different channel counts.
    pub fn from_rows(rows: &[Vec<Vec<u8>>]) -> Result<Self, PipelineError> {
        let first_row = rows
            .first()
            .ok_or_else(|| PipelineError::InvalidImage("image has no rows".to_string()))?;
        let width = first_row.len();
        let channels = first_row.first().map_or(0, Vec::len);

        let mut data = Vec::with_capacity(rows.len() * width * channels);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PipelineError::InvalidImage(format!(
                    "row {y} has {} pixels, expected {width}",
                    row.len(),
                )));
            }
            for (x, pixel) in row.iter().enumerate() {
                if pixel.len() != channels {
                    return Err(PipelineError::InvalidImage(format!(
                        "pixel ({x}, {y}) has {} channels, expected {channels}",
                        pixel.len(),
                    )));
                }
                data.extend_from_slice(pixel);
            }
        }

        let to_u32 = |n: usize, what: &str| {
            u32::try_from(n)
                .map_err(|_| PipelineError::InvalidImage(format!("image {what} {n} is too large")))
        };
        let channels = u8::try_from(channels).map_err(|_| {
            PipelineError::InvalidImage(format!("unsupported channel count {channels}"))
        })?;
        Self::from_raw(
            to_u32(width, "width")?,
            to_u32(rows.len(), "height")?,
            channels,
            data,
        )
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Number of interleaved channels per pixel.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.channels
    }

    /// The raw interleaved pixel buffer.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Channel values of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = usize::from(self.channels);
        let start = (y as usize * self.dimensions.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Iterate over the channel vectors of every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(usize::from(self.channels))
    }
}

/// A freshly rendered output frame.
///
/// Same dimensions and channel count as the [`SourceImage`] it was
/// rendered from. Every render allocates a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputImage {
    dimensions: Dimensions,
    channels: u8,
    data: Vec<u8>,
}

impl OutputImage {
    /// Assemble an output image from pipeline-produced data.
    pub(crate) fn new(dimensions: Dimensions, channels: u8, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            Some(data.len()),
            raster_len(dimensions.width, dimensions.height, channels),
        );
        Self {
            dimensions,
            channels,
            data,
        }
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Number of interleaved channels per pixel.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.channels
    }

    /// The raw interleaved pixel buffer.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image and return the raw interleaved buffer.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = usize::from(self.channels);
        let start = (y as usize * self.dimensions.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Iterate over the channel vectors of every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(usize::from(self.channels))
    }
}

/// Single-channel `f32` image buffer, the representation `imageproc`
/// filters operate on.
pub type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A single-channel floating-point raster.
///
/// Holds the intermediate signal between pipeline stages: the selected
/// source signal, its low-pass version, and the signed high-pass delta.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane(GrayF32Image);

impl Plane {
    /// Build a plane by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        Self(ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)])))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.0.get_pixel(x, y).0[0]
    }

    /// All values in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        self.0.as_raw()
    }

    /// The underlying image buffer.
    #[must_use]
    pub const fn as_image(&self) -> &GrayF32Image {
        &self.0
    }

    /// Combine two planes of equal size value by value.
    pub(crate) fn zip_with(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Self {
        debug_assert_eq!(self.0.dimensions(), other.0.dimensions());
        Self::from_fn(self.width(), self.height(), |x, y| {
            f(self.get(x, y), other.get(x, y))
        })
    }
}

impl From<GrayF32Image> for Plane {
    fn from(image: GrayF32Image) -> Self {
        Self(image)
    }
}

/// Errors that can occur while building a source image or rendering.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The source image is empty or structurally malformed.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A parameter lies outside its valid range and cannot be coerced.
    #[error("parameter `{name}` out of range: {value}")]
    ParameterOutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value, formatted for display.
        value: String,
    },

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),
}
