//! Signal selection and single-channel output mapping.
//!
//! Only one signal reaches the output: the selected source channel (or
//! the luminance plane). [`extract_signal`] pulls that signal out of the
//! interleaved source as a float plane, and [`map_to_channel`] writes the
//! adjusted values back into the selected channel of a zeroed frame.
//!
//! The mapping policy is a single-channel tint: the selected channel
//! carries the adjusted intensity and every other channel is `0`. With
//! the default channel `1` on an RGB source this gives the green
//! night-vision look.

use crate::params::{EffectiveParameters, SourceSignal};
use crate::types::{Dimensions, OutputImage, Plane, SourceImage};

/// Rec. 601 luminance weights for R, G, B.
const LUMA_REC601: [f32; 3] = [0.299, 0.587, 0.114];

/// Extract the signal that drives the output as a float plane.
#[must_use = "returns the extracted signal plane"]
pub fn extract_signal(source: &SourceImage, params: &EffectiveParameters) -> Plane {
    let (w, h) = (source.width(), source.height());
    match params.source_signal {
        SourceSignal::Channel => {
            let c = params.channel;
            Plane::from_fn(w, h, |x, y| f32::from(source.pixel(x, y)[c]))
        }
        SourceSignal::Luma if source.channels() >= 3 => Plane::from_fn(w, h, |x, y| {
            let p = source.pixel(x, y);
            LUMA_REC601[2].mul_add(
                f32::from(p[2]),
                LUMA_REC601[0].mul_add(f32::from(p[0]), LUMA_REC601[1] * f32::from(p[1])),
            )
        }),
        SourceSignal::Luma => Plane::from_fn(w, h, |x, y| f32::from(source.pixel(x, y)[0])),
    }
}

/// Build the output frame: `values` in the selected channel, zeros
/// elsewhere.
///
/// `values` holds one adjusted value per pixel in row-major order.
#[must_use = "returns the output image"]
pub fn map_to_channel(
    values: &[u8],
    dimensions: Dimensions,
    params: &EffectiveParameters,
) -> OutputImage {
    let channels = usize::from(params.channels);
    let mut data = vec![0u8; values.len() * channels];
    for (pixel, &value) in data.chunks_exact_mut(channels).zip(values) {
        pixel[params.channel] = value;
    }
    OutputImage::new(dimensions, params.channels, data)
}
