//! High-pass extraction and contrast/brightness adjustment.
//!
//! The high-pass signal is the source minus its low-pass version, kept
//! as signed `f32` so negative detail survives until the adjustment
//! step. The adjustment scales by contrast, adds brightness, rounds to
//! the nearest integer, and saturates into `0..=255`.

use serde::{Deserialize, Serialize};

use crate::types::Plane;

/// Subtract the low-pass plane from the source plane.
#[must_use = "returns the high-pass plane"]
pub fn high_pass(source: &Plane, low_pass: &Plane) -> Plane {
    source.zip_with(low_pass, |s, l| s - l)
}

/// Scale, offset, and saturate a single high-pass value.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn adjust_value(high_pass: f32, contrast: f32, brightness: f32) -> u8 {
    high_pass
        .mul_add(contrast, brightness)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Counts of values that hit either end of the 8-bit range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saturation {
    /// Values whose raw adjusted result was below 0.
    pub clipped_low: u64,
    /// Values whose raw adjusted result was above 255.
    pub clipped_high: u64,
}

/// Apply contrast and brightness to every value of a high-pass plane.
///
/// Returns the saturated 8-bit values in row-major order along with how
/// many of them were clipped.
#[must_use = "returns the adjusted values"]
pub fn adjust(high_pass: &Plane, contrast: f32, brightness: f32) -> (Vec<u8>, Saturation) {
    let mut saturation = Saturation::default();
    let values = high_pass
        .as_slice()
        .iter()
        .map(|&v| {
            let raw = v.mul_add(contrast, brightness).round();
            if raw < 0.0 {
                saturation.clipped_low += 1;
            } else if raw > 255.0 {
                saturation.clipped_high += 1;
            }
            adjust_value(v, contrast, brightness)
        })
        .collect();
    (values, saturation)
}

/// Minimum, maximum, and mean absolute value of a high-pass plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighPassStats {
    /// Most negative detail value.
    pub min: f32,
    /// Most positive detail value.
    pub max: f32,
    /// Mean of `|value|` over the plane.
    pub mean_abs: f64,
}

/// Summarize a high-pass plane for diagnostics.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn stats(high_pass: &Plane) -> HighPassStats {
    let values = high_pass.as_slice();
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean_abs = if values.is_empty() {
        0.0
    } else {
        values.iter().map(|&v| f64::from(v.abs())).sum::<f64>() / values.len() as f64
    };
    HighPassStats {
        min: if values.is_empty() { 0.0 } else { min },
        max: if values.is_empty() { 0.0 } else { max },
        mean_abs,
    }
}
