//! Render parameters and their coercion into effective values.
//!
//! A [`ParameterSet`] is what a controller edits. Before any pixel work,
//! the pipeline resolves it into [`EffectiveParameters`]: the kernel size
//! is forced odd and at least 1, the channel index is clamped into the
//! image's channel range, and values that cannot be coerced (a negative
//! kernel size, a negative or non-finite contrast) are rejected.

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Which signal of the source image drives the output channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSignal {
    /// The source channel at the selected index.
    #[default]
    Channel,
    /// Rec. 601 luminance of the color channels (the first three, or the
    /// single channel of a grayscale image).
    Luma,
}

impl std::fmt::Display for SourceSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::Luma => write!(f, "luma"),
        }
    }
}

/// User-adjustable render parameters.
///
/// Fields are public and unvalidated; [`ParameterSet::resolve`] is the
/// single place where they are coerced or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Gaussian kernel size in pixels. Even values round up to the next
    /// odd value; `0` and `1` disable the blur.
    pub blur_kernel_size: i32,

    /// Scale factor applied to the high-pass signal.
    pub contrast: f32,

    /// Offset added after contrast scaling.
    pub brightness: f32,

    /// Index of the channel that carries the output. Clamped into the
    /// image's channel range.
    pub channel: i32,

    /// Which signal of the source image is filtered.
    pub source_signal: SourceSignal,
}

impl ParameterSet {
    /// Default Gaussian kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: i32 = 3;
    /// Default contrast.
    pub const DEFAULT_CONTRAST: f32 = 1.0;
    /// Default brightness.
    pub const DEFAULT_BRIGHTNESS: f32 = 0.0;
    /// Default output channel (green in both RGB and BGR order).
    pub const DEFAULT_CHANNEL: i32 = 1;
    /// Largest kernel size the pipeline will build; larger requests are
    /// clamped down to it.
    pub const MAX_BLUR_KERNEL_SIZE: i32 = 99;

    /// Resolve these parameters against an image with `channels`
    /// channels.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ParameterOutOfRange`] if the kernel size
    /// is negative, the contrast is negative or not finite, or the
    /// brightness is not finite.
    pub fn resolve(&self, channels: u8) -> Result<EffectiveParameters, PipelineError> {
        let kernel_size = effective_kernel_size(self.blur_kernel_size)?;

        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(PipelineError::ParameterOutOfRange {
                name: "contrast",
                value: self.contrast.to_string(),
            });
        }
        if !self.brightness.is_finite() {
            return Err(PipelineError::ParameterOutOfRange {
                name: "brightness",
                value: self.brightness.to_string(),
            });
        }

        let channel = clamp_channel(self.channel, channels);
        if usize::try_from(self.channel).ok() != Some(channel) {
            tracing::trace!(
                requested = self.channel,
                channel,
                channels,
                "channel coerced into range"
            );
        }

        Ok(EffectiveParameters {
            kernel_size,
            sigma: kernel_sigma(kernel_size),
            contrast: self.contrast,
            brightness: self.brightness,
            channel,
            channels,
            source_signal: self.source_signal,
        })
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            contrast: Self::DEFAULT_CONTRAST,
            brightness: Self::DEFAULT_BRIGHTNESS,
            channel: Self::DEFAULT_CHANNEL,
            source_signal: SourceSignal::default(),
        }
    }
}

/// Parameters after coercion, ready for pixel work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveParameters {
    /// Odd kernel size, at least 1. A size of 1 is the identity blur.
    pub kernel_size: u32,
    /// Gaussian sigma derived from `kernel_size`.
    pub sigma: f32,
    /// Contrast, finite and non-negative.
    pub contrast: f32,
    /// Brightness, finite.
    pub brightness: f32,
    /// Output channel index, in `0..channels`.
    pub channel: usize,
    /// Channel count of the image these parameters were resolved against.
    pub channels: u8,
    /// Which signal of the source image is filtered.
    pub source_signal: SourceSignal,
}

/// Coerce a requested kernel size to the odd size actually used.
///
/// Computes `min(max(1, k | 1), 99)`: even sizes round up (`4 -> 5`),
/// `0` becomes `1`, and anything above
/// [`ParameterSet::MAX_BLUR_KERNEL_SIZE`] is clamped to it.
///
/// # Errors
///
/// Returns [`PipelineError::ParameterOutOfRange`] for negative sizes.
pub fn effective_kernel_size(requested: i32) -> Result<u32, PipelineError> {
    let Ok(k) = u32::try_from(requested) else {
        return Err(PipelineError::ParameterOutOfRange {
            name: "blur_kernel_size",
            value: requested.to_string(),
        });
    };
    let max = ParameterSet::MAX_BLUR_KERNEL_SIZE.unsigned_abs();
    let effective = (k | 1).clamp(1, max);
    if effective != k {
        tracing::trace!(requested, effective, "kernel size coerced");
    }
    Ok(effective)
}

/// Gaussian sigma for a given odd kernel size.
///
/// Uses the same relation OpenCV applies when sigma is left unspecified:
/// `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    let k = kernel_size as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Clamp a requested channel index into `0..channels`.
#[must_use]
pub fn clamp_channel(requested: i32, channels: u8) -> usize {
    let last = i32::from(channels.max(1)) - 1;
    // Non-negative after the clamp.
    #[allow(clippy::cast_sign_loss)]
    let channel = requested.clamp(0, last) as usize;
    channel
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let p = ParameterSet::default();
        assert_eq!(p.blur_kernel_size, 3);
        assert!((p.contrast - 1.0).abs() < f32::EPSILON);
        assert!(p.brightness.abs() < f32::EPSILON);
        assert_eq!(p.channel, 1);
        assert_eq!(p.source_signal, SourceSignal::Channel);
    }

    #[test]
    fn even_kernel_sizes_round_up() {
        assert_eq!(effective_kernel_size(4).unwrap(), 5);
        assert_eq!(effective_kernel_size(2).unwrap(), 3);
        assert_eq!(effective_kernel_size(98).unwrap(), 99);
    }

    #[test]
    fn odd_kernel_sizes_are_unchanged() {
        for k in [1, 3, 5, 15, 99] {
            assert_eq!(effective_kernel_size(k).unwrap(), k.unsigned_abs());
        }
    }

    #[test]
    fn zero_kernel_size_is_identity() {
        assert_eq!(effective_kernel_size(0).unwrap(), 1);
    }

    #[test]
    fn oversized_kernel_is_clamped_to_max() {
        assert_eq!(effective_kernel_size(100).unwrap(), 99);
        assert_eq!(effective_kernel_size(101).unwrap(), 99);
        assert_eq!(effective_kernel_size(i32::MAX).unwrap(), 99);
    }

    #[test]
    fn negative_kernel_size_is_rejected() {
        let err = effective_kernel_size(-3).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ParameterOutOfRange {
                name: "blur_kernel_size",
                ..
            }
        ));
    }

    #[test]
    fn sigma_follows_kernel_size() {
        assert!((kernel_sigma(3) - 0.8).abs() < 1e-6);
        assert!((kernel_sigma(5) - 1.1).abs() < 1e-6);
        assert!((kernel_sigma(15) - 2.6).abs() < 1e-5);
    }

    #[test]
    fn channel_clamps_to_bounds() {
        assert_eq!(clamp_channel(-1, 3), 0);
        assert_eq!(clamp_channel(3, 3), 2);
        assert_eq!(clamp_channel(1, 3), 1);
        assert_eq!(clamp_channel(7, 1), 0);
    }

    #[test]
    fn resolve_rejects_negative_contrast() {
        let p = ParameterSet {
            contrast: -0.5,
            ..ParameterSet::default()
        };
        assert!(matches!(
            p.resolve(3),
            Err(PipelineError::ParameterOutOfRange {
                name: "contrast",
                ..
            })
        ));
    }

    #[test]
    fn resolve_rejects_non_finite_brightness() {
        let p = ParameterSet {
            brightness: f32::NAN,
            ..ParameterSet::default()
        };
        assert!(matches!(
            p.resolve(3),
            Err(PipelineError::ParameterOutOfRange {
                name: "brightness",
                ..
            })
        ));
    }

    #[test]
    fn resolve_coerces_kernel_and_channel() {
        let p = ParameterSet {
            blur_kernel_size: 6,
            channel: 9,
            ..ParameterSet::default()
        };
        let eff = p.resolve(3).unwrap();
        assert_eq!(eff.kernel_size, 7);
        assert_eq!(eff.channel, 2);
        assert_eq!(eff.channels, 3);
    }

    #[test]
    fn serde_fills_missing_fields_with_defaults() {
        let p: ParameterSet = serde_json::from_str(r#"{"contrast": 4.0}"#).unwrap();
        assert!((p.contrast - 4.0).abs() < f32::EPSILON);
        assert_eq!(p.blur_kernel_size, ParameterSet::DEFAULT_BLUR_KERNEL_SIZE);
        assert_eq!(p.channel, ParameterSet::DEFAULT_CHANNEL);
    }

    #[test]
    fn serde_round_trip() {
        let p = ParameterSet {
            blur_kernel_size: 11,
            contrast: 4.0,
            brightness: 10.0,
            channel: 2,
            source_signal: SourceSignal::Luma,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: ParameterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
