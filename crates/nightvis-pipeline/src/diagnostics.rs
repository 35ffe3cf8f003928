//! Render diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter experimentation. [`render_with_diagnostics`] drives the
//! staged [`Pipeline`](crate::Pipeline) and times every step.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::params::ParameterSet;
use crate::pipeline::{Pipeline, StagedResult};
use crate::types::{PipelineError, SourceImage};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDiagnostics {
    /// Stage 1: parameter coercion and signal extraction.
    pub resolve: StageDiagnostics,
    /// Stage 2: Gaussian low-pass.
    pub low_pass: StageDiagnostics,
    /// Stage 3: high-pass extraction.
    pub high_pass: StageDiagnostics,
    /// Stage 4: contrast/brightness adjustment.
    pub adjust: StageDiagnostics,
    /// Stage 5: channel mapping.
    pub channel_map: StageDiagnostics,
    /// Total wall-clock duration of the render (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: RenderSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Parameter coercion.
    Resolve {
        /// Kernel size as requested.
        requested_kernel_size: i32,
        /// Kernel size after odd coercion.
        kernel_size: u32,
        /// Channel as requested.
        requested_channel: i32,
        /// Channel after clamping.
        channel: usize,
        /// Channel count of the source image.
        channels: u8,
        /// Which signal was extracted.
        source_signal: String,
    },
    /// Gaussian blur.
    LowPass {
        /// Kernel size used.
        kernel_size: u32,
        /// Sigma derived from the kernel size.
        sigma: f32,
        /// Whether the blur was the identity (kernel size 1).
        identity: bool,
    },
    /// High-pass extraction.
    HighPass {
        /// Most negative detail value.
        min: f32,
        /// Most positive detail value.
        max: f32,
        /// Mean absolute detail value.
        mean_abs: f64,
    },
    /// Contrast/brightness adjustment.
    Adjust {
        /// Contrast applied.
        contrast: f32,
        /// Brightness applied.
        brightness: f32,
        /// Values clipped at 0.
        clipped_low: u64,
        /// Values clipped at 255.
        clipped_high: u64,
    },
    /// Channel mapping.
    ChannelMap {
        /// Output channel carrying the signal.
        channel: usize,
        /// Output channel count.
        channels: u8,
    },
}

/// High-level summary for the entire render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Total values clipped at either end of the range.
    pub clipped_total: u64,
}

/// Run the staged pipeline, timing every stage.
///
/// # Errors
///
/// Returns [`PipelineError::ParameterOutOfRange`] if a parameter cannot
/// be coerced.
pub fn render_with_diagnostics(
    source: &SourceImage,
    params: &ParameterSet,
) -> Result<(StagedResult, RenderDiagnostics), PipelineError> {
    let start = Instant::now();

    let t = Instant::now();
    let resolved = Pipeline::new(source, params).resolve()?;
    let resolve = StageDiagnostics {
        duration: t.elapsed(),
        metrics: resolved.metrics(),
    };

    let t = Instant::now();
    let low = resolved.low_pass();
    let low_pass = StageDiagnostics {
        duration: t.elapsed(),
        metrics: low.metrics(),
    };

    let t = Instant::now();
    let high = low.high_pass();
    let high_pass = StageDiagnostics {
        duration: t.elapsed(),
        metrics: high.metrics(),
    };

    let t = Instant::now();
    let adjusted = high.adjust();
    let adjust = StageDiagnostics {
        duration: t.elapsed(),
        metrics: adjusted.metrics(),
    };

    let t = Instant::now();
    let mapped = adjusted.map_channel();
    let channel_map = StageDiagnostics {
        duration: t.elapsed(),
        metrics: mapped.metrics(),
    };

    let staged = mapped.into_result();
    let dimensions = staged.output.dimensions();
    let diagnostics = RenderDiagnostics {
        resolve,
        low_pass,
        high_pass,
        adjust,
        channel_map,
        total_duration: start.elapsed(),
        summary: RenderSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            clipped_total: staged.saturation.clipped_low + staged.saturation.clipped_high,
        },
    };
    Ok((staged, diagnostics))
}

impl RenderDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Render Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!("Clipped values: {}", self.summary.clipped_total));

        lines.join("\n")
    }

    /// Every stage with its display name, in pipeline order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Resolve", &self.resolve),
            ("Low-pass", &self.low_pass),
            ("High-pass", &self.high_pass),
            ("Adjust", &self.adjust),
            ("Channel map", &self.channel_map),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Resolve {
            requested_kernel_size,
            kernel_size,
            requested_channel,
            channel,
            channels,
            source_signal,
        } => format!(
            "k={requested_kernel_size}->{kernel_size} ch={requested_channel}->{channel}/{channels} signal={source_signal}",
        ),
        StageMetrics::LowPass {
            kernel_size,
            sigma,
            identity,
        } => {
            if *identity {
                format!("k={kernel_size} (identity)")
            } else {
                format!("k={kernel_size} sigma={sigma:.2}")
            }
        }
        StageMetrics::HighPass { min, max, mean_abs } => {
            format!("min={min:.1} max={max:.1} mean|d|={mean_abs:.2}")
        }
        StageMetrics::Adjust {
            contrast,
            brightness,
            clipped_low,
            clipped_high,
        } => format!(
            "contrast={contrast:.2} brightness={brightness:.1} clipped={clipped_low}/{clipped_high}",
        ),
        StageMetrics::ChannelMap { channel, channels } => {
            format!("channel {channel} of {channels}")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gradient_source() -> SourceImage {
        let mut data = Vec::new();
        for y in 0..6u8 {
            for x in 0..6u8 {
                data.extend_from_slice(&[x * 40, y * 40, 100]);
            }
        }
        SourceImage::from_raw(6, 6, 3, data).unwrap()
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_cover_every_stage() {
        let source = gradient_source();
        let (staged, diag) = render_with_diagnostics(&source, &ParameterSet::default()).unwrap();
        assert_eq!(diag.summary.image_width, 6);
        assert_eq!(diag.summary.pixel_count, 36);
        assert_eq!(staged.output.dimensions(), source.dimensions());
        assert!(matches!(
            diag.low_pass.metrics,
            StageMetrics::LowPass {
                kernel_size: 3,
                identity: false,
                ..
            }
        ));
        assert!(matches!(
            diag.channel_map.metrics,
            StageMetrics::ChannelMap {
                channel: 1,
                channels: 3
            }
        ));
        let stage_sum: Duration = diag.stages().iter().map(|(_, s)| s.duration).sum();
        assert!(stage_sum <= diag.total_duration);
    }

    #[test]
    fn diagnostics_propagate_parameter_errors() {
        let params = ParameterSet {
            contrast: -1.0,
            ..ParameterSet::default()
        };
        let result = render_with_diagnostics(&gradient_source(), &params);
        assert!(matches!(
            result,
            Err(PipelineError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn report_lists_stages() {
        let params = ParameterSet {
            blur_kernel_size: 1,
            ..ParameterSet::default()
        };
        let (_, diag) = render_with_diagnostics(&gradient_source(), &params).unwrap();
        let report = diag.report();
        assert!(report.contains("Render Diagnostics Report"));
        assert!(report.contains("Low-pass"));
        assert!(report.contains("k=1 (identity)"));
        assert!(report.contains("Channel map"));
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let (_, diag) = render_with_diagnostics(&gradient_source(), &ParameterSet::default()).unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: RenderDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.low_pass.metrics, diag.low_pass.metrics);
        assert_eq!(back.summary.pixel_count, 36);
    }
}
