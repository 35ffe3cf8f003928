//! Staged pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::render`] which runs the whole transform in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use nightvis_pipeline::{Pipeline, ParameterSet, PipelineError, SourceImage};
//! # fn run(source: &SourceImage) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(source, &ParameterSet::default())
//!     .resolve()?
//!     .low_pass()
//!     .high_pass()
//!     .adjust()
//!     .map_channel()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying the previously computed intermediates. Only
//! [`Pending::resolve`] can fail: once parameters are resolved, every
//! remaining step is infallible.

use crate::diagnostics::StageMetrics;
use crate::highpass::{HighPassStats, Saturation};
use crate::params::{EffectiveParameters, ParameterSet};
use crate::types::{Dimensions, OutputImage, PipelineError, Plane, SourceImage};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`resolve`](Self::resolve) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .resolve() to continue"]
pub struct Pending<'a> {
    source: &'a SourceImage,
    params: ParameterSet,
}

impl Pending<'_> {
    /// The source image this pipeline renders from.
    #[must_use]
    pub const fn source(&self) -> &SourceImage {
        self.source
    }

    /// The requested (not yet coerced) parameters.
    #[must_use]
    pub const fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Coerce the parameters against the source image and extract the
    /// signal plane that will be filtered.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ParameterOutOfRange`] if a parameter
    /// cannot be coerced.
    pub fn resolve(self) -> Result<Resolved, PipelineError> {
        let effective = self.params.resolve(self.source.channels())?;
        let signal = crate::channel::extract_signal(self.source, &effective);
        Ok(Resolved {
            effective,
            requested: self.params,
            dimensions: self.source.dimensions(),
            signal,
        })
    }
}

// ───────────────────────── Stage 1: Resolved ─────────────────────────

/// Pipeline state after parameter coercion and signal extraction.
#[must_use = "pipeline stages are consumed by advancing; call .low_pass() to continue"]
pub struct Resolved {
    effective: EffectiveParameters,
    requested: ParameterSet,
    dimensions: Dimensions,
    signal: Plane,
}

impl Resolved {
    /// The coerced parameters every later stage uses.
    #[must_use]
    pub const fn effective(&self) -> &EffectiveParameters {
        &self.effective
    }

    /// The extracted signal plane.
    #[must_use]
    pub const fn signal(&self) -> &Plane {
        &self.signal
    }

    /// Advance to the low-pass stage (Gaussian blur).
    pub fn low_pass(self) -> LowPassed {
        let low_pass = crate::blur::gaussian_blur(&self.signal, self.effective.kernel_size);
        LowPassed {
            effective: self.effective,
            dimensions: self.dimensions,
            signal: self.signal,
            low_pass,
        }
    }

    /// Metrics describing the coercion performed by this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Resolve {
            requested_kernel_size: self.requested.blur_kernel_size,
            kernel_size: self.effective.kernel_size,
            requested_channel: self.requested.channel,
            channel: self.effective.channel,
            channels: self.effective.channels,
            source_signal: self.effective.source_signal.to_string(),
        }
    }
}

// ───────────────────────── Stage 2: LowPassed ────────────────────────

/// Pipeline state after the Gaussian low-pass filter.
#[must_use = "pipeline stages are consumed by advancing; call .high_pass() to continue"]
pub struct LowPassed {
    effective: EffectiveParameters,
    dimensions: Dimensions,
    signal: Plane,
    low_pass: Plane,
}

impl LowPassed {
    /// The blurred signal plane.
    #[must_use]
    pub const fn low_pass(&self) -> &Plane {
        &self.low_pass
    }

    /// Advance to the high-pass stage (source minus low-pass).
    pub fn high_pass(self) -> HighPassed {
        let high_pass = crate::highpass::high_pass(&self.signal, &self.low_pass);
        HighPassed {
            effective: self.effective,
            dimensions: self.dimensions,
            signal: self.signal,
            low_pass: self.low_pass,
            high_pass,
        }
    }

    /// Metrics for the blur.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::LowPass {
            kernel_size: self.effective.kernel_size,
            sigma: self.effective.sigma,
            identity: self.effective.kernel_size <= 1,
        }
    }
}

// ───────────────────────── Stage 3: HighPassed ───────────────────────

/// Pipeline state after high-pass extraction.
#[must_use = "pipeline stages are consumed by advancing; call .adjust() to continue"]
pub struct HighPassed {
    effective: EffectiveParameters,
    dimensions: Dimensions,
    signal: Plane,
    low_pass: Plane,
    high_pass: Plane,
}

impl HighPassed {
    /// The signed high-pass plane.
    #[must_use]
    pub const fn high_pass(&self) -> &Plane {
        &self.high_pass
    }

    /// Advance to the contrast/brightness stage.
    pub fn adjust(self) -> Adjusted {
        let (adjusted, saturation) = crate::highpass::adjust(
            &self.high_pass,
            self.effective.contrast,
            self.effective.brightness,
        );
        Adjusted {
            effective: self.effective,
            dimensions: self.dimensions,
            signal: self.signal,
            low_pass: self.low_pass,
            high_pass: self.high_pass,
            adjusted,
            saturation,
        }
    }

    /// Metrics summarizing the detail signal.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let HighPassStats { min, max, mean_abs } = crate::highpass::stats(&self.high_pass);
        StageMetrics::HighPass { min, max, mean_abs }
    }
}

// ───────────────────────── Stage 4: Adjusted ─────────────────────────

/// Pipeline state after contrast/brightness adjustment and saturation.
#[must_use = "pipeline stages are consumed by advancing; call .map_channel() to continue"]
pub struct Adjusted {
    effective: EffectiveParameters,
    dimensions: Dimensions,
    signal: Plane,
    low_pass: Plane,
    high_pass: Plane,
    adjusted: Vec<u8>,
    saturation: Saturation,
}

impl Adjusted {
    /// Adjusted 8-bit values, one per pixel in row-major order.
    #[must_use]
    pub fn adjusted(&self) -> &[u8] {
        &self.adjusted
    }

    /// How many values were clipped at either end of the range.
    #[must_use]
    pub const fn saturation(&self) -> Saturation {
        self.saturation
    }

    /// Advance to the channel mapping stage, the final pipeline step.
    pub fn map_channel(self) -> Mapped {
        let output = crate::channel::map_to_channel(&self.adjusted, self.dimensions, &self.effective);
        Mapped {
            effective: self.effective,
            signal: self.signal,
            low_pass: self.low_pass,
            high_pass: self.high_pass,
            adjusted: self.adjusted,
            saturation: self.saturation,
            output,
        }
    }

    /// Metrics for the adjustment.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Adjust {
            contrast: self.effective.contrast,
            brightness: self.effective.brightness,
            clipped_low: self.saturation.clipped_low,
            clipped_high: self.saturation.clipped_high,
        }
    }
}

// ───────────────────────── Stage 5: Mapped ───────────────────────────

/// Pipeline state after channel mapping: the final stage.
#[must_use = "call .into_output() or .into_result() to extract the frame"]
pub struct Mapped {
    effective: EffectiveParameters,
    signal: Plane,
    low_pass: Plane,
    high_pass: Plane,
    adjusted: Vec<u8>,
    saturation: Saturation,
    output: OutputImage,
}

impl Mapped {
    /// The rendered output frame.
    #[must_use]
    pub const fn output(&self) -> &OutputImage {
        &self.output
    }

    /// Metrics for the channel mapping.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::ChannelMap {
            channel: self.effective.channel,
            channels: self.effective.channels,
        }
    }

    /// Consume the pipeline and return only the output frame.
    #[must_use]
    pub fn into_output(self) -> OutputImage {
        self.output
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            effective: self.effective,
            signal: self.signal,
            low_pass: self.low_pass,
            high_pass: self.high_pass,
            adjusted: self.adjusted,
            saturation: self.saturation,
            output: self.output,
        }
    }
}

/// Result of a render with all intermediate stage outputs preserved.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Parameters after coercion.
    pub effective: EffectiveParameters,
    /// The extracted signal plane.
    pub signal: Plane,
    /// Gaussian-blurred signal.
    pub low_pass: Plane,
    /// Signal minus low-pass.
    pub high_pass: Plane,
    /// Saturated contrast/brightness result, one value per pixel.
    pub adjusted: Vec<u8>,
    /// Clipping counts from the adjustment.
    pub saturation: Saturation,
    /// The rendered output frame.
    pub output: OutputImage,
}

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline over `source` with the given parameters.
    ///
    /// No processing is performed; `params` is copied so later edits by
    /// a controller cannot affect this run.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new<'a>(source: &'a SourceImage, params: &ParameterSet) -> Pending<'a> {
        Pending {
            source,
            params: *params,
        }
    }
}
