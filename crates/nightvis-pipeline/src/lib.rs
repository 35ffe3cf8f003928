//! nightvis-pipeline: Night-vision image transform (sans-IO).
//!
//! Separates a source image into low- and high-frequency components
//! and re-renders the amplified detail into a single color channel:
//! signal extraction -> Gaussian low-pass -> high-pass ->
//! contrast/brightness -> channel mapping.
//!
//! This crate has **no I/O dependencies** -- it decodes and encodes
//! in-memory byte slices and returns structured data. Reading files,
//! prompting for controls, and writing frames live in the `nightvis`
//! binary.

pub mod blur;
pub mod channel;
pub mod controller;
pub mod diagnostics;
pub mod encode;
pub mod highpass;
pub mod params;
pub mod pipeline;
pub mod source;
pub mod types;

pub use controller::{Control, ControlSpec, Frame, ParameterController, Session, Snapshot};
pub use diagnostics::{RenderDiagnostics, render_with_diagnostics};
pub use encode::encode_png;
pub use params::{EffectiveParameters, ParameterSet, SourceSignal};
pub use pipeline::{Pipeline, StagedResult};
pub use types::{Dimensions, OutputImage, PipelineError, SourceImage};

/// Render the night-vision transform of `source` with `params`.
///
/// Runs every stage of the [`Pipeline`] and discards the intermediates.
/// The source and parameters are not modified; the same inputs always
/// produce the same output.
///
/// # Pipeline steps
///
/// 1. Coerce parameters and extract the signal plane
/// 2. Gaussian low-pass with the effective kernel size
/// 3. High-pass: signal minus low-pass
/// 4. `high_pass * contrast + brightness`, rounded and saturated
/// 5. Write the result into the selected channel of a zeroed frame
///
/// # Errors
///
/// Returns [`PipelineError::ParameterOutOfRange`] for a negative kernel
/// size, a negative or non-finite contrast, or a non-finite brightness.
/// Kernel sizes above [`ParameterSet::MAX_BLUR_KERNEL_SIZE`] are clamped.
pub fn render(source: &SourceImage, params: &ParameterSet) -> Result<OutputImage, PipelineError> {
    let resolved = Pipeline::new(source, params).resolve()?;
    let effective = resolved.effective();
    tracing::debug!(
        width = source.width(),
        height = source.height(),
        kernel_size = effective.kernel_size,
        contrast = effective.contrast,
        brightness = effective.brightness,
        channel = effective.channel,
        signal = %effective.source_signal,
        "rendering frame"
    );
    Ok(resolved
        .low_pass()
        .high_pass()
        .adjust()
        .map_channel()
        .into_output())
}
