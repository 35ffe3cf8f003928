//! nightvis-bench: CLI tool for night-vision parameter experimentation and
//! diagnostics.
//!
//! Renders a given image file with configurable parameters, printing
//! detailed per-stage diagnostics. Useful for:
//!
//! - Comparing kernel sizes and their effect on detail and clipping
//! - Tuning contrast and brightness before a live session
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin nightvis-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use nightvis_pipeline::diagnostics::RenderDiagnostics;
use nightvis_pipeline::{ParameterSet, SourceSignal};

/// Night-vision parameter experimentation and diagnostics.
///
/// Renders an image with configurable parameters and prints detailed
/// per-stage timing and clipping diagnostics.
#[derive(Parser)]
#[command(name = "nightvis-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Gaussian kernel size (even values round up to the next odd).
    #[arg(long, default_value_t = ParameterSet::DEFAULT_BLUR_KERNEL_SIZE)]
    blur_kernel_size: i32,

    /// Scale applied to the high-pass detail.
    #[arg(long, default_value_t = ParameterSet::DEFAULT_CONTRAST)]
    contrast: f32,

    /// Offset added after contrast scaling.
    #[arg(long, default_value_t = ParameterSet::DEFAULT_BRIGHTNESS, allow_hyphen_values = true)]
    brightness: f32,

    /// Output channel index.
    #[arg(long, default_value_t = ParameterSet::DEFAULT_CHANNEL, allow_hyphen_values = true)]
    channel: i32,

    /// Signal that drives the output channel.
    #[arg(long, value_enum, default_value_t = Signal::Channel)]
    signal: Signal,

    /// Write the rendered frame as PNG to this file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full parameter set as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored.
    /// The JSON must be a valid `ParameterSet` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Enable debug logging from the pipeline.
    #[arg(long)]
    log: bool,
}

/// Source signal selection.
#[derive(Clone, Copy, ValueEnum)]
enum Signal {
    /// The source channel selected by `--channel`.
    Channel,
    /// Rec. 601 luminance of the color channels.
    Luma,
}

/// Build a [`ParameterSet`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a parameter set is
/// assembled from the individual flags.
fn params_from_cli(cli: &Cli) -> Result<ParameterSet, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ParameterSet {
        blur_kernel_size: cli.blur_kernel_size,
        contrast: cli.contrast,
        brightness: cli.brightness,
        channel: cli.channel,
        source_signal: match cli.signal {
            Signal::Channel => SourceSignal::Channel,
            Signal::Luma => SourceSignal::Luma,
        },
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let params = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let source = match nightvis_pipeline::source::decode(&image_bytes) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes, {}x{})",
        cli.image_path.display(),
        image_bytes.len(),
        source.width(),
        source.height(),
    );
    eprintln!("Params: {params:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match nightvis_pipeline::render_with_diagnostics(&source, &params) {
            Ok((staged, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the frame on the first run only.
                if run == 0
                    && let Some(ref png_path) = cli.output
                {
                    match nightvis_pipeline::encode_png(&staged.output) {
                        Ok(png) => match std::fs::write(png_path, &png) {
                            Ok(()) => {
                                eprintln!(
                                    "PNG written to {} ({} bytes)",
                                    png_path.display(),
                                    png.len(),
                                );
                            }
                            Err(e) => {
                                eprintln!("Error writing PNG to {}: {e}", png_path.display());
                            }
                        },
                        Err(e) => eprintln!("Error encoding PNG: {e}"),
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RenderDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| ms(d.total_duration))
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for (index, (name, _)) in first.stages().iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| ms(d.stages()[index].1.duration))
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
