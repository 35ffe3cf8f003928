//! nightvis: interactive night-vision session.
//!
//! Loads an image, renders it with the initial parameters, then reads
//! commands line by line (from stdin or a `--script` file). Every `set`
//! goes through the parameter controller and re-renders the frame;
//! `save` writes the current frame as PNG.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin nightvis -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod command;

use std::io::{BufRead, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use nightvis_pipeline::{Control, ParameterSet, Session, SourceSignal};
use tracing_subscriber::EnvFilter;

use crate::command::Command;

/// Interactive night-vision effect.
///
/// Amplifies the high-frequency detail of an image and renders it into
/// a single color channel. Controls are adjusted with `set <control>
/// <value>` commands; `save` writes the current frame.
#[derive(Parser)]
#[command(name = "nightvis", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Default path for `save`.
    #[arg(short, long, default_value = "processed.png")]
    output: PathBuf,

    /// Gaussian kernel size (even values round up to the next odd).
    #[arg(long, default_value_t = ParameterSet::DEFAULT_BLUR_KERNEL_SIZE)]
    blur_kernel_size: i32,

    /// Scale applied to the high-pass detail.
    #[arg(long, default_value_t = ParameterSet::DEFAULT_CONTRAST)]
    contrast: f32,

    /// Offset added after contrast scaling.
    #[arg(long, default_value_t = ParameterSet::DEFAULT_BRIGHTNESS, allow_hyphen_values = true)]
    brightness: f32,

    /// Output channel index (0 = red, 1 = green, 2 = blue).
    #[arg(long, default_value_t = ParameterSet::DEFAULT_CHANNEL, allow_hyphen_values = true)]
    channel: i32,

    /// Filter the luminance of the image instead of the selected channel.
    #[arg(long)]
    luma: bool,

    /// Full parameter set as a JSON string.
    ///
    /// When provided, all other parameter flags are ignored. The JSON
    /// must be a valid `ParameterSet` serialization; missing fields take
    /// their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Read commands from this file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long)]
    log: bool,
}

/// Build the initial [`ParameterSet`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn params_from_cli(cli: &Cli) -> Result<ParameterSet, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ParameterSet {
        blur_kernel_size: cli.blur_kernel_size,
        contrast: cli.contrast,
        brightness: cli.brightness,
        channel: cli.channel,
        source_signal: if cli.luma {
            SourceSignal::Luma
        } else {
            SourceSignal::Channel
        },
    })
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log);

    let params = params_from_cli(&cli)?;

    eprintln!("Reading image from {}", cli.image_path.display());
    let image_bytes = std::fs::read(&cli.image_path)?;
    let source = Arc::new(nightvis_pipeline::source::decode(&image_bytes)?);
    eprintln!(
        "Image: {}x{}, {} channels",
        source.width(),
        source.height(),
        source.channels(),
    );

    let mut session = Session::new(source, params);
    // The controller clamps the initial parameters; anything it cannot
    // clamp fails this first render and ends the session.
    session.refresh()?;
    show(&session);

    let (input, interactive): (Box<dyn BufRead>, bool) = match cli.script {
        Some(ref path) => (Box::new(BufReader::new(std::fs::File::open(path)?)), false),
        None => (
            Box::new(std::io::stdin().lock()),
            std::io::stdin().is_terminal(),
        ),
    };

    run_commands(&mut session, input, interactive, &cli.output)?;
    Ok(())
}

/// Apply commands until `quit` or end of input.
fn run_commands(
    session: &mut Session,
    input: Box<dyn BufRead>,
    interactive: bool,
    default_output: &Path,
) -> std::io::Result<()> {
    if interactive {
        eprintln!("{}", command::HELP);
        prompt()?;
    }

    for (number, line) in input.lines().enumerate() {
        let line = line?;
        match command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(cmd)) => execute(session, cmd, default_output),
            Err(e) => eprintln!("line {}: {e}", number + 1),
        }
        if interactive {
            prompt()?;
        }
    }
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    write!(stderr, "> ")?;
    stderr.flush()
}

fn execute(session: &mut Session, cmd: Command, default_output: &Path) {
    match cmd {
        Command::Set { control, value } => set(session, control, value),
        Command::Save(path) => save(session, path.as_deref().unwrap_or(default_output)),
        Command::Show => show(session),
        Command::Controls => {
            for (control, spec) in session.controller().controls() {
                println!(
                    "{control:<18} [{}, {}] step {}",
                    spec.min, spec.max, spec.step
                );
            }
        }
        Command::Help => println!("{}", command::HELP),
        Command::Quit => {}
    }
}

fn set(session: &mut Session, control: Control, value: f64) {
    let applied = match session.controller().set(control, value) {
        Ok(applied) => applied,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    println!("{control} = {applied}");

    // A failed render keeps the previous frame on screen.
    if let Err(e) = session.refresh() {
        tracing::error!("render failed: {e}");
        eprintln!("Render error: {e} (keeping previous frame)");
    }
}

fn save(session: &Session, path: &Path) {
    let Some(frame) = session.frame() else {
        eprintln!("Nothing rendered yet");
        return;
    };
    let png = match nightvis_pipeline::encode_png(&frame.image) {
        Ok(png) => png,
        Err(e) => {
            eprintln!("Error encoding frame: {e}");
            return;
        }
    };
    match std::fs::write(path, &png) {
        Ok(()) => {
            tracing::info!(path = %path.display(), bytes = png.len(), "frame saved");
            eprintln!("Saved {} ({} bytes)", path.display(), png.len());
        }
        Err(e) => eprintln!("Error writing {}: {e}", path.display()),
    }
}

fn show(session: &Session) {
    let current = session.controller().snapshot();
    let p = current.params;
    println!(
        "blur_kernel_size={} contrast={} brightness={} channel={} signal={} (generation {})",
        p.blur_kernel_size, p.contrast, p.brightness, p.channel, p.source_signal, current.generation,
    );
    if let Some(frame) = session.frame() {
        println!(
            "frame: {}x{}, {} channels, generation {}",
            frame.image.width(),
            frame.image.height(),
            frame.image.channels(),
            frame
                .generation
                .map_or_else(|| "-".to_string(), |g| g.to_string()),
        );
    }
}
