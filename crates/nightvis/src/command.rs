//! Session commands, one per input line.

use std::path::PathBuf;

use nightvis_pipeline::Control;
use nightvis_pipeline::controller::UnknownControl;

/// A parsed session command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move one control to a new value.
    Set { control: Control, value: f64 },
    /// Write the current frame as PNG, to the given path or the session
    /// default.
    Save(Option<PathBuf>),
    /// Print the current parameters and frame.
    Show,
    /// List every control with its bounds.
    Controls,
    /// Print the command summary.
    Help,
    /// End the session.
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Control(#[from] UnknownControl),
    #[error("invalid value `{0}`: expected a number")]
    Value(String),
}

pub const HELP: &str = "\
commands:
  set <control> <value>   move a control (blur_kernel_size, contrast, brightness, channel)
  save [path]             write the current frame as PNG
  show                    print the current parameters
  controls                list control bounds
  help                    this summary
  quit                    end the session";

/// Parse one input line. Blank lines and `#` comments yield `None`.
///
/// # Errors
///
/// Returns a [`CommandError`] describing the first problem found.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("set", [control, value]) => Command::Set {
            control: control.parse()?,
            value: value
                .parse()
                .map_err(|_| CommandError::Value((*value).to_string()))?,
        },
        ("set", _) => return Err(CommandError::Usage("set <control> <value>")),
        ("save" | "s", []) => Command::Save(None),
        ("save" | "s", [path]) => Command::Save(Some(PathBuf::from(path))),
        ("save" | "s", _) => return Err(CommandError::Usage("save [path]")),
        ("show", _) => Command::Show,
        ("controls", _) => Command::Controls,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", _) => Command::Quit,
        _ => return Err(CommandError::Unknown(verb.to_string())),
    };
    Ok(Some(command))
}
