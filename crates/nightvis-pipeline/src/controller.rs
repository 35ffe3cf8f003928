//! Live parameter control and the render loop it drives.
//!
//! A UI (trackbars, a command prompt, a test) writes control values into
//! a [`ParameterController`]. Each write clamps the value to the
//! control's declared bounds, snaps it to the control's step, and
//! publishes a new generation of the whole [`ParameterSet`].
//!
//! The render side pulls snapshots with [`ParameterController::take_latest`]
//! or [`ParameterController::wait_latest`]. Updates coalesce to the most
//! recent: if several writes land between two pulls, only the last
//! snapshot is rendered and the intermediate ones are discarded. A
//! snapshot is copied out under the lock, so a render never observes a
//! partially applied update.
//!
//! [`Session`] ties a shared [`SourceImage`] to a controller and keeps the
//! last successfully rendered [`Frame`]. A failed render leaves that
//! frame in place.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::types::{OutputImage, PipelineError, SourceImage};

/// A live-adjustable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Gaussian kernel size.
    BlurKernelSize,
    /// High-pass contrast.
    Contrast,
    /// Brightness offset.
    Brightness,
    /// Output channel index.
    Channel,
}

impl Control {
    /// Every control, in display order.
    pub const ALL: [Self; 4] = [
        Self::BlurKernelSize,
        Self::Contrast,
        Self::Brightness,
        Self::Channel,
    ];

    /// Canonical name, matching the [`ParameterSet`] field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BlurKernelSize => "blur_kernel_size",
            Self::Contrast => "contrast",
            Self::Brightness => "brightness",
            Self::Channel => "channel",
        }
    }

    /// Declared bounds and step for an image with `channels` channels.
    #[must_use]
    pub fn spec(self, channels: u8) -> ControlSpec {
        match self {
            Self::BlurKernelSize => ControlSpec {
                min: 1.0,
                max: f64::from(ParameterSet::MAX_BLUR_KERNEL_SIZE),
                step: 2.0,
            },
            Self::Contrast => ControlSpec {
                min: 0.0,
                max: 10.0,
                step: 0.1,
            },
            Self::Brightness => ControlSpec {
                min: -255.0,
                max: 255.0,
                step: 1.0,
            },
            Self::Channel => ControlSpec {
                min: 0.0,
                max: f64::from(channels.max(1) - 1),
                step: 1.0,
            },
        }
    }

    /// Read this control's current value from a parameter set.
    #[must_use]
    pub fn get(self, params: &ParameterSet) -> f64 {
        match self {
            Self::BlurKernelSize => f64::from(params.blur_kernel_size),
            Self::Contrast => f64::from(params.contrast),
            Self::Brightness => f64::from(params.brightness),
            Self::Channel => f64::from(params.channel),
        }
    }

    /// Write an already-clamped value into a parameter set.
    #[allow(clippy::cast_possible_truncation)]
    fn apply(self, params: &mut ParameterSet, value: f64) {
        match self {
            Self::BlurKernelSize => params.blur_kernel_size = value.round() as i32,
            Self::Contrast => params.contrast = value as f32,
            Self::Brightness => params.brightness = value as f32,
            Self::Channel => params.channel = value.round() as i32,
        }
    }
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Error returned when parsing an unknown control name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown control `{0}` (expected blur_kernel_size, contrast, brightness, or channel)")]
pub struct UnknownControl(pub String);

impl FromStr for Control {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur_kernel_size" | "kernel" | "ksize" | "k" => Ok(Self::BlurKernelSize),
            "contrast" | "alpha" => Ok(Self::Contrast),
            "brightness" | "beta" => Ok(Self::Brightness),
            "channel" | "color_channel" | "c" => Ok(Self::Channel),
            _ => Err(UnknownControl(s.to_string())),
        }
    }
}

/// Declared bounds and step granularity of a control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
    /// Distance between adjacent accepted values, counted from `min`.
    pub step: f64,
}

impl ControlSpec {
    /// Clamp `value` into `[min, max]` and snap it to the nearest step.
    ///
    /// Halfway values snap up, so a kernel size of 4 becomes 5.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        steps.mul_add(self.step, self.min).min(self.max)
    }
}

/// A whole parameter set tagged with the generation that published it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// The parameters at the time of publication.
    pub params: ParameterSet,
    /// Monotonically increasing publication counter.
    pub generation: u64,
}

struct ControllerState {
    params: ParameterSet,
    generation: u64,
    delivered: u64,
    closed: bool,
}

/// Shared, thread-safe owner of the live [`ParameterSet`].
pub struct ParameterController {
    channels: u8,
    state: Mutex<ControllerState>,
    changed: Condvar,
}

impl ParameterController {
    /// Create a controller for an image with `channels` channels.
    ///
    /// Every control of `initial` is clamped to its declared bounds. The
    /// initial set counts as the first generation, so the first pull
    /// returns it.
    #[must_use]
    pub fn new(initial: ParameterSet, channels: u8) -> Self {
        let mut params = initial;
        for control in Control::ALL {
            let value = control.spec(channels).clamp(control.get(&params));
            control.apply(&mut params, value);
        }
        Self {
            channels,
            state: Mutex::new(ControllerState {
                params,
                generation: 1,
                delivered: 0,
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Declared bounds of every control for this controller's image.
    #[must_use]
    pub fn controls(&self) -> [(Control, ControlSpec); 4] {
        Control::ALL.map(|c| (c, c.spec(self.channels)))
    }

    /// Set one control, clamping and snapping the value.
    ///
    /// Returns the value actually applied.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ParameterOutOfRange`] if `value` is not
    /// finite. The parameter set is left unchanged.
    pub fn set(&self, control: Control, value: f64) -> Result<f64, PipelineError> {
        if !value.is_finite() {
            tracing::warn!(%control, value, "rejected non-finite control value");
            return Err(PipelineError::ParameterOutOfRange {
                name: control.name(),
                value: value.to_string(),
            });
        }
        let applied = control.spec(self.channels).clamp(value);
        if (applied - value).abs() > f64::EPSILON {
            tracing::debug!(%control, requested = value, applied, "control value clamped");
        }

        let mut state = self.state.lock();
        control.apply(&mut state.params, applied);
        state.generation += 1;
        tracing::trace!(%control, applied, generation = state.generation, "control updated");
        drop(state);
        self.changed.notify_all();
        Ok(applied)
    }

    /// The current parameter set, whether or not it has been delivered.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            params: state.params,
            generation: state.generation,
        }
    }

    /// Take the latest snapshot if it has not been delivered yet.
    ///
    /// Returns `None` when nothing changed since the previous take.
    pub fn take_latest(&self) -> Option<Snapshot> {
        let mut state = self.state.lock();
        Self::take_pending(&mut state)
    }

    /// Block until an undelivered snapshot exists, then take it.
    ///
    /// Returns `None` once the controller is closed and everything
    /// published before the close has been delivered.
    pub fn wait_latest(&self) -> Option<Snapshot> {
        let mut state = self.state.lock();
        loop {
            if let Some(snapshot) = Self::take_pending(&mut state) {
                return Some(snapshot);
            }
            if state.closed {
                return None;
            }
            self.changed.wait(&mut state);
        }
    }

    /// Stop the render loop once pending updates are drained.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn take_pending(state: &mut ControllerState) -> Option<Snapshot> {
        if state.generation == state.delivered {
            return None;
        }
        let skipped = state.generation - state.delivered - 1;
        if skipped > 0 && state.delivered > 0 {
            tracing::trace!(skipped, generation = state.generation, "coalesced updates");
        }
        state.delivered = state.generation;
        Some(Snapshot {
            params: state.params,
            generation: state.generation,
        })
    }
}

/// A rendered frame and the parameters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The output image.
    pub image: OutputImage,
    /// Parameters the frame was rendered with.
    pub params: ParameterSet,
    /// Controller generation of `params`, or `None` for a direct render.
    pub generation: Option<u64>,
}

/// Render loop state: the source image, its controller, and the last
/// good frame.
pub struct Session {
    source: Arc<SourceImage>,
    controller: Arc<ParameterController>,
    frame: Option<Frame>,
}

impl Session {
    /// Start a session over `source` with the given initial parameters.
    #[must_use]
    pub fn new(source: Arc<SourceImage>, initial: ParameterSet) -> Self {
        let controller = Arc::new(ParameterController::new(initial, source.channels()));
        Self {
            source,
            controller,
            frame: None,
        }
    }

    /// The controller that feeds this session.
    #[must_use]
    pub const fn controller(&self) -> &Arc<ParameterController> {
        &self.controller
    }

    /// The source image.
    #[must_use]
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// The last successfully rendered frame.
    #[must_use]
    pub const fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Render the latest undelivered snapshot, if any.
    ///
    /// Returns `Ok(None)` when nothing changed.
    ///
    /// # Errors
    ///
    /// Propagates render errors. The previous frame is kept.
    pub fn refresh(&mut self) -> Result<Option<&Frame>, PipelineError> {
        let Some(snapshot) = self.controller.take_latest() else {
            return Ok(None);
        };
        self.render_snapshot(snapshot).map(Some)
    }

    /// Render `params` directly, bypassing the controller's clamping.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ParameterOutOfRange`] for values the
    /// pipeline cannot coerce. The previous frame is kept.
    pub fn render_direct(&mut self, params: &ParameterSet) -> Result<&Frame, PipelineError> {
        let image = crate::render(&self.source, params)?;
        Ok(self.frame.insert(Frame {
            image,
            params: *params,
            generation: None,
        }))
    }

    /// Render every snapshot the controller delivers until it is closed,
    /// handing each new frame to `display`.
    ///
    /// Failed renders are logged and skipped; `display` only ever sees
    /// complete frames. Returns the number of frames displayed.
    pub fn run(&mut self, mut display: impl FnMut(&Frame)) -> u64 {
        let mut displayed = 0;
        while let Some(snapshot) = self.controller.wait_latest() {
            match self.render_snapshot(snapshot) {
                Ok(frame) => {
                    display(frame);
                    displayed += 1;
                }
                Err(e) => {
                    tracing::error!(generation = snapshot.generation, "render failed: {e}");
                }
            }
        }
        displayed
    }

    fn render_snapshot(&mut self, snapshot: Snapshot) -> Result<&Frame, PipelineError> {
        let image = crate::render(&self.source, &snapshot.params)?;
        Ok(self.frame.insert(Frame {
            image,
            params: snapshot.params,
            generation: Some(snapshot.generation),
        }))
    }
}
