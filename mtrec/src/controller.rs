//! # Recording state machine

use crate::prelude::v1::*;
use log::*;
use std::time::{Duration, Instant};

/// Whether frames are currently being persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// What a single controller step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// No motion while idle. Nothing was written.
    Idle,
    /// Motion started a recording. `preroll` buffered frames were flushed before the live frame.
    Started { preroll: usize },
    /// Motion while recording. The live frame was written.
    Continued,
    /// No motion, but the grace window has not elapsed yet. The live frame was written.
    Grace,
    /// The grace window elapsed. Nothing was written.
    Stopped,
}

impl StepOutcome {
    /// Number of frames handed to the sink during the step.
    pub fn frames_written(&self) -> usize {
        match self {
            Self::Idle | Self::Stopped => 0,
            Self::Started { preroll } => preroll + 1,
            Self::Continued | Self::Grace => 1,
        }
    }
}

/// Decides, frame by frame, what gets written to the sink.
///
/// A recording starts on the first frame with motion, at which point the pre-roll buffer is
/// flushed ahead of the live frame. It keeps going for as long as motion was last observed no
/// more than `timeout` ago, so continuous motion extends it indefinitely.
#[derive(Clone, Debug)]
pub struct RecordingController {
    state: RecordingState,
    last_motion: Instant,
    timeout: Duration,
}

impl RecordingController {
    /// Create an idle controller.
    ///
    /// # Arguments
    ///
    /// * `timeout` - grace window after the last observed motion.
    /// * `now` - construction time, used as the initial last-motion time.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            state: RecordingState::Idle,
            last_motion: now,
            timeout,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Time at which motion was last observed.
    pub fn last_motion(&self) -> Instant {
        self.last_motion
    }

    /// Advance the state machine by one frame.
    ///
    /// # Arguments
    ///
    /// * `frame` - live frame, as it should be persisted.
    /// * `report` - motion classification of the frame.
    /// * `now` - monotonic time of the frame.
    /// * `preroll` - frames preceding `frame`, flushed when a recording starts.
    /// * `sink` - output to write to.
    pub fn step<F, S: Sink<F>>(
        &mut self,
        frame: &F,
        report: &MotionReport,
        now: Instant,
        preroll: &PreRollBuffer<F>,
        sink: &mut S,
    ) -> Result<StepOutcome> {
        let motion = report.motion_present();

        if motion {
            self.last_motion = now;
        }

        let outcome = match (self.state, motion) {
            (RecordingState::Idle, false) => StepOutcome::Idle,
            (RecordingState::Idle, true) => {
                let frames = preroll.unpersisted();
                let count = frames.len();

                info!("Motion detected, writing {} pre-roll frames", count);

                for buffered in frames {
                    sink.write(buffered)
                        .context("failed to write pre-roll frame")?;
                }

                sink.write(frame).context("failed to write frame")?;
                self.state = RecordingState::Recording;

                StepOutcome::Started { preroll: count }
            }
            (RecordingState::Recording, true) => {
                sink.write(frame).context("failed to write frame")?;
                StepOutcome::Continued
            }
            (RecordingState::Recording, false) => {
                let quiet = now.saturating_duration_since(self.last_motion);

                if quiet > self.timeout {
                    info!(
                        "Recording stopped, no motion for {:.1}s",
                        quiet.as_secs_f64()
                    );
                    self.state = RecordingState::Idle;
                    StepOutcome::Stopped
                } else {
                    sink.write(frame).context("failed to write frame")?;
                    StepOutcome::Grace
                }
            }
        };

        debug!("{:?} -> {:?}", outcome, self.state);

        Ok(outcome)
    }
}
