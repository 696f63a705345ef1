//! # Recording pipeline
//!
//! Ties the pre-roll buffer, the motion classifier and the recording controller together, and
//! drives them from a frame source.

use crate::prelude::v1::*;
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Draws onto live frames before they are persisted.
///
/// Only live frames pass through the annotator. Pre-roll frames are buffered before annotation
/// and get written as captured.
pub trait Annotator<F> {
    fn annotate(&mut self, frame: &mut F, report: &MotionReport) -> Result<()>;
}

impl<F> Annotator<F> for () {
    fn annotate(&mut self, _: &mut F, _: &MotionReport) -> Result<()> {
        Ok(())
    }
}

/// Whether the run loop should keep going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

/// Everything an external renderer needs to present one tick.
pub struct Tick<'a, F> {
    /// The frame as captured, without annotations.
    pub frame: &'a F,
    pub report: &'a MotionReport,
    /// State after the tick.
    pub state: RecordingState,
    pub outcome: StepOutcome,
}

/// Operator-facing preview of the feed.
pub trait Preview<F> {
    /// Present a tick and poll for operator input.
    fn present(&mut self, tick: &Tick<F>) -> Result<Control>;

    /// Tear down the preview.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Headless operation.
impl<F> Preview<F> for () {
    fn present(&mut self, _: &Tick<F>) -> Result<Control> {
        Ok(Control::Continue)
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The source ran out of frames.
    EndOfStream,
    /// The operator asked to stop from the preview.
    StopRequested,
    /// An external shutdown request (such as Ctrl-C) was received.
    Shutdown,
}

/// Statistics of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: usize,
    pub frames_written: usize,
    /// Number of times recording started.
    pub recordings: usize,
    pub end: EndReason,
}

/// Per-frame recording pipeline.
pub struct Recorder<F, B> {
    preroll: PreRollBuffer<F>,
    classifier: MotionClassifier<B>,
    controller: RecordingController,
    frames_written: usize,
    recordings: usize,
}

impl<F, B> Recorder<F, B> {
    /// Create a recorder from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - recorder configuration.
    /// * `nominal_fps` - frame rate reported by the source, used to size the pre-roll buffer.
    /// * `model` - background model to classify motion with.
    /// * `now` - start time of the run.
    pub fn new(config: &RecorderConfig, nominal_fps: Option<f64>, model: B, now: Instant) -> Self {
        Self::from_parts(
            PreRollBuffer::for_window(nominal_fps, config.pre_roll_seconds),
            MotionClassifier::from_config(model, config),
            RecordingController::new(config.timeout(), now),
        )
    }

    pub fn from_parts(
        preroll: PreRollBuffer<F>,
        classifier: MotionClassifier<B>,
        controller: RecordingController,
    ) -> Self {
        Self {
            preroll,
            classifier,
            controller,
            frames_written: 0,
            recordings: 0,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.controller.state()
    }

    pub fn preroll(&self) -> &PreRollBuffer<F> {
        &self.preroll
    }

    /// Total frames handed to sinks so far.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Number of recordings started so far.
    pub fn recordings(&self) -> usize {
        self.recordings
    }
}

impl<F: Clone, B: BackgroundModel<F>> Recorder<F, B> {
    /// Process a single frame.
    ///
    /// The frame is classified, annotated and handed to the controller, which may write it
    /// (preceded by the pre-roll on a new recording) to `sink`. The unannotated frame is then
    /// presented and pushed into the pre-roll buffer, after the controller has run, so that a
    /// flush never contains the frame that triggered it.
    pub fn tick<S, A, P>(
        &mut self,
        mut frame: F,
        now: Instant,
        sink: &mut S,
        annotator: &mut A,
        preview: &mut P,
    ) -> Result<Control>
    where
        S: Sink<F>,
        A: Annotator<F> + ?Sized,
        P: Preview<F> + ?Sized,
    {
        let report = self.classifier.classify(&frame)?;

        let raw = frame.clone();

        annotator
            .annotate(&mut frame, &report)
            .context("failed to annotate frame")?;

        let outcome = self
            .controller
            .step(&frame, &report, now, &self.preroll, sink)?;

        self.frames_written += outcome.frames_written();

        if let StepOutcome::Started { .. } = outcome {
            self.recordings += 1;
        }

        let control = preview.present(&Tick {
            frame: &raw,
            report: &report,
            state: self.controller.state(),
            outcome,
        })?;

        self.preroll.push(raw);

        if outcome.frames_written() > 0 {
            self.preroll.mark_persisted();
        }

        Ok(control)
    }
}

/// Run the recorder until the source ends, the operator stops it or `shutdown` is set.
///
/// The sink is closed, the source released and the preview torn down exactly once on every exit
/// path, including errors. If the loop failed, its error is returned and cleanup errors are only
/// logged.
pub fn run<Src, S, B, C, A, P>(
    mut source: Src,
    mut sink: S,
    recorder: &mut Recorder<Src::Frame, B>,
    clock: &mut C,
    annotator: &mut A,
    preview: &mut P,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    Src: FrameSource,
    Src::Frame: Clone,
    S: Sink<Src::Frame>,
    B: BackgroundModel<Src::Frame>,
    C: Clock + ?Sized,
    A: Annotator<Src::Frame> + ?Sized,
    P: Preview<Src::Frame> + ?Sized,
{
    let mut frames_read = 0;

    let end = drive(
        &mut source,
        &mut sink,
        recorder,
        clock,
        annotator,
        preview,
        shutdown,
        &mut frames_read,
    );

    if let Err(e) = &end {
        error!("Recording loop failed: {:#}", e);
    }

    info!("Cleaning up resources...");

    let cleanup = [
        ("finalise output", sink.close()),
        ("release source", source.release()),
        ("close preview", preview.close()),
    ];

    let mut cleanup_err = None;

    for (what, res) in cleanup {
        if let Err(e) = res {
            error!("Failed to {}: {:#}", what, e);
            cleanup_err.get_or_insert_with(|| e.context(format!("failed to {}", what)));
        }
    }

    let end = match (end, cleanup_err) {
        (Err(e), _) => return Err(e),
        (Ok(_), Some(e)) => return Err(e),
        (Ok(end), None) => end,
    };

    Ok(RunSummary {
        frames_read,
        frames_written: recorder.frames_written(),
        recordings: recorder.recordings(),
        end,
    })
}

#[allow(clippy::too_many_arguments)]
fn drive<Src, S, B, C, A, P>(
    source: &mut Src,
    sink: &mut S,
    recorder: &mut Recorder<Src::Frame, B>,
    clock: &mut C,
    annotator: &mut A,
    preview: &mut P,
    shutdown: &AtomicBool,
    frames_read: &mut usize,
) -> Result<EndReason>
where
    Src: FrameSource,
    Src::Frame: Clone,
    S: Sink<Src::Frame>,
    B: BackgroundModel<Src::Frame>,
    C: Clock + ?Sized,
    A: Annotator<Src::Frame> + ?Sized,
    P: Preview<Src::Frame> + ?Sized,
{
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested");
            return Ok(EndReason::Shutdown);
        }

        let frame = match source.next_frame().context("failed to read frame")? {
            Some(frame) => frame,
            None => {
                info!("End of stream");
                return Ok(EndReason::EndOfStream);
            }
        };

        *frames_read += 1;

        let now = clock.now();

        if recorder.tick(frame, now, sink, annotator, preview)? == Control::Stop {
            info!("Stop requested");
            return Ok(EndReason::StopRequested);
        }
    }
}
