//! # Motion-Triggered Recording Library
//!
//! This library provides the core of a motion-triggered recorder. Frames flow from a
//! [`FrameSource`](source::FrameSource) through a [`MotionClassifier`](classifier::MotionClassifier)
//! into a [`RecordingController`](controller::RecordingController), which decides whether to
//! flush the [`PreRollBuffer`](buffer::PreRollBuffer), write the live frame, or stop.
//!
//! Capture, background subtraction, encoding and rendering are left to the implementor of the
//! collaborator traits. The easiest way to use the library is to import its prelude:
//!
//! ```
//! use mtrec::prelude::v1::*;
//! ```

pub mod buffer;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod controller;
pub mod mask;
pub mod pipeline;
pub mod sink;
pub mod source;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            buffer::PreRollBuffer,
            classifier::{BackgroundModel, MotionClassifier, MotionReport},
            clock::{Clock, MonotonicClock, StreamClock},
            config::{OutputNaming, RecorderConfig},
            controller::{RecordingController, RecordingState, StepOutcome},
            mask::{BoundingBox, ForegroundMask, Region},
            pipeline::{run, Annotator, Control, EndReason, Preview, Recorder, RunSummary, Tick},
            sink::Sink,
            source::{FrameSource, SourceProperties},
        };
        pub use anyhow::{anyhow, bail, ensure, Context, Error, Result};
    }
}
