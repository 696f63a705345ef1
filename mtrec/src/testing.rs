//! Test doubles for the collaborator traits.

use crate::mask::FOREGROUND;
use crate::prelude::v1::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub fn motion() -> MotionReport {
    MotionReport {
        regions: vec![Region {
            bbox: BoundingBox {
                x: 0,
                y: 0,
                width: 30,
                height: 30,
            },
            area: 900,
        }],
    }
}

pub fn still() -> MotionReport {
    MotionReport::default()
}

/// Sink collecting written frames in memory.
#[derive(Clone, Debug)]
pub struct VecSink<F> {
    pub frames: Vec<F>,
}

impl<F> Default for VecSink<F> {
    fn default() -> Self {
        Self { frames: vec![] }
    }
}

impl<F: Clone> Sink<F> for VecSink<F> {
    fn write(&mut self, frame: &F) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Sink that refuses every frame.
pub struct FailingSink;

impl<F> Sink<F> for FailingSink {
    fn write(&mut self, _: &F) -> Result<()> {
        Err(anyhow!("disk full"))
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Record of what happened to shared resources, observable after they were consumed.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    pub written: Vec<u32>,
    pub sink_closed: usize,
    pub source_released: usize,
}

pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Sink recording into a shared ledger.
pub struct LedgerSink {
    pub ledger: SharedLedger,
    pub fail_after: Option<usize>,
}

impl Sink<u32> for LedgerSink {
    fn write(&mut self, frame: &u32) -> Result<()> {
        let mut ledger = self.ledger.lock().unwrap();
        if Some(ledger.written.len()) == self.fail_after {
            return Err(anyhow!("disk full"));
        }
        ledger.written.push(*frame);
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.ledger.lock().unwrap().sink_closed += 1;
        Ok(())
    }
}

/// Source yielding frames `0..count`.
pub struct CountingSource {
    pub next: u32,
    pub count: u32,
    pub fail_at: Option<u32>,
    pub ledger: SharedLedger,
}

impl FrameSource for CountingSource {
    type Frame = u32;

    fn properties(&self) -> SourceProperties {
        SourceProperties {
            width: 32,
            height: 32,
            nominal_fps: Some(1.0),
        }
    }

    fn next_frame(&mut self) -> Result<Option<u32>> {
        if Some(self.next) == self.fail_at {
            return Err(anyhow!("device unplugged"));
        }

        if self.next >= self.count {
            return Ok(None);
        }

        let frame = self.next;
        self.next += 1;
        Ok(Some(frame))
    }

    fn release(self) -> Result<()> {
        self.ledger.lock().unwrap().source_released += 1;
        Ok(())
    }
}

/// Background model reporting a large foreground blob for the listed frames.
///
/// Frames are compared with the annotation bit masked off.
pub struct ScriptedModel {
    pub moving: HashSet<u32>,
}

impl ScriptedModel {
    pub fn new(moving: impl IntoIterator<Item = u32>) -> Self {
        Self {
            moving: moving.into_iter().collect(),
        }
    }
}

impl BackgroundModel<u32> for ScriptedModel {
    fn apply(&mut self, frame: &u32) -> Result<ForegroundMask> {
        let moving = self.moving.contains(&(frame & !ANNOTATED));

        Ok(ForegroundMask::from_fn(32, 32, |_, _| {
            if moving {
                FOREGROUND
            } else {
                0
            }
        }))
    }
}

/// Bit set on frames that went through [`MarkingAnnotator`].
pub const ANNOTATED: u32 = 1 << 31;

pub struct MarkingAnnotator;

impl Annotator<u32> for MarkingAnnotator {
    fn annotate(&mut self, frame: &mut u32, _: &MotionReport) -> Result<()> {
        *frame |= ANNOTATED;
        Ok(())
    }
}
