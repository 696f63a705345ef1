//! # Time sources for the recording controller

use crate::source::effective_fps;
use std::time::{Duration, Instant};

/// Monotonic time source sampled once per frame.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

/// Wall-clock time, for live cameras.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Stream time derived from the frame count.
///
/// Every call advances the clock by one frame period. Recorded files are usually processed
/// faster than realtime, which would shrink the grace window if it were measured in wall-clock
/// time.
#[derive(Clone, Copy, Debug)]
pub struct StreamClock {
    start: Instant,
    period: Duration,
    frames: u32,
}

impl StreamClock {
    /// Create a clock ticking at `fps`.
    ///
    /// # Arguments
    ///
    /// * `start` - time of the first frame.
    /// * `fps` - frame rate of the stream. Unusable rates fall back to the default.
    pub fn new(start: Instant, fps: f64) -> Self {
        Self {
            start,
            period: Duration::from_secs_f64(1.0 / effective_fps(Some(fps))),
            frames: 0,
        }
    }
}

impl Clock for StreamClock {
    fn now(&mut self) -> Instant {
        let now = self.start + self.period * self.frames;
        self.frames = self.frames.saturating_add(1);
        now
    }
}
