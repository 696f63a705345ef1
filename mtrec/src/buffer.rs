//! # Pre-roll ring buffer

use crate::source::effective_fps;
use std::collections::VecDeque;

/// Fixed capacity ring of the most recent frames.
///
/// The buffer always holds the last `capacity` frames pushed into it, oldest first. This is the
/// exact order in which they are played back when a recording starts.
///
/// The buffer also tracks how many of its newest frames were pushed after the last call to
/// [`mark_persisted`](PreRollBuffer::mark_persisted), so that a recording can avoid flushing
/// frames that an earlier recording already wrote.
#[derive(Clone, Debug)]
pub struct PreRollBuffer<F> {
    frames: VecDeque<F>,
    capacity: usize,
    unpersisted: usize,
}

impl<F> PreRollBuffer<F> {
    /// Create a buffer holding at most `capacity` frames.
    ///
    /// A capacity of zero is valid and disables pre-roll.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            unpersisted: 0,
        }
    }

    /// Create a buffer covering `pre_roll_seconds` of footage.
    ///
    /// The capacity is `round(fps * pre_roll_seconds)`, where an unknown or zero `nominal_fps` is
    /// replaced with [`FALLBACK_FPS`](crate::source::FALLBACK_FPS). The capacity is fixed for the
    /// lifetime of the buffer, even if the real capture rate turns out to differ.
    ///
    /// # Arguments
    ///
    /// * `nominal_fps` - frame rate reported by the source.
    /// * `pre_roll_seconds` - length of the pre-roll window.
    pub fn for_window(nominal_fps: Option<f64>, pre_roll_seconds: f64) -> Self {
        Self::new(window_capacity(effective_fps(nominal_fps), pre_roll_seconds))
    }

    /// Append a frame, evicting the oldest one if the buffer is full.
    pub fn push(&mut self, frame: F) {
        if self.capacity == 0 {
            return;
        }

        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }

        self.frames.push_back(frame);
        self.unpersisted = std::cmp::min(self.unpersisted + 1, self.frames.len());
    }

    /// Iterate the buffered frames from oldest to newest.
    pub fn snapshot(&self) -> impl ExactSizeIterator<Item = &F> + '_ {
        self.frames.iter()
    }

    /// Iterate the frames pushed since the last [`mark_persisted`](Self::mark_persisted), oldest
    /// first.
    ///
    /// If nothing was ever persisted this is the same as [`snapshot`](Self::snapshot).
    pub fn unpersisted(&self) -> impl ExactSizeIterator<Item = &F> + '_ {
        self.frames.range(self.frames.len() - self.unpersisted..)
    }

    /// Record that every frame currently in the buffer has been written out.
    pub fn mark_persisted(&mut self) {
        self.unpersisted = 0;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Compute how many frames cover `seconds` at `fps`.
///
/// Negative or non-finite products yield zero.
pub fn window_capacity(fps: f64, seconds: f64) -> usize {
    let frames = (fps * seconds).round();

    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn evicts_oldest() {
        let mut buf = PreRollBuffer::new(3);

        for f in 1..=5 {
            buf.push(f);
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.snapshot().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let mut buf = PreRollBuffer::new(4);
        buf.push(1);
        buf.push(2);

        let _ = buf.snapshot().count();
        assert_eq!(buf.snapshot().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn bounded_random_sequences() {
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let capacity = rng.gen_range(0..20);
            let pushes = rng.gen_range(0..60);
            let mut buf = PreRollBuffer::new(capacity);

            for f in 0..pushes {
                buf.push(f);
                assert!(buf.len() <= capacity);
            }

            let kept = std::cmp::min(pushes, capacity);
            assert_eq!(buf.len(), kept);

            let expected = (pushes - kept..pushes).collect::<Vec<_>>();
            assert_eq!(buf.snapshot().copied().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn zero_capacity() {
        let mut buf = PreRollBuffer::new(0);
        buf.push(1);
        buf.push(2);
        assert!(buf.is_empty());
        assert_eq!(buf.snapshot().count(), 0);
        assert_eq!(buf.unpersisted().count(), 0);
    }

    #[test]
    fn window_sizing() {
        assert_eq!(PreRollBuffer::<u8>::for_window(Some(0.0), 3.0).capacity(), 90);
        assert_eq!(PreRollBuffer::<u8>::for_window(None, 3.0).capacity(), 90);
        assert_eq!(PreRollBuffer::<u8>::for_window(Some(25.0), 3.0).capacity(), 75);
        assert_eq!(PreRollBuffer::<u8>::for_window(Some(29.97), 3.0).capacity(), 90);
        assert_eq!(PreRollBuffer::<u8>::for_window(Some(12.5), 0.5).capacity(), 6);
        assert_eq!(PreRollBuffer::<u8>::for_window(Some(30.0), 0.0).capacity(), 0);
        assert_eq!(PreRollBuffer::<u8>::for_window(Some(30.0), -1.0).capacity(), 0);
    }

    #[test]
    fn unpersisted_tail() {
        let mut buf = PreRollBuffer::new(4);

        for f in 1..=3 {
            buf.push(f);
        }
        assert_eq!(buf.unpersisted().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        buf.mark_persisted();
        assert_eq!(buf.unpersisted().count(), 0);

        buf.push(4);
        buf.push(5);
        assert_eq!(buf.snapshot().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(buf.unpersisted().copied().collect::<Vec<_>>(), vec![4, 5]);

        for f in 6..=9 {
            buf.push(f);
        }
        assert_eq!(buf.unpersisted().copied().collect::<Vec<_>>(), vec![6, 7, 8, 9]);
    }
}
