//! # Frame acquisition

use crate::prelude::v1::*;

/// Frame rate assumed when the source does not report a usable one.
pub const FALLBACK_FPS: f64 = 30.0;

/// Properties reported by a frame source when it is opened.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct SourceProperties {
    pub width: usize,
    pub height: usize,
    /// Nominal frame rate, if the device reports one.
    pub nominal_fps: Option<f64>,
}

impl SourceProperties {
    /// Frame rate to size buffers and outputs with.
    ///
    /// See [`effective_fps`].
    pub fn effective_fps(&self) -> f64 {
        effective_fps(self.nominal_fps)
    }
}

/// Substitute [`FALLBACK_FPS`] for an unknown or unusable frame rate.
///
/// Realtime devices frequently report `0`, which would otherwise size the pre-roll buffer to
/// nothing. Negative and non-finite values are treated the same way.
pub fn effective_fps(nominal_fps: Option<f64>) -> f64 {
    match nominal_fps {
        Some(fps) if fps.is_finite() && fps > 0.0 => fps,
        _ => FALLBACK_FPS,
    }
}

/// Live frame producer.
pub trait FrameSource {
    type Frame;

    /// Get the dimensions and nominal rate of the stream.
    fn properties(&self) -> SourceProperties;

    /// Acquire the next frame.
    ///
    /// This blocks until a frame is available. `Ok(None)` signals the end of the stream, which is
    /// a normal terminal condition. Errors are not retried.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;

    /// Release the underlying device or file.
    fn release(self) -> Result<()>
    where
        Self: Sized;
}
