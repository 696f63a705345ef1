//! OpenCV backed collaborators for the motion-triggered recorder.
//!
//! [`CvSource`] captures from cameras and video files, [`Mog2Model`] provides background
//! subtraction, [`CvSink`] encodes the output, and [`TimestampOverlay`] and [`PreviewWindow`]
//! draw the operator-facing overlays.

pub mod background;
pub mod overlay;
pub mod sink;
pub mod source;

pub use background::Mog2Model;
pub use overlay::{PreviewWindow, TimestampOverlay};
pub use sink::CvSink;
pub use source::CvSource;
