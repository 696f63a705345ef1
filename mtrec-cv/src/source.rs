//! Camera and video file capture.

use log::*;
use mtrec::prelude::v1::{Result, *};
use opencv::prelude::*;
use opencv::videoio::*;

/// Frame source backed by `cv::VideoCapture`.
///
/// Frames are BGR `Mat`s, freshly allocated for every read so that the recorder can keep them.
pub struct CvSource {
    capture: VideoCapture,
    props: SourceProperties,
}

impl CvSource {
    /// Open a camera or video stream.
    ///
    /// `source` may be a camera index (`0`), a V4L device path (`/dev/video2`) or anything
    /// `VideoCapture` accepts as a file name, such as a video file or a stream URL.
    pub fn open(source: &str) -> Result<Self> {
        let capture = match parse_device_index(source) {
            Some(index) => VideoCapture::new(index, CAP_ANY),
            None => VideoCapture::from_file(source, CAP_ANY),
        }
        .with_context(|| format!("could not open camera {}", source))?;

        if !capture.is_opened()? {
            bail!("could not open camera {}", source);
        }

        let width = capture.get(CAP_PROP_FRAME_WIDTH)?;
        let height = capture.get(CAP_PROP_FRAME_HEIGHT)?;
        let fps = capture.get(CAP_PROP_FPS)?;

        let props = SourceProperties {
            width: width as _,
            height: height as _,
            nominal_fps: Some(fps).filter(|&fps| fps > 0.0),
        };

        debug!("Opened {}: {:?}", source, props);

        Ok(Self { capture, props })
    }
}

impl FrameSource for CvSource {
    type Frame = Mat;

    fn properties(&self) -> SourceProperties {
        self.props
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();

        if self.capture.read(&mut frame)? {
            Ok(Some(frame))
        } else {
            Ok(None)
        }
    }

    fn release(mut self) -> Result<()> {
        self.capture.release().map_err(Into::into)
    }
}

/// Parse a camera index out of `0` or `/dev/video0` style identifiers.
pub fn parse_device_index(source: &str) -> Option<i32> {
    source
        .parse()
        .ok()
        .or_else(|| source.strip_prefix("/dev/video")?.parse().ok())
        .filter(|&index: &i32| index >= 0)
}
