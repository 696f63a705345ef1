//! Encoded video file output.

use log::*;
use mtrec::prelude::v1::{Result, *};
use opencv::core::Size;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;
use std::path::{Path, PathBuf};

/// Video file sink backed by OpenCV's `VideoWriter`.
///
/// If the source did not report its frame size, the container is opened on the first written
/// frame and takes that frame's size.
pub struct CvSink {
    writer: Option<(VideoWriter, (i32, i32))>,
    path: PathBuf,
    fourcc: [char; 4],
    fps: f64,
    written: usize,
}

impl CvSink {
    /// Open an output container.
    ///
    /// # Arguments
    ///
    /// * `path` - output file. An existing file is overwritten.
    /// * `fourcc` - codec code, such as `['m', 'p', '4', 'v']`.
    /// * `fps` - frame rate written into the container.
    /// * `width`, `height` - dimensions every written frame must have, or zero if unknown.
    pub fn open(
        path: &Path,
        fourcc: [char; 4],
        fps: f64,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let mut sink = Self {
            writer: None,
            path: path.into(),
            fourcc,
            fps,
            written: 0,
        };

        match known_size(width, height) {
            Some(size) => sink.writer = Some((sink.create(size)?, size)),
            None => warn!(
                "Source reported a {}x{} frame size, sizing {} from the first frame",
                width,
                height,
                path.display()
            ),
        }

        Ok(sink)
    }

    fn create(&self, size: (i32, i32)) -> Result<VideoWriter> {
        let name = self
            .path
            .to_str()
            .ok_or_else(|| anyhow!("output path {} is not valid UTF-8", self.path.display()))?;

        let [a, b, c, d] = self.fourcc;
        let code = VideoWriter::fourcc(a, b, c, d)?;

        let writer = VideoWriter::new(name, code, self.fps, Size::new(size.0, size.1), true)
            .with_context(|| format!("could not create {}", self.path.display()))?;

        if !writer.is_opened()? {
            bail!(
                "could not open output {} with codec {}",
                self.path.display(),
                self.fourcc.iter().collect::<String>()
            );
        }

        info!(
            "Writing {}x{} @ {:.2} fps to {}",
            size.0,
            size.1,
            self.fps,
            self.path.display()
        );

        Ok(writer)
    }
}

/// Frame size to open the writer with, if both dimensions are known.
fn known_size(width: usize, height: usize) -> Option<(i32, i32)> {
    Some((width as i32, height as i32)).filter(|&(w, h)| w > 0 && h > 0)
}

impl Sink<Mat> for CvSink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        let size = (frame.cols(), frame.rows());

        if self.writer.is_none() {
            self.writer = Some((self.create(size)?, size));
        }

        if let Some((writer, expected)) = &mut self.writer {
            // VideoWriter silently drops frames of the wrong size.
            ensure!(
                size == *expected,
                "frame is {}x{}, output expects {}x{}",
                size.0,
                size.1,
                expected.0,
                expected.1
            );

            writer.write(frame)?;
            self.written += 1;
        }

        Ok(())
    }

    fn close(self) -> Result<()> {
        match self.writer {
            Some((mut writer, _)) => {
                writer.release()?;
                info!("Saved {} frames to {}", self.written, self.path.display());
            }
            None => info!("No frames written, {} was not created", self.path.display()),
        }
        Ok(())
    }
}
