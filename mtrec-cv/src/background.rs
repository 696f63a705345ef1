//! MOG2 background subtraction.

use mtrec::prelude::v1::{Result, *};
use opencv::core::{Ptr, CV_8UC1, CV_8UC3};
use opencv::prelude::*;
use opencv::video::{create_background_subtractor_mog2, BackgroundSubtractorMOG2};

/// Gaussian mixture background model.
///
/// Shadow detection is disabled, so the foreground mask only ever contains `0` and `255` before
/// the classifier applies its own threshold.
pub struct Mog2Model {
    subtractor: Ptr<dyn BackgroundSubtractorMOG2>,
    mask: Mat,
    layout: Option<(i32, i32, i32)>,
}

impl Mog2Model {
    /// Create a model with OpenCV's default history of 500 frames and variance threshold of 16.
    pub fn try_new() -> Result<Self> {
        Ok(Self {
            subtractor: create_background_subtractor_mog2(500, 16.0, false)?,
            mask: Mat::default(),
            layout: None,
        })
    }

    /// Reject frames the model can not be fed consistently.
    ///
    /// The first frame fixes the size and pixel format. Skipping bad frames would silently
    /// desynchronise the pre-roll timing, so every mismatch is an error.
    fn check_layout(&mut self, frame: &Mat) -> Result<()> {
        let layout = (frame.cols(), frame.rows(), frame.typ());

        ensure!(
            layout.0 > 0 && layout.1 > 0,
            "received an empty {}x{} frame",
            layout.0,
            layout.1
        );

        match self.layout {
            Some(expected) => ensure!(
                expected == layout,
                "frame layout changed from {:?} to {:?}",
                expected,
                layout
            ),
            None => {
                ensure!(
                    layout.2 == CV_8UC3 || layout.2 == CV_8UC1,
                    "unsupported frame type {}, expected 8-bit gray or BGR",
                    layout.2
                );
                self.layout = Some(layout);
            }
        }

        Ok(())
    }
}

impl BackgroundModel<Mat> for Mog2Model {
    fn apply(&mut self, frame: &Mat) -> Result<ForegroundMask> {
        self.check_layout(frame)?;

        // Negative rate picks the learning rate from the history length.
        self.subtractor.apply(frame, &mut self.mask, -1.0)?;

        let (width, height) = (self.mask.cols() as usize, self.mask.rows() as usize);
        let mut data = Vec::with_capacity(width * height);

        for y in 0..self.mask.rows() {
            data.extend_from_slice(self.mask.at_row::<u8>(y)?);
        }

        ForegroundMask::from_vec(width, height, data)
    }
}
