//! Frame annotations and the live preview window.

use chrono::{DateTime, Local};
use mtrec::prelude::v1::{Result, *};
use opencv::core::{Point, Rect, Scalar};
use opencv::highgui;
use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8, LINE_AA};
use opencv::prelude::*;

/// Format of the burned-in wall clock timestamp.
pub const TIMESTAMP_FORMAT: &str = "Time: %Y-%m-%d %H:%M:%S";

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 200.0, 0.0)
}

fn white() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

fn bbox_rect(bbox: &BoundingBox) -> Rect {
    Rect::new(
        bbox.x as i32,
        bbox.y as i32,
        bbox.width as i32,
        bbox.height as i32,
    )
}

fn draw_regions(frame: &mut Mat, report: &MotionReport) -> Result<()> {
    for region in &report.regions {
        imgproc::rectangle(frame, bbox_rect(&region.bbox), red(), 3, LINE_8, 0)?;
    }
    Ok(())
}

fn timestamp_text(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Draws motion boxes and the current wall clock time onto persisted frames.
#[derive(Default)]
pub struct TimestampOverlay;

impl Annotator<Mat> for TimestampOverlay {
    fn annotate(&mut self, frame: &mut Mat, report: &MotionReport) -> Result<()> {
        draw_regions(frame, report)?;

        imgproc::put_text(
            frame,
            &timestamp_text(&Local::now()),
            Point::new(10, 30),
            FONT_HERSHEY_SIMPLEX,
            1.0,
            white(),
            2,
            LINE_AA,
            false,
        )?;

        Ok(())
    }
}

/// HighGUI window showing the feed with motion boxes and a recording indicator.
///
/// Pressing `q` in the window stops the recorder.
pub struct PreviewWindow {
    title: String,
    canvas: Mat,
}

impl PreviewWindow {
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;

        Ok(Self {
            title: title.into(),
            canvas: Mat::default(),
        })
    }
}

impl Preview<Mat> for PreviewWindow {
    fn present(&mut self, tick: &Tick<Mat>) -> Result<Control> {
        tick.frame.copy_to(&mut self.canvas)?;

        draw_regions(&mut self.canvas, tick.report)?;

        if tick.state == RecordingState::Recording {
            imgproc::circle(&mut self.canvas, Point::new(20, 60), 8, red(), -1, LINE_AA, 0)?;
            imgproc::put_text(
                &mut self.canvas,
                "REC",
                Point::new(35, 68),
                FONT_HERSHEY_SIMPLEX,
                0.7,
                red(),
                2,
                LINE_AA,
                false,
            )?;
        }

        highgui::imshow(&self.title, &self.canvas)?;

        if highgui::wait_key(1)? & 0xff == 'q' as i32 {
            Ok(Control::Stop)
        } else {
            Ok(Control::Continue)
        }
    }

    fn close(&mut self) -> Result<()> {
        highgui::destroy_window(&self.title)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bbox_to_rect() {
        let rect = bbox_rect(&BoundingBox {
            x: 4,
            y: 7,
            width: 30,
            height: 12,
        });

        assert_eq!(rect, Rect::new(4, 7, 30, 12));
    }

    #[test]
    fn timestamp_format() {
        let time = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp_text(&time), "Time: 2024-01-02 03:04:05");
    }
}
