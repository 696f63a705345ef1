//! Motion classification module

use crate::prelude::v1::*;
use log::*;

/// Default mask binarization threshold.
pub const DEFAULT_FOREGROUND_THRESHOLD: u8 = 180;
/// Default minimum area, in pixels, a region must exceed to count as motion.
pub const DEFAULT_MIN_CONTOUR_AREA: usize = 500;

/// Stateful background model.
///
/// Every call updates the model with the given frame and returns the per-pixel foreground
/// likelihood of that frame relative to the model's background. Frames that the model can not
/// process (wrong size or pixel format) must produce an error rather than an empty mask.
pub trait BackgroundModel<F> {
    fn apply(&mut self, frame: &F) -> Result<ForegroundMask>;
}

/// Outcome of classifying a single frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MotionReport {
    /// Regions that passed the area filter.
    pub regions: Vec<Region>,
}

impl MotionReport {
    /// Whether at least one region qualified as motion.
    pub fn motion_present(&self) -> bool {
        !self.regions.is_empty()
    }
}

/// Background subtraction based motion classifier.
///
/// The foreground mask of the wrapped model is binarized against a fixed threshold, cleaned up
/// with a morphological opening and split into connected regions. Only regions whose area is
/// strictly larger than `min_area` are reported.
pub struct MotionClassifier<B> {
    model: B,
    threshold: u8,
    min_area: usize,
    dim: Option<(usize, usize)>,
}

impl<B> MotionClassifier<B> {
    pub fn new(model: B) -> Self {
        Self {
            model,
            threshold: DEFAULT_FOREGROUND_THRESHOLD,
            min_area: DEFAULT_MIN_CONTOUR_AREA,
            dim: None,
        }
    }

    pub fn from_config(model: B, config: &RecorderConfig) -> Self {
        Self::new(model)
            .threshold(config.foreground_threshold)
            .min_area(config.min_contour_area)
    }

    pub fn threshold(self, threshold: u8) -> Self {
        Self { threshold, ..self }
    }

    pub fn min_area(self, min_area: usize) -> Self {
        Self { min_area, ..self }
    }

    /// Classify a single frame.
    ///
    /// The background model is updated with the frame. The first mask fixes the expected mask
    /// dimensions; any later mask of a different size is an error.
    pub fn classify<F>(&mut self, frame: &F) -> Result<MotionReport>
    where
        B: BackgroundModel<F>,
    {
        let mask = self
            .model
            .apply(frame)
            .context("background model rejected frame")?;

        match self.dim {
            Some(dim) => ensure!(
                dim == mask.dim(),
                "foreground mask changed size from {:?} to {:?}",
                dim,
                mask.dim()
            ),
            None => self.dim = Some(mask.dim()),
        }

        Ok(self.classify_mask(&mask))
    }

    /// Run the filtering policy on an already computed foreground mask.
    pub fn classify_mask(&self, mask: &ForegroundMask) -> MotionReport {
        let candidates = mask.threshold(self.threshold).open().regions();
        let total = candidates.len();

        let regions = candidates
            .into_iter()
            .filter(|r| r.area > self.min_area)
            .collect::<Vec<_>>();

        if total > 0 {
            trace!("{} of {} regions above {} px", regions.len(), total, self.min_area);
        }

        MotionReport { regions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::FOREGROUND;

    /// Returns the frame itself as the mask.
    struct Passthrough;

    impl BackgroundModel<ForegroundMask> for Passthrough {
        fn apply(&mut self, frame: &ForegroundMask) -> Result<ForegroundMask> {
            Ok(frame.clone())
        }
    }

    fn full(width: usize, height: usize) -> ForegroundMask {
        ForegroundMask::from_fn(width, height, |_, _| FOREGROUND)
    }

    #[test]
    fn area_filter_is_strict() {
        let classifier = MotionClassifier::new(Passthrough);

        // Fully set masks survive opening unchanged, so their area is exactly width * height.
        let at_limit = classifier.classify_mask(&full(25, 20));
        assert_eq!(at_limit.regions.len(), 0);
        assert!(!at_limit.motion_present());

        let above = classifier.classify_mask(&full(3, 167));
        assert!(above.motion_present());
        assert_eq!(above.regions[0].area, 501);

        let below = classifier.classify_mask(&full(1, 499));
        assert!(!below.motion_present());
    }

    #[test]
    fn custom_min_area() {
        let classifier = MotionClassifier::new(Passthrough).min_area(10);
        assert!(!classifier.classify_mask(&full(2, 5)).motion_present());
        assert!(classifier.classify_mask(&full(11, 1)).motion_present());
    }

    #[test]
    fn small_regions_dropped_large_kept() {
        let classifier = MotionClassifier::new(Passthrough).min_area(50);

        let mask = ForegroundMask::from_fn(100, 100, |x, y| {
            let big = (10..30).contains(&x) && (10..30).contains(&y);
            let small = (60..65).contains(&x) && (60..65).contains(&y);
            if big || small {
                FOREGROUND
            } else {
                0
            }
        });

        let report = classifier.classify_mask(&mask);
        assert_eq!(report.regions.len(), 1);
        assert_eq!(report.regions[0].bbox.x, 10);
        assert_eq!(report.regions[0].bbox.width, 20);
    }

    #[test]
    fn hollow_outline_is_motion() {
        let classifier = MotionClassifier::new(Passthrough);

        // 40x40 outline, 3 px thick. Its pixels alone stay below the default minimum area.
        let mask = ForegroundMask::from_fn(100, 100, |x, y| {
            let outer = (30..70).contains(&x) && (30..70).contains(&y);
            let hole = (33..67).contains(&x) && (33..67).contains(&y);
            if outer && !hole {
                FOREGROUND
            } else {
                0
            }
        });
        assert!(mask.foreground() < DEFAULT_MIN_CONTOUR_AREA);

        let report = classifier.classify_mask(&mask);
        assert!(report.motion_present());
        assert_eq!(report.regions.len(), 1);
        // Opening rounds off the four outer corners.
        assert_eq!(report.regions[0].area, 40 * 40 - 4);
        assert_eq!(
            report.regions[0].bbox,
            BoundingBox {
                x: 30,
                y: 30,
                width: 40,
                height: 40
            }
        );
    }

    #[test]
    fn shadows_are_not_motion() {
        let classifier = MotionClassifier::new(Passthrough).min_area(10);
        let shadow = ForegroundMask::from_fn(40, 40, |_, _| 127);
        assert!(!classifier.classify_mask(&shadow).motion_present());
    }

    #[test]
    fn speckle_noise_is_not_motion() {
        let classifier = MotionClassifier::new(Passthrough).min_area(0);
        let noise = ForegroundMask::from_fn(64, 64, |x, y| {
            if x % 4 == 0 && y % 4 == 0 {
                255
            } else {
                0
            }
        });
        assert!(!classifier.classify_mask(&noise).motion_present());
    }

    #[test]
    fn classify_rejects_size_change() {
        let mut classifier = MotionClassifier::new(Passthrough);
        assert!(classifier.classify(&ForegroundMask::new(8, 8)).is_ok());
        assert!(classifier.classify(&ForegroundMask::new(8, 8)).is_ok());
        assert!(classifier.classify(&ForegroundMask::new(8, 9)).is_err());
    }

    #[test]
    fn model_errors_propagate() {
        struct Broken;

        impl BackgroundModel<u32> for Broken {
            fn apply(&mut self, _: &u32) -> Result<ForegroundMask> {
                Err(anyhow!("bad channel count"))
            }
        }

        let mut classifier = MotionClassifier::new(Broken);
        assert!(classifier.classify(&0).is_err());
    }

    #[test]
    fn from_config() {
        let config = RecorderConfig {
            min_contour_area: 4,
            foreground_threshold: 100,
            ..Default::default()
        };

        let classifier = MotionClassifier::from_config(Passthrough, &config);
        let mask = ForegroundMask::from_fn(5, 1, |_, _| 101);
        assert!(classifier.classify_mask(&mask).motion_present());
    }
}
