//! # Recorder configuration
//!
//! All tunables are fixed when the recorder starts. There is no runtime reconfiguration.

use crate::classifier::{DEFAULT_FOREGROUND_THRESHOLD, DEFAULT_MIN_CONTOUR_AREA};
use crate::prelude::v1::*;
use chrono::{DateTime, TimeZone};
use std::path::PathBuf;
use std::time::Duration;

/// How the output file of a run is named.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum OutputNaming {
    /// Always write to the same path.
    Fixed { path: PathBuf },
    /// Write to `<directory>/<prefix>_<YYYYmmdd_HHMMSS>.<extension>`, stamped with the run start.
    Timestamped {
        directory: PathBuf,
        prefix: String,
        extension: String,
    },
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self::Fixed {
            path: "recorded.mp4".into(),
        }
    }
}

impl OutputNaming {
    /// Resolve the output path for a run started at `started`.
    pub fn resolve<Tz: TimeZone>(&self, started: &DateTime<Tz>) -> PathBuf
    where
        Tz::Offset: std::fmt::Display,
    {
        match self {
            Self::Fixed { path } => path.clone(),
            Self::Timestamped {
                directory,
                prefix,
                extension,
            } => directory.join(format!(
                "{}_{}.{}",
                prefix,
                started.format("%Y%m%d_%H%M%S"),
                extension
            )),
        }
    }
}

/// Process-level recorder configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(default)
)]
pub struct RecorderConfig {
    /// Camera index or video URI.
    pub source: String,
    /// Length of footage kept from before motion started.
    pub pre_roll_seconds: f64,
    /// How long recording continues after motion was last seen.
    pub timeout_seconds: f64,
    /// Regions must be strictly larger than this many pixels to count as motion.
    pub min_contour_area: usize,
    /// Foreground mask values above this count as foreground.
    pub foreground_threshold: u8,
    pub output: OutputNaming,
    /// Four-character code of the output codec.
    pub fourcc: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            source: "0".into(),
            pre_roll_seconds: 3.0,
            timeout_seconds: 10.0,
            min_contour_area: DEFAULT_MIN_CONTOUR_AREA,
            foreground_threshold: DEFAULT_FOREGROUND_THRESHOLD,
            output: Default::default(),
            fourcc: "mp4v".into(),
        }
    }
}

impl RecorderConfig {
    /// Default location of the configuration file.
    ///
    /// This is `<config dir>/mtrec/config.json`, if the platform has a configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mtrec").join("config.json"))
    }

    /// Check that the values can be used to run a recorder.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.pre_roll_seconds.is_finite() && self.pre_roll_seconds >= 0.0,
            "pre-roll must be a non-negative number of seconds, got {}",
            self.pre_roll_seconds
        );
        ensure!(
            self.timeout_seconds.is_finite() && self.timeout_seconds >= 0.0,
            "timeout must be a non-negative number of seconds, got {}",
            self.timeout_seconds
        );
        ensure!(!self.source.is_empty(), "no video source given");

        if let OutputNaming::Fixed { path } = &self.output {
            ensure!(!path.as_os_str().is_empty(), "output path must not be empty");
        }

        self.fourcc_chars().map(|_| ())
    }

    /// Grace window after the last observed motion.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or_default()
    }

    /// Split the codec code into its four characters.
    pub fn fourcc_chars(&self) -> Result<[char; 4]> {
        let chars = self.fourcc.chars().collect::<Vec<_>>();

        match chars.as_slice() {
            &[a, b, c, d] if chars.iter().all(char::is_ascii) => Ok([a, b, c, d]),
            _ => Err(anyhow!(
                "codec must be four ASCII characters, got {:?}",
                self.fourcc
            )),
        }
    }
}
