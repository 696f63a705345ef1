//! Record camera footage around detected motion

use clap::*;
use log::*;
use mtrec::prelude::v1::{Result, *};
use mtrec_cv::{CvSink, CvSource, Mog2Model, PreviewWindow, TimestampOverlay};
use opencv::core::Mat;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const WINDOW_TITLE: &str = "Surveillance Feed";

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("motion-recorder")
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("source")
                .long("source")
                .short('s')
                .takes_value(true)
                .help("Camera index, device path or video file"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("pre-roll")
                .long("pre-roll")
                .takes_value(true)
                .help("Seconds of footage kept from before motion"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .takes_value(true)
                .help("Seconds to keep recording after the last motion"),
        )
        .arg(
            Arg::new("min-area")
                .long("min-area")
                .takes_value(true)
                .help("Regions must be larger than this many pixels"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .takes_value(true)
                .help("Foreground mask threshold (0-255)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .conflicts_with("output-dir")
                .help("Output video file"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .takes_value(true)
                .help("Write timestamped files into this directory"),
        )
        .arg(
            Arg::new("fourcc")
                .long("fourcc")
                .takes_value(true)
                .help("Four-character output codec code"),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .help("Do not open a preview window"),
        )
        .arg(
            Arg::new("stream-clock")
                .long("stream-clock")
                .help("Measure the grace window in stream time instead of wall-clock time"),
        )
        .get_matches();

    let config = load_config(&matches).map_err(|e| {
        error!("Invalid configuration: {:#}", e);
        e
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));

    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("failed to install Ctrl-C handler")?;
    }

    let model = Mog2Model::try_new().context("failed to create background model")?;

    let mut preview: Box<dyn Preview<Mat>> = if matches.is_present("headless") {
        Box::new(())
    } else {
        Box::new(PreviewWindow::new(WINDOW_TITLE)?)
    };

    let (source, sink) = acquire(
        || CvSource::open(&config.source),
        |props| open_sink(&config, props.effective_fps(), props.width, props.height),
        &mut *preview,
    )
    .map_err(|e| {
        error!("{:#}", e);
        e
    })?;

    let props = source.properties();

    if props.nominal_fps.is_none() {
        warn!(
            "Could not determine FPS, assuming {}",
            mtrec::source::FALLBACK_FPS
        );
    }

    let fps = props.effective_fps();

    let now = Instant::now();
    let mut recorder = Recorder::<Mat, _>::new(&config, props.nominal_fps, model, now);

    let mut clock: Box<dyn Clock> = if matches.is_present("stream-clock") {
        Box::new(StreamClock::new(now, fps))
    } else {
        Box::new(MonotonicClock)
    };

    info!(
        "Surveillance started. FPS: {:.2}. Pre-roll: {} frames. Press 'q' to exit.",
        fps,
        recorder.preroll().capacity()
    );

    let summary = run(
        source,
        sink,
        &mut recorder,
        &mut *clock,
        &mut TimestampOverlay,
        &mut *preview,
        &shutdown,
    )?;

    info!(
        "Finished ({:?}): read {} frames, wrote {} frames in {} recordings",
        summary.end, summary.frames_read, summary.frames_written, summary.recordings
    );

    Ok(())
}

/// Build the configuration from the config file and command line overrides.
fn load_config(matches: &ArgMatches) -> Result<RecorderConfig> {
    let path = match matches.value_of("config") {
        Some(path) => Some(PathBuf::from(path)),
        None => RecorderConfig::default_path().filter(|path| path.is_file()),
    };

    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            read_config(&path)?
        }
        None => RecorderConfig::default(),
    };

    if let Some(source) = matches.value_of("source") {
        config.source = source.into();
    }

    if let Some(secs) = parse_arg(matches, "pre-roll")? {
        config.pre_roll_seconds = secs;
    }

    if let Some(secs) = parse_arg(matches, "timeout")? {
        config.timeout_seconds = secs;
    }

    if let Some(area) = parse_arg(matches, "min-area")? {
        config.min_contour_area = area;
    }

    if let Some(threshold) = parse_arg(matches, "threshold")? {
        config.foreground_threshold = threshold;
    }

    if let Some(fourcc) = matches.value_of("fourcc") {
        config.fourcc = fourcc.into();
    }

    if let Some(path) = matches.value_of("output") {
        config.output = OutputNaming::Fixed { path: path.into() };
    } else if let Some(directory) = matches.value_of("output-dir") {
        config.output = match config.output {
            OutputNaming::Timestamped {
                prefix, extension, ..
            } => OutputNaming::Timestamped {
                directory: directory.into(),
                prefix,
                extension,
            },
            OutputNaming::Fixed { .. } => OutputNaming::Timestamped {
                directory: directory.into(),
                prefix: "motion".into(),
                extension: "mp4".into(),
            },
        };
    }

    config.validate()?;

    Ok(config)
}

fn read_config(path: &Path) -> Result<RecorderConfig> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("could not open config {}", path.display()))?;

    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("could not parse config {}", path.display()))
}

fn parse_arg<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("invalid value {:?} for --{}", value, name))
        })
        .transpose()
}

/// Open the source, then the sink.
///
/// Whatever was acquired is released again if a later step fails, and the preview is closed.
fn acquire<Src, S>(
    open_source: impl FnOnce() -> Result<Src>,
    open_sink: impl FnOnce(&SourceProperties) -> Result<S>,
    preview: &mut dyn Preview<Src::Frame>,
) -> Result<(Src, S)>
where
    Src: FrameSource,
{
    let source = match open_source() {
        Ok(source) => source,
        Err(e) => {
            close_preview(preview);
            return Err(e);
        }
    };

    match open_sink(&source.properties()) {
        Ok(sink) => Ok((source, sink)),
        Err(e) => {
            if let Err(e) = source.release() {
                error!("Failed to release source: {:#}", e);
            }
            close_preview(preview);
            Err(e)
        }
    }
}

fn close_preview<F>(preview: &mut dyn Preview<F>) {
    if let Err(e) = preview.close() {
        error!("Failed to close preview: {:#}", e);
    }
}

fn open_sink(config: &RecorderConfig, fps: f64, width: usize, height: usize) -> Result<CvSink> {
    let path = config.output.resolve(&chrono::Local::now());

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("could not create {}", dir.display()))?;
    }

    CvSink::open(&path, config.fourcc_chars()?, fps, width, height)
}
