use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use dot_ranger::config::RangerConfig;
use dot_ranger::pipeline::{Estimate, RangeFinder};
use dot_ranger::scan::ScanBand;
use dot_ranger::sink::{DistanceSink, LogSink, PwmSink, SerialSink};
use dot_ranger::source::{CaptureCommand, FrameError, FrameSource, ImageFiles};
use dot_ranger::LookupTable;

#[derive(Parser, Debug)]
#[command(
    name = "ranger",
    about = "Capture frames, locate the colored dot on the scan line and drive the outputs",
    version
)]
struct Cli {
    /// First sampled row, counted from the top of the frame
    scan_line_top: Option<u32>,

    /// Number of rows averaged per column
    scan_line_height: Option<u32>,

    /// Clustering bucket width in columns
    bucket_width: Option<u32>,

    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Calibration file (overrides the config)
    #[arg(long = "calibration")]
    calibration: Option<PathBuf>,

    /// Replay these images instead of running the capture program
    #[arg(long = "replay", num_args = 1..)]
    replay: Vec<PathBuf>,

    /// Keep cycling through the replay images
    #[arg(long = "loop")]
    loop_replay: bool,

    /// Stop after this many frames
    #[arg(short = 'n', long = "frames")]
    frames: Option<u64>,
}

fn build_config(cli: &Cli) -> Result<RangerConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => RangerConfig::load(path)?,
        None => RangerConfig::default(),
    };
    if let Some(top) = cli.scan_line_top {
        config.scan.top = top;
    }
    if let Some(height) = cli.scan_line_height {
        config.scan.height = height;
    }
    if let Some(width) = cli.bucket_width {
        config.scan.bucket_width = width;
    }
    if let Some(path) = &cli.calibration {
        config.calibration.path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_sinks(config: &RangerConfig) -> Result<Vec<Box<dyn DistanceSink>>, Box<dyn Error>> {
    let mut sinks: Vec<Box<dyn DistanceSink>> = vec![Box::new(LogSink)];
    if let Some(pwm) = &config.pwm {
        let sink = PwmSink::open(pwm)
            .map_err(|e| format!("failed to open PWM output {}: {e}", pwm.path.display()))?;
        tracing::info!(path = %pwm.path.display(), "PWM output enabled");
        sinks.push(Box::new(sink));
    }
    if let Some(serial) = &config.serial {
        let sink = SerialSink::open(serial)
            .map_err(|e| format!("failed to open serial device {}: {e}", serial.path.display()))?;
        tracing::info!(path = %serial.path.display(), "serial output enabled");
        sinks.push(Box::new(sink));
    }
    Ok(sinks)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    tracing::info!(
        top = config.scan.top,
        height = config.scan.height,
        bucket_width = config.scan.bucket_width,
        "scan line"
    );

    let table = LookupTable::load(
        &config.calibration.path,
        config.calibration.width,
        config.calibration.extrapolation,
    )?;
    let finder = RangeFinder::new(config.colors, config.scan.bucket_width, table)?;

    let mut source: Box<dyn FrameSource> = if cli.replay.is_empty() {
        Box::new(CaptureCommand::new(config.capture.clone()))
    } else {
        Box::new(ImageFiles::new(cli.replay.clone(), cli.loop_replay))
    };
    let mut sinks = build_sinks(&config)?;
    let geometry = config.scan.geometry();

    let mut frame_no = 0u64;
    let mut ranged = 0u64;
    while cli.frames.is_none_or(|limit| frame_no < limit) {
        frame_no += 1;

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(FrameError::Exhausted) => break,
            Err(e) => {
                tracing::warn!(frame = frame_no, "skipping frame: {e}");
                continue;
            }
        };
        let band = match ScanBand::from_image(&frame, geometry) {
            Ok(band) => band,
            Err(e) => {
                tracing::warn!(frame = frame_no, "skipping frame: {e}");
                continue;
            }
        };

        // A blank lookup slot means the table is broken for every frame.
        let report = finder.process(&band)?;
        tracing::debug!(frame = frame_no, strip = %report.strip());

        match &report.estimate {
            Estimate::Distance { value } => {
                ranged += 1;
                if let Some(dot) = &report.dot {
                    tracing::info!(frame = frame_no, x = dot.position, rule = ?dot.rule, "dot found");
                }
                for sink in sinks.iter_mut() {
                    if let Err(e) = sink.emit(*value) {
                        tracing::warn!(frame = frame_no, "output failed: {e}");
                    }
                }
            }
            Estimate::NoDot | Estimate::NoEstimate { .. } => {
                if let Estimate::NoEstimate { reason } = &report.estimate {
                    tracing::warn!(frame = frame_no, "{reason}");
                }
                for sink in sinks.iter_mut() {
                    if let Err(e) = sink.idle() {
                        tracing::warn!(frame = frame_no, "output failed: {e}");
                    }
                }
            }
        }
    }

    tracing::info!(attempts = frame_no, ranged, "stopped");
    Ok(())
}
