use clap::{ArgGroup, Parser};
use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use dot_ranger::annotate::annotate_frame;
use dot_ranger::config::RangerConfig;
use dot_ranger::pipeline::RangeFinder;
use dot_ranger::plot::render_profile_rgba;
use dot_ranger::scan::ScanBand;
use dot_ranger::source::open_frame;
use dot_ranger::LookupTable;

const PROFILE_HEIGHT: u32 = 120;

#[derive(Parser, Debug)]
#[command(
    name = "ranger_scan",
    about = "Run the scan-line ranger over saved frames and write reports",
    version,
    group(
        ArgGroup::new("action")
            .required(true)
            .multiple(true)
            .args(["json", "plot", "annotate"])
    )
)]
struct Cli {
    /// Directory containing input frames
    #[arg(short = 'd', long = "dir")]
    dir: PathBuf,

    /// Directory for the generated files
    #[arg(short = 'o', long = "out", default_value = ".")]
    out: PathBuf,

    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Write a JSON report per frame
    #[arg(long = "json", short = 'j')]
    json: bool,

    /// Render the classified scan line as a PNG strip
    #[arg(long = "plot", short = 'p')]
    plot: bool,

    /// Save the frame with the band and dot drawn on it
    #[arg(long = "annotate", short = 'a')]
    annotate: bool,
}

fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tif" | "tiff" | "webp"
    )
}

fn write_text_file(path: &Path, contents: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if !cli.dir.is_dir() {
        return Err(format!("Not a directory: {}", cli.dir.display()).into());
    }

    let config = match &cli.config {
        Some(path) => RangerConfig::load(path)?,
        None => RangerConfig::default(),
    };
    let table = LookupTable::load(
        &config.calibration.path,
        config.calibration.width,
        config.calibration.extrapolation,
    )?;
    let finder = RangeFinder::new(config.colors, config.scan.bucket_width, table)?;
    let geometry = config.scan.geometry();

    let mut images: Vec<PathBuf> = fs::read_dir(&cli.dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();

    images.sort();

    if images.is_empty() {
        tracing::warn!("No images found in {}", cli.dir.display());
        return Ok(());
    }

    fs::create_dir_all(&cli.out)?;

    for image_path in &images {
        let stem = image_path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("frame")
            .to_string();

        let frame = match open_frame(image_path) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{e}");
                continue;
            }
        };

        let band = match ScanBand::from_image(&frame, geometry) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", image_path.display());
                continue;
            }
        };

        let report = finder.process(&band)?;
        match report.estimate.distance() {
            Some(d) => tracing::info!("{}: distance {d:.2}", image_path.display()),
            None => tracing::info!("{}: {:?}", image_path.display(), report.estimate),
        }

        if cli.json {
            let out_json = cli.out.join(format!("{stem}_scan.json"));
            let s = serde_json::to_string_pretty(&report)?;
            if let Err(e) = write_text_file(&out_json, &s) {
                tracing::warn!(
                    "Failed to write report {} for {}: {e}",
                    out_json.display(),
                    image_path.display()
                );
            }
        }

        if cli.plot {
            let out_plot = cli.out.join(format!("{stem}_profile.png"));
            let width = band.width();
            match render_profile_rgba(width, PROFILE_HEIGHT, &report) {
                Ok(pixels) if !pixels.is_empty() => {
                    if let Some(rgba) = image::RgbaImage::from_raw(width, PROFILE_HEIGHT, pixels) {
                        if let Err(e) = rgba.save(&out_plot) {
                            tracing::warn!("Failed to save plot {}: {e}", out_plot.display());
                        }
                    } else {
                        tracing::warn!(
                            "Failed to build RGBA image for plot {} ({width}x{PROFILE_HEIGHT})",
                            out_plot.display()
                        );
                    }
                }
                Ok(_) => {
                    tracing::warn!("Plot skipped (empty scan line) for {}", image_path.display());
                }
                Err(e) => {
                    tracing::warn!("Failed to render plot {}: {e}", out_plot.display());
                }
            }
        }

        if cli.annotate {
            let out_annotated = cli.out.join(format!("{stem}_annotated.png"));
            let annotated = annotate_frame(&frame, geometry, &report);
            if let Err(e) = annotated.save(&out_annotated) {
                tracing::warn!(
                    "Failed to save annotated frame {}: {e}",
                    out_annotated.display()
                );
            }
        }
    }

    Ok(())
}
