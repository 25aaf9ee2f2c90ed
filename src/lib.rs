//! Ranges a colored dot from a single scan line of a still frame.
//!
//! A band of rows is averaged per column, each column gets a color label, the
//! labels are clustered into regions, the dot region is picked by pattern, and
//! its column is turned into a distance through a calibration table.

pub mod annotate;
pub mod calibration;
pub mod config;
pub mod pipeline;
pub mod plot;
pub mod scan;
pub mod sink;
pub mod source;
pub mod synthetic;

pub use calibration::{CalibrationError, Extrapolation, LookupError, LookupTable};
pub use config::RangerConfig;
pub use pipeline::{Estimate, FrameReport, RangeFinder};
