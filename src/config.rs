//! Runtime configuration for the ranging loop.
//!
//! Everything has a default so the loop runs with no file at all; a YAML file
//! only needs the keys it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calibration::{DEFAULT_TABLE_WIDTH, Extrapolation};
use crate::scan::{BandGeometry, ColorThresholds};

const SCAN_LINE_TOP: u32 = 1028;
const SCAN_LINE_HEIGHT: u32 = 5;
const BUCKET_WIDTH: u32 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// First sampled row, counted from the top of the frame.
    pub top: u32,
    /// Number of rows averaged per column.
    pub height: u32,
    /// Clustering granularity in columns.
    pub bucket_width: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            top: SCAN_LINE_TOP,
            height: SCAN_LINE_HEIGHT,
            bucket_width: BUCKET_WIDTH,
        }
    }
}

impl ScanConfig {
    pub fn geometry(&self) -> BandGeometry {
        BandGeometry {
            top: self.top,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub path: PathBuf,
    /// Columns in the table; the sensor width.
    pub width: usize,
    pub extrapolation: Extrapolation,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("calibrations.txt"),
            width: DEFAULT_TABLE_WIDTH,
            extrapolation: Extrapolation::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub program: String,
    pub args: Vec<String>,
    /// File the program writes the frame to.
    pub output: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: "raspistill".to_string(),
            args: ["-o", "pic.bmp", "--nopreview", "-t", "10", "-e", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output: PathBuf::from("pic.bmp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmConfig {
    /// Duty-cycle file, e.g. a sysfs PWM channel.
    pub path: PathBuf,
    /// Multiplier applied to the cube root of the distance.
    pub scale: f32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/sys/class/pwm/pwmchip0/pwm0/duty_cycle"),
            scale: 149.12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device, already configured for the link speed.
    pub path: PathBuf,
    pub sentinel: u8,
    pub command: u8,
    /// Millimeters per calibration distance unit.
    pub mm_per_unit: f32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyAMA0"),
            sentinel: 0xFF,
            command: 0x01,
            mm_per_unit: 25.4,
        }
    }
}

/// The whole configuration; one struct covers every rig variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangerConfig {
    pub scan: ScanConfig,
    pub colors: ColorThresholds,
    pub calibration: CalibrationConfig,
    pub capture: CaptureConfig,
    /// Absent: no PWM output.
    pub pwm: Option<PwmConfig>,
    /// Absent: no serial output.
    pub serial: Option<SerialConfig>,
}

impl RangerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.height == 0 {
            return Err(ConfigError::Zero("scan.height"));
        }
        if self.scan.bucket_width == 0 {
            return Err(ConfigError::Zero("scan.bucket_width"));
        }
        if self.calibration.width == 0 {
            return Err(ConfigError::Zero("calibration.width"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_rig() {
        let c = RangerConfig::default();
        assert_eq!(c.scan.top, 1028);
        assert_eq!(c.scan.height, 5);
        assert_eq!(c.scan.bucket_width, 15);
        assert_eq!(c.calibration.width, 2592);
        assert_eq!(c.colors, ColorThresholds::default());
        assert!(c.pwm.is_none() && c.serial.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "
scan:
  bucket_width: 20
colors:
  white_mean: 240
  red_ratio: 310.0
calibration:
  extrapolation: clamp
serial:
  path: /dev/ttyUSB0
";
        let c = RangerConfig::from_yaml(yaml).unwrap();
        assert_eq!(c.scan.bucket_width, 20);
        assert_eq!(c.scan.top, 1028);
        assert_eq!(c.colors.white_mean, 240);
        assert_eq!(c.colors.green_min, 160);
        assert_eq!(c.calibration.extrapolation, Extrapolation::Clamp);
        let serial = c.serial.unwrap();
        assert_eq!(serial.path, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(serial.sentinel, 0xFF);
        assert!(c.pwm.is_none());
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let mut c = RangerConfig::default();
        c.scan.bucket_width = 0;
        assert!(matches!(c.validate(), Err(ConfigError::Zero("scan.bucket_width"))));
    }
}
