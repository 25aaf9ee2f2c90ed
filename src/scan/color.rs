//! Heuristic color labels for averaged scan-line samples.

use palette::Srgb;
use serde::{Deserialize, Serialize};

const WHITE_MEAN: u32 = 238;
const RED_RATIO: f32 = 305.0;
const GREEN_RATIO: f32 = 1300.0;
const GREEN_MIN: u32 = 160;

/// Semantic color of a column or region.
///
/// Variants are declared in significance order: when several labels land in the
/// same bucket the greatest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorLabel {
    Other,
    Green,
    Red,
    White,
}

impl ColorLabel {
    /// Single character used by the textual strip dump.
    pub fn glyph(self) -> char {
        match self {
            ColorLabel::Other => '.',
            ColorLabel::Green => 'g',
            ColorLabel::Red => 'o',
            ColorLabel::White => 'X',
        }
    }
}

impl std::fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColorLabel::Other => "other",
            ColorLabel::Green => "green",
            ColorLabel::Red => "red",
            ColorLabel::White => "white",
        };
        f.pad(name)
    }
}

/// Tunable thresholds for [`classify`].
///
/// The defaults were tuned against the rig camera and lighting and are
/// compared with the exact operators used here; change them per rig through the
/// configuration file rather than in code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    /// Integer channel mean must be strictly greater than this to be white.
    pub white_mean: u32,
    /// Minimum `r² / (g + b)`.
    pub red_ratio: f32,
    /// Minimum `g² / (r + b)`.
    pub green_ratio: f32,
    /// Green channel must be strictly greater than this.
    pub green_min: u32,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            white_mean: WHITE_MEAN,
            red_ratio: RED_RATIO,
            green_ratio: GREEN_RATIO,
            green_min: GREEN_MIN,
        }
    }
}

/// Labels one averaged sample. Total over all inputs.
pub fn classify(sample: Srgb<u8>, thresholds: &ColorThresholds) -> ColorLabel {
    let (r, g, b) = (
        sample.red as u32,
        sample.green as u32,
        sample.blue as u32,
    );

    if (r + g + b) / 3 > thresholds.white_mean {
        ColorLabel::White
    } else if ratio_at_least(r, g + b, thresholds.red_ratio) {
        ColorLabel::Red
    } else if ratio_at_least(g, r + b, thresholds.green_ratio) && g > thresholds.green_min {
        ColorLabel::Green
    } else {
        ColorLabel::Other
    }
}

/// `numerator² / denominator >= threshold`; a zero denominator never passes.
fn ratio_at_least(numerator: u32, denominator: u32, threshold: f32) -> bool {
    if denominator == 0 {
        return false;
    }
    (numerator as f32).powi(2) / denominator as f32 >= threshold
}
