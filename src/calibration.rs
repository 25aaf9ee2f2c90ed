//! Column → distance lookup built from sparse calibration measurements.
//!
//! Every column of the sensor gets a slot. Measured columns hold their distance;
//! after [`LookupTable::fill`] every other column remembers the nearest measured
//! column on each side, so a query is a constant-time interpolation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Sensor width of the rig camera, in columns.
pub const DEFAULT_TABLE_WIDTH: usize = 2592;

/// State of one column in the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Exact(f32),
    /// Nearest measured columns to the left and right, if any.
    Mid {
        left: Option<usize>,
        right: Option<usize>,
    },
    Blank,
}

/// What to answer for columns outside the measured range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// No estimate.
    #[default]
    None,
    /// Distance of the nearest measured column.
    Clamp,
    /// Continue the line through the two nearest measured columns.
    Linear,
}

/// Per-query failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("column {column} is outside the lookup table (width {width})")]
    OutOfRange { column: usize, width: usize },

    #[error("no distance estimate available at column {0}")]
    NoEstimate(usize),

    #[error("column {0} is blank: lookup table was queried before being filled")]
    Blank(usize),
}

impl LookupError {
    /// A blank slot means the table was never filled and no later frame can
    /// succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LookupError::Blank(_))
    }
}

/// Failures while building the table from calibration data.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("failed to read calibration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: column {column} is outside the table (width {width})")]
    ColumnOutOfRange {
        line: usize,
        column: usize,
        width: usize,
    },

    #[error("calibration data contains no measurements")]
    Empty,

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Parses `column distance` pairs, one per line.
///
/// Blank lines and everything after `#` are ignored.
pub fn parse_measurements(text: &str) -> Result<Vec<(usize, usize, f32)>, CalibrationError> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let mut words = content.split_whitespace();
        let (Some(column), Some(distance), None) = (words.next(), words.next(), words.next())
        else {
            return Err(CalibrationError::Malformed {
                line,
                reason: format!("expected `column distance`, got `{content}`"),
            });
        };

        let column: usize = column.parse().map_err(|e| CalibrationError::Malformed {
            line,
            reason: format!("bad column `{column}`: {e}"),
        })?;
        let distance: f32 = distance.parse().map_err(|e| CalibrationError::Malformed {
            line,
            reason: format!("bad distance `{distance}`: {e}"),
        })?;
        if !distance.is_finite() {
            return Err(CalibrationError::Malformed {
                line,
                reason: format!("distance `{distance}` is not finite"),
            });
        }
        out.push((line, column, distance));
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct LookupTable {
    slots: Vec<Slot>,
    exact_columns: Vec<usize>,
    extrapolation: Extrapolation,
}

impl LookupTable {
    /// A table of `width` blank slots.
    pub fn new(width: usize) -> Self {
        Self {
            slots: vec![Slot::Blank; width],
            exact_columns: Vec::new(),
            extrapolation: Extrapolation::None,
        }
    }

    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Builds and fills a table; fails when there is nothing to interpolate from.
    pub fn from_measurements<I>(
        width: usize,
        measurements: I,
        extrapolation: Extrapolation,
    ) -> Result<Self, CalibrationError>
    where
        I: IntoIterator<Item = (usize, f32)>,
    {
        let mut table = Self::new(width).with_extrapolation(extrapolation);
        for (column, distance) in measurements {
            table.add_exact(column, distance)?;
        }
        table.fill();
        if table.exact_columns.is_empty() {
            return Err(CalibrationError::Empty);
        }
        Ok(table)
    }

    /// Parses calibration text and builds a filled table.
    pub fn from_text(
        text: &str,
        width: usize,
        extrapolation: Extrapolation,
    ) -> Result<Self, CalibrationError> {
        let parsed = parse_measurements(text)?;
        let mut measurements = Vec::with_capacity(parsed.len());
        for (line, column, distance) in parsed {
            if column >= width {
                return Err(CalibrationError::ColumnOutOfRange {
                    line,
                    column,
                    width,
                });
            }
            measurements.push((column, distance));
        }
        Self::from_measurements(width, measurements, extrapolation)
    }

    /// Reads the calibration file at `path`.
    pub fn load(
        path: &Path,
        width: usize,
        extrapolation: Extrapolation,
    ) -> Result<Self, CalibrationError> {
        let text = fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_text(&text, width, extrapolation)?;
        tracing::info!(
            path = %path.display(),
            measurements = table.exact_columns.len(),
            width,
            "calibration loaded"
        );
        Ok(table)
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, column: usize) -> Option<Slot> {
        self.slots.get(column).copied()
    }

    /// Measured columns in ascending order, as of the last [`fill`](Self::fill).
    pub fn exact_columns(&self) -> &[usize] {
        &self.exact_columns
    }

    /// Records a measured distance; a later call for the same column wins.
    pub fn add_exact(&mut self, column: usize, distance: f32) -> Result<(), LookupError> {
        let width = self.slots.len();
        let slot = self
            .slots
            .get_mut(column)
            .ok_or(LookupError::OutOfRange { column, width })?;
        if let Slot::Exact(previous) = *slot {
            tracing::warn!(column, previous, distance, "calibration column measured twice");
        }
        *slot = Slot::Exact(distance);
        Ok(())
    }

    /// Links every unmeasured column to its nearest measured neighbors.
    ///
    /// Safe to call again after more measurements are added. With no
    /// measurements at all every slot stays blank.
    pub fn fill(&mut self) {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Slot::Mid { .. }) {
                *slot = Slot::Blank;
            }
        }

        // Forward: blanks after a measurement point back at it.
        let mut left = None;
        for (column, slot) in self.slots.iter_mut().enumerate() {
            match *slot {
                Slot::Exact(_) => left = Some(column),
                Slot::Blank if left.is_some() => *slot = Slot::Mid { left, right: None },
                _ => {}
            }
        }

        // Backward: fill right bounds, or seed the leading run before the first measurement.
        let mut right = None;
        for (column, slot) in self.slots.iter_mut().enumerate().rev() {
            match *slot {
                Slot::Exact(_) => right = Some(column),
                Slot::Mid { left, right: None } if right.is_some() => {
                    *slot = Slot::Mid { left, right }
                }
                Slot::Blank if right.is_some() => *slot = Slot::Mid { left: None, right },
                _ => {}
            }
        }

        self.exact_columns = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(column, slot)| matches!(slot, Slot::Exact(_)).then_some(column))
            .collect();
        tracing::debug!(measurements = self.exact_columns.len(), "lookup table filled");
    }

    /// Distance estimate for `column`.
    pub fn dist(&self, column: usize) -> Result<f32, LookupError> {
        let slot = self.slot(column).ok_or(LookupError::OutOfRange {
            column,
            width: self.width(),
        })?;
        match slot {
            Slot::Exact(distance) => Ok(distance),
            Slot::Blank => Err(LookupError::Blank(column)),
            Slot::Mid {
                left: Some(left),
                right: Some(right),
            } => self.interpolate(column, left, right),
            Slot::Mid { left, right } => self.extrapolate(column, left, right),
        }
    }

    fn exact(&self, column: usize) -> Result<f32, LookupError> {
        match self.slots.get(column) {
            Some(Slot::Exact(distance)) => Ok(*distance),
            _ => Err(LookupError::Blank(column)),
        }
    }

    /// Straight line through the measurements at `a` and `b`, evaluated at `column`.
    fn interpolate(&self, column: usize, a: usize, b: usize) -> Result<f32, LookupError> {
        let (x, a_f, b_f) = (column as f64, a as f64, b as f64);
        let da = self.exact(a)? as f64;
        let db = self.exact(b)? as f64;
        Ok((((x - a_f) * db + (b_f - x) * da) / (b_f - a_f)) as f32)
    }

    fn extrapolate(
        &self,
        column: usize,
        left: Option<usize>,
        right: Option<usize>,
    ) -> Result<f32, LookupError> {
        let bound = left.or(right).ok_or(LookupError::NoEstimate(column))?;
        match self.extrapolation {
            Extrapolation::None => Err(LookupError::NoEstimate(column)),
            Extrapolation::Clamp => self.exact(bound),
            Extrapolation::Linear => {
                let pos = self
                    .exact_columns
                    .binary_search(&bound)
                    .map_err(|_| LookupError::NoEstimate(column))?;
                let other = if left.is_some() {
                    pos.checked_sub(1).map(|p| self.exact_columns[p])
                } else {
                    self.exact_columns.get(pos + 1).copied()
                };
                let other = other.ok_or(LookupError::NoEstimate(column))?;
                let (a, b) = (bound.min(other), bound.max(other));
                self.interpolate(column, a, b)
            }
        }
    }
}
