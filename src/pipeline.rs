//! One frame in, one range estimate out.

use serde::Serialize;

use crate::calibration::{LookupError, LookupTable};
use crate::scan::{
    ClusterError, ColorLabel, ColorThresholds, DotMatch, RegionList, ScanBand, cluster, locate_dot,
    strip_text,
};

/// Outcome of ranging one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimate {
    Distance { value: f32 },
    NoDot,
    NoEstimate { reason: String },
}

impl Estimate {
    pub fn distance(&self) -> Option<f32> {
        match self {
            Estimate::Distance { value } => Some(*value),
            _ => None,
        }
    }
}

/// Everything learned from one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub columns: usize,
    pub regions: RegionList,
    pub dot: Option<DotMatch>,
    pub estimate: Estimate,
    #[serde(skip)]
    pub labels: Vec<(u32, ColorLabel)>,
}

impl FrameReport {
    /// One glyph per column; handy for eyeballing thresholds.
    pub fn strip(&self) -> String {
        strip_text(&self.labels)
    }
}

/// The immutable per-process state: thresholds, clustering width, calibration.
#[derive(Debug, Clone)]
pub struct RangeFinder {
    thresholds: ColorThresholds,
    bucket_width: u32,
    table: LookupTable,
}

impl RangeFinder {
    pub fn new(
        thresholds: ColorThresholds,
        bucket_width: u32,
        table: LookupTable,
    ) -> Result<Self, ClusterError> {
        if bucket_width == 0 {
            return Err(ClusterError::ZeroBucketWidth);
        }
        Ok(Self {
            thresholds,
            bucket_width,
            table,
        })
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    pub fn thresholds(&self) -> &ColorThresholds {
        &self.thresholds
    }

    /// Classifies, clusters, locates and ranges one band.
    ///
    /// Per-frame misses are reported in [`FrameReport::estimate`]; the only
    /// error is a table that was never filled.
    pub fn process(&self, band: &ScanBand) -> Result<FrameReport, LookupError> {
        let labels = band.labels(&self.thresholds);
        self.process_labels(labels)
    }

    /// Same as [`process`](Self::process) for an already classified line.
    pub fn process_labels(&self, labels: Vec<(u32, ColorLabel)>) -> Result<FrameReport, LookupError> {
        let regions = match cluster(labels.iter().copied(), self.bucket_width) {
            Ok(regions) => regions,
            // width was checked in `new`
            Err(ClusterError::ZeroBucketWidth) => RegionList::default(),
        };
        for region in &regions {
            tracing::debug!(
                label = %region.label,
                centroid = region.centroid,
                columns = region.columns,
                "region"
            );
        }

        let dot = locate_dot(&regions);
        let estimate = match &dot {
            None => Estimate::NoDot,
            Some(dot) => match self.table.dist(dot.column()) {
                Ok(value) => Estimate::Distance { value },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => Estimate::NoEstimate {
                    reason: e.to_string(),
                },
            },
        };

        Ok(FrameReport {
            columns: labels.len(),
            regions,
            dot,
            estimate,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Extrapolation;
    use ColorLabel::*;

    fn line(spec: &[(ColorLabel, u32)]) -> Vec<(u32, ColorLabel)> {
        let mut out = Vec::new();
        for &(label, len) in spec {
            for _ in 0..len {
                out.push((out.len() as u32, label));
            }
        }
        out
    }

    fn finder(points: &[(usize, f32)]) -> RangeFinder {
        let table =
            LookupTable::from_measurements(200, points.iter().copied(), Extrapolation::None)
                .unwrap();
        RangeFinder::new(ColorThresholds::default(), 5, table).unwrap()
    }

    #[test]
    fn ranges_white_between_reds() {
        let finder = finder(&[(40, 400.0), (80, 800.0)]);
        let labels = line(&[(Other, 50), (Red, 10), (White, 10), (Red, 10), (Other, 50)]);
        let report = finder.process_labels(labels).unwrap();

        let dot = report.dot.clone().unwrap();
        assert_eq!(dot.label, White);
        assert_eq!(dot.position, 64.5);
        assert_eq!(report.regions.len(), 5);
        // column 64 between 40 and 80
        assert_eq!(report.estimate, Estimate::Distance { value: 640.0 });
        assert_eq!(report.columns, 130);
    }

    #[test]
    fn no_dot_is_not_an_error() {
        let finder = finder(&[(40, 400.0), (80, 800.0)]);
        let report = finder.process_labels(line(&[(Other, 100)])).unwrap();
        assert_eq!(report.dot, None);
        assert_eq!(report.estimate, Estimate::NoDot);
        assert_eq!(report.estimate.distance(), None);
    }

    #[test]
    fn dot_outside_calibrated_range_has_no_estimate() {
        let finder = finder(&[(100, 1.0), (150, 2.0)]);
        let report = finder
            .process_labels(line(&[(Other, 10), (White, 10), (Other, 30)]))
            .unwrap();
        assert!(report.dot.is_some());
        assert!(matches!(report.estimate, Estimate::NoEstimate { .. }));
    }

    #[test]
    fn unfilled_table_aborts() {
        let mut table = LookupTable::new(100);
        table.add_exact(10, 1.0).unwrap();
        let finder = RangeFinder::new(ColorThresholds::default(), 5, table).unwrap();
        let err = finder
            .process_labels(line(&[(Other, 20), (White, 5), (Other, 20)]))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn zero_bucket_width_is_rejected_up_front() {
        let table = LookupTable::from_measurements(10, [(1, 1.0)], Extrapolation::None).unwrap();
        assert!(RangeFinder::new(ColorThresholds::default(), 0, table).is_err());
    }
}
