//! Picks the target dot out of an ordered region list.

use serde::Serialize;

use super::clustering::{Region, RegionList};
use super::color::ColorLabel;

/// Which priority rule produced a match, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorRule {
    /// White at either end of the line, or with a red neighbor.
    FlankedWhite,
    AnyWhite,
    AnyRed,
    AnyGreen,
}

/// The selected region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DotMatch {
    pub position: f32,
    pub label: ColorLabel,
    pub rule: LocatorRule,
    pub region_index: usize,
}

impl DotMatch {
    /// Column used for the calibration lookup: the centroid truncated toward zero.
    pub fn column(&self) -> usize {
        self.position.max(0.0) as usize
    }
}

/// Applies the rules in priority order; `None` means no dot in this frame.
pub fn locate_dot(regions: &RegionList) -> Option<DotMatch> {
    let list = regions.as_slice();

    flanked_white(list)
        .map(|i| (i, LocatorRule::FlankedWhite))
        .or_else(|| first_of(list, ColorLabel::White).map(|i| (i, LocatorRule::AnyWhite)))
        .or_else(|| first_of(list, ColorLabel::Red).map(|i| (i, LocatorRule::AnyRed)))
        .or_else(|| first_of(list, ColorLabel::Green).map(|i| (i, LocatorRule::AnyGreen)))
        .map(|(i, rule)| DotMatch {
            position: list[i].centroid,
            label: list[i].label,
            rule,
            region_index: i,
        })
}

fn flanked_white(list: &[Region]) -> Option<usize> {
    let last = list.len().checked_sub(1)?;
    list.iter().enumerate().position(|(i, region)| {
        if region.label != ColorLabel::White {
            return false;
        }
        let left = i == 0 || list[i - 1].label == ColorLabel::Red;
        let right = i == last || list[i + 1].label == ColorLabel::Red;
        left || right
    })
}

fn first_of(list: &[Region], label: ColorLabel) -> Option<usize> {
    list.iter().position(|r| r.label == label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ColorLabel::*;

    fn list(entries: &[(ColorLabel, f32)]) -> RegionList {
        RegionList::from_regions(
            entries
                .iter()
                .map(|&(label, centroid)| Region {
                    label,
                    centroid,
                    first_column: centroid as u32,
                    last_column: centroid as u32,
                    columns: 1,
                    keys: vec![centroid as u32],
                })
                .collect(),
        )
    }

    #[test]
    fn white_between_reds() {
        let dot = locate_dot(&list(&[(Red, 5.0), (White, 20.0), (Red, 35.0)])).unwrap();
        assert_eq!(dot.position, 20.0);
        assert_eq!(dot.rule, LocatorRule::FlankedWhite);
        assert_eq!(dot.region_index, 1);
    }

    #[test]
    fn white_at_list_start_counts_as_flanked() {
        let dot = locate_dot(&list(&[(White, 5.0), (Other, 50.0)])).unwrap();
        assert_eq!(dot.position, 5.0);
        assert_eq!(dot.rule, LocatorRule::FlankedWhite);
    }

    #[test]
    fn flanked_white_beats_earlier_lone_white() {
        let dot = locate_dot(&list(&[
            (Other, 1.0),
            (White, 10.0),
            (Other, 20.0),
            (Red, 30.0),
            (White, 40.0),
            (Other, 50.0),
        ]))
        .unwrap();
        assert_eq!(dot.position, 40.0);
        assert_eq!(dot.rule, LocatorRule::FlankedWhite);
    }

    #[test]
    fn lone_white_inside_the_line() {
        let dot = locate_dot(&list(&[(Other, 1.0), (White, 10.0), (Green, 20.0)])).unwrap();
        assert_eq!(dot.position, 10.0);
        assert_eq!(dot.rule, LocatorRule::AnyWhite);
    }

    #[test]
    fn falls_back_to_red_then_green() {
        let red = locate_dot(&list(&[(Green, 3.0), (Red, 9.0), (Red, 30.0)])).unwrap();
        assert_eq!((red.position, red.rule), (9.0, LocatorRule::AnyRed));

        let green = locate_dot(&list(&[(Other, 3.0), (Green, 9.0), (Other, 30.0)])).unwrap();
        assert_eq!((green.position, green.rule), (9.0, LocatorRule::AnyGreen));
    }

    #[test]
    fn nothing_to_find() {
        assert_eq!(locate_dot(&list(&[(Other, 5.0), (Other, 50.0)])), None);
        assert_eq!(locate_dot(&RegionList::default()), None);
    }

    #[test]
    fn column_truncates_centroid() {
        let dot = locate_dot(&list(&[(White, 64.5)])).unwrap();
        assert_eq!(dot.column(), 64);
    }
}
