pub mod band;
pub use band::{BandError, BandGeometry, ScanBand, strip_text};
pub mod clustering;
pub use clustering::{Bucket, ClusterError, Region, RegionList, cluster};
pub mod color;
pub use color::{ColorLabel, ColorThresholds, classify};
pub mod locator;
pub use locator::{DotMatch, LocatorRule, locate_dot};
