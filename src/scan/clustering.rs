//! Groups a labeled scan line into contiguous color regions.
//!
//! Columns are first routed into fixed-width buckets. Buckets whose keys touch
//! and whose dominant labels agree are then joined with a disjoint-set pass over
//! a snapshot of the buckets, so the result does not depend on visit order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::color::ColorLabel;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("bucket width must be at least 1")]
    ZeroBucketWidth,
}

/// A clustering unit: one or more bucket keys and the columns routed to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    keys: BTreeSet<u32>,
    points: BTreeSet<u32>,
    label: ColorLabel,
    main_key: u32,
}

impl Bucket {
    /// Creates a bucket holding its first column.
    pub fn new(key: u32, point: u32, label: ColorLabel) -> Self {
        Self {
            keys: BTreeSet::from([key]),
            points: BTreeSet::from([point]),
            label,
            main_key: key,
        }
    }

    /// Adds a column; the dominant label only ever moves up.
    pub fn insert(&mut self, key: u32, point: u32, label: ColorLabel) {
        self.keys.insert(key);
        self.points.insert(point);
        self.main_key = self.main_key.min(key);
        self.label = self.label.max(label);
    }

    /// Takes over every key and column of `other`.
    pub fn absorb(&mut self, other: Bucket) {
        self.main_key = self.main_key.min(other.main_key);
        self.label = self.label.max(other.label);
        self.keys.extend(other.keys);
        self.points.extend(other.points);
    }

    /// Smallest key; identifies the bucket after merges.
    pub fn main_key(&self) -> u32 {
        self.main_key
    }

    pub fn label(&self) -> ColorLabel {
        self.label
    }

    pub fn keys(&self) -> &BTreeSet<u32> {
        &self.keys
    }

    pub fn points(&self) -> &BTreeSet<u32> {
        &self.points
    }

    /// Same dominant label and at least one pair of keys one apart.
    pub fn adjacent(&self, other: &Bucket) -> bool {
        if self.label != other.label {
            return false;
        }
        self.keys.iter().any(|&k| {
            k.checked_add(1).is_some_and(|n| other.keys.contains(&n))
                || k.checked_sub(1).is_some_and(|p| other.keys.contains(&p))
        })
    }

    /// Mean of the member column indices.
    pub fn centroid(&self) -> f32 {
        let sum: u64 = self.points.iter().map(|&p| p as u64).sum();
        (sum as f64 / self.points.len() as f64) as f32
    }

    fn into_region(self) -> Region {
        let centroid = self.centroid();
        Region {
            label: self.label,
            centroid,
            first_column: self.points.first().copied().unwrap_or(self.main_key),
            last_column: self.points.last().copied().unwrap_or(self.main_key),
            columns: self.points.len(),
            keys: self.keys.into_iter().collect(),
        }
    }
}

/// A merge-closed bucket as reported to the locator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub label: ColorLabel,
    pub centroid: f32,
    pub first_column: u32,
    pub last_column: u32,
    pub columns: usize,
    pub keys: Vec<u32>,
}

/// Regions in ascending centroid order, ties broken by leftmost column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RegionList(Vec<Region>);

impl RegionList {
    pub fn from_regions(mut regions: Vec<Region>) -> Self {
        regions.sort_by(|a, b| {
            a.centroid
                .total_cmp(&b.centroid)
                .then(a.first_column.cmp(&b.first_column))
        });
        Self(regions)
    }

    pub fn as_slice(&self) -> &[Region] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Routes each column to bucket `column / bucket_width`.
///
/// Buckets come back ordered by key.
pub fn bucketize<I>(columns: I, bucket_width: u32) -> Result<Vec<Bucket>, ClusterError>
where
    I: IntoIterator<Item = (u32, ColorLabel)>,
{
    if bucket_width == 0 {
        return Err(ClusterError::ZeroBucketWidth);
    }

    let mut buckets: BTreeMap<u32, Bucket> = BTreeMap::new();
    for (column, label) in columns {
        let key = column / bucket_width;
        buckets
            .entry(key)
            .and_modify(|b| b.insert(key, column, label))
            .or_insert_with(|| Bucket::new(key, column, label));
    }
    Ok(buckets.into_values().collect())
}

/// Joins adjacent same-label buckets until no adjacent pair is left.
///
/// Input buckets must be disjoint in keys, which holds for anything produced by
/// [`bucketize`] or by a previous call. Output is ordered by main key.
pub fn merge_closure(buckets: Vec<Bucket>) -> Vec<Bucket> {
    let mut owner: HashMap<u32, usize> = HashMap::new();
    for (idx, bucket) in buckets.iter().enumerate() {
        for &key in &bucket.keys {
            owner.insert(key, idx);
        }
    }

    let mut sets = DisjointSet::new(buckets.len());
    let mut edges = 0usize;
    for (idx, bucket) in buckets.iter().enumerate() {
        for &key in &bucket.keys {
            let Some(next) = key.checked_add(1).and_then(|n| owner.get(&n).copied()) else {
                continue;
            };
            if next != idx && buckets[next].label == bucket.label {
                sets.union(idx, next);
                edges += 1;
            }
        }
    }

    let before = buckets.len();
    let mut merged: BTreeMap<usize, Bucket> = BTreeMap::new();
    for (idx, bucket) in buckets.into_iter().enumerate() {
        let root = sets.find(idx);
        match merged.get_mut(&root) {
            Some(existing) => existing.absorb(bucket),
            None => {
                merged.insert(root, bucket);
            }
        }
    }

    let mut out: Vec<Bucket> = merged.into_values().collect();
    out.sort_by_key(Bucket::main_key);
    tracing::trace!(before, after = out.len(), edges, "merged buckets");
    out
}

/// Full clustering pass: bucket, merge, and order the regions by centroid.
pub fn cluster<I>(columns: I, bucket_width: u32) -> Result<RegionList, ClusterError>
where
    I: IntoIterator<Item = (u32, ColorLabel)>,
{
    let buckets = bucketize(columns, bucket_width)?;
    let regions = merge_closure(buckets)
        .into_iter()
        .map(Bucket::into_region)
        .collect();
    Ok(RegionList::from_regions(regions))
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let parent = self.parent[x];
        if parent == x {
            return x;
        }
        let root = self.find(parent);
        self.parent[x] = root;
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        if self.rank[root_a] < self.rank[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b] = root_a;
        if self.rank[root_a] == self.rank[root_b] {
            self.rank[root_a] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ColorLabel::*;

    fn runs(spec: &[(ColorLabel, u32)]) -> Vec<(u32, ColorLabel)> {
        let mut out = Vec::new();
        let mut column = 0;
        for &(label, len) in spec {
            for _ in 0..len {
                out.push((column, label));
                column += 1;
            }
        }
        out
    }

    #[test]
    fn uniform_line_is_one_region() {
        for width in [1, 3, 7, 20] {
            let regions = cluster(runs(&[(Other, 97)]), width).unwrap();
            assert_eq!(regions.len(), 1, "bucket width {width}");
            let r = &regions.as_slice()[0];
            assert_eq!(r.columns, 97);
            assert_eq!(r.first_column, 0);
            assert_eq!(r.last_column, 96);
            assert_eq!(r.centroid, 48.0);
        }
    }

    #[test]
    fn two_blocks_keep_their_order() {
        let regions = cluster(runs(&[(Red, 20), (White, 20)]), 5).unwrap();
        let labels: Vec<_> = regions.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![Red, White]);
        assert_eq!(regions.as_slice()[0].centroid, 9.5);
        assert_eq!(regions.as_slice()[1].centroid, 29.5);
    }

    #[test]
    fn mixed_bucket_takes_most_significant_label() {
        // columns 0..3 other, 3..5 red: bucket 0 holds both
        let buckets = bucketize(runs(&[(Other, 3), (Red, 2)]), 5).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].label(), Red);
        assert_eq!(buckets[0].points().len(), 5);
    }

    #[test]
    fn same_label_separated_by_other_color_stays_apart() {
        let regions = cluster(runs(&[(Red, 10), (White, 10), (Red, 10)]), 5).unwrap();
        let labels: Vec<_> = regions.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![Red, White, Red]);
        assert_eq!(regions.as_slice()[0].keys, vec![0, 1]);
        assert_eq!(regions.as_slice()[2].keys, vec![4, 5]);
    }

    #[test]
    fn merge_closure_is_idempotent() {
        let columns = runs(&[(Other, 23), (Green, 9), (Red, 14), (White, 6), (Red, 11), (Other, 40)]);
        let once = merge_closure(bucketize(columns, 4).unwrap());
        let twice = merge_closure(once.clone());
        assert_eq!(once, twice);
        for (i, a) in once.iter().enumerate() {
            for b in &once[i + 1..] {
                assert!(!a.adjacent(b));
            }
        }
    }

    #[test]
    fn merged_buckets_are_disjoint_and_cover_every_column() {
        let columns = runs(&[(White, 8), (Other, 31), (Red, 5), (Green, 17)]);
        let merged = merge_closure(bucketize(columns, 3).unwrap());
        let mut seen = BTreeSet::new();
        for bucket in &merged {
            for &p in bucket.points() {
                assert!(seen.insert(p), "column {p} in two buckets");
            }
        }
        assert_eq!(seen.len(), 61);
    }

    #[test]
    fn main_key_is_minimum_after_merge() {
        let mut a = Bucket::new(4, 20, Red);
        a.absorb(Bucket::new(3, 15, Red));
        assert_eq!(a.main_key(), 3);
        assert_eq!(a.keys().iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn adjacency_requires_matching_label() {
        let a = Bucket::new(1, 5, Red);
        let b = Bucket::new(2, 10, Red);
        let c = Bucket::new(2, 10, White);
        let d = Bucket::new(3, 15, Red);
        assert!(a.adjacent(&b));
        assert!(b.adjacent(&a));
        assert!(!a.adjacent(&c));
        assert!(!a.adjacent(&d));
    }

    #[test]
    fn zero_width_is_rejected() {
        assert_eq!(cluster(runs(&[(Red, 4)]), 0), Err(ClusterError::ZeroBucketWidth));
    }

    #[test]
    fn empty_line_yields_no_regions() {
        let regions = cluster(Vec::new(), 5).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn equal_centroids_tie_break_on_leftmost_column() {
        let list = RegionList::from_regions(vec![
            Region {
                label: White,
                centroid: 10.0,
                first_column: 8,
                last_column: 12,
                columns: 5,
                keys: vec![2],
            },
            Region {
                label: Red,
                centroid: 10.0,
                first_column: 5,
                last_column: 15,
                columns: 2,
                keys: vec![1],
            },
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].label, Red);
    }
}
