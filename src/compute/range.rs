//! Cell-id ranges: merging covering ranges and splitting them per shard.
//!
//! A covering produces one `[range_min, range_max]` interval per covering
//! cell. Adjacent intervals are merged so fewer scans are issued, then every
//! merged interval is cut at shard boundaries because a store query can only
//! target one partition.

use crate::compute::cell::{CellId, ShardKey, shard_bounds, shard_key_of};
use crate::error::{GeoError, Result};
use smallvec::{SmallVec, smallvec};
use std::fmt;

/// Largest gap between two ranges that still merges them.
///
/// Leaf cell ids are odd, so consecutive leaf cells differ by exactly 2. A gap
/// of 2 is only bridged when the single skipped id is even, so merging never
/// adds a leaf cell to the represented set.
pub const MERGE_THRESHOLD: u64 = 2;

/// Closed interval `[min, max]` of cell ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeohashRange {
    min: CellId,
    max: CellId,
}

/// A sub-range that lies entirely inside one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardRange {
    pub shard: ShardKey,
    pub range: GeohashRange,
}

impl GeohashRange {
    /// Create a range, failing with [`GeoError::InvalidRange`] if `min > max`.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoscan::compute::range::GeohashRange;
    ///
    /// let range = GeohashRange::new(11, 19).unwrap();
    /// assert!(range.contains(15));
    /// assert!(GeohashRange::new(19, 11).is_err());
    /// ```
    pub fn new(min: CellId, max: CellId) -> Result<Self> {
        if min > max {
            return Err(GeoError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub(crate) fn new_unchecked(min: CellId, max: CellId) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    pub fn range_min(&self) -> CellId {
        self.min
    }

    pub fn range_max(&self) -> CellId {
        self.max
    }

    #[inline]
    pub fn contains(&self, cell: CellId) -> bool {
        self.min <= cell && cell <= self.max
    }

    /// Whether `other` overlaps this range or lies within [`MERGE_THRESHOLD`] of it.
    pub fn is_mergeable(&self, other: &GeohashRange) -> bool {
        self.reaches(other) && other.reaches(self)
    }

    /// Whether `other` starts no later than the first id this range may absorb.
    fn reaches(&self, other: &GeohashRange) -> bool {
        // An even upper bound means the next id is a leaf.
        let gap = if self.max & 1 == 1 { MERGE_THRESHOLD } else { 1 };
        other.min <= self.max.saturating_add(gap)
    }

    /// Extend this range to the union with `other` if they are mergeable.
    pub fn try_merge(&mut self, other: &GeohashRange) -> bool {
        if !self.is_mergeable(other) {
            return false;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        true
    }

    /// Cut this range at shard boundaries.
    ///
    /// Returns one entry per shard spanned, in ascending order. The pieces are
    /// disjoint and together cover exactly the original range.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoscan::compute::range::GeohashRange;
    ///
    /// // With 2 shard bits each shard spans 2^62 ids.
    /// let boundary = 1u64 << 62;
    /// let range = GeohashRange::new(boundary - 5, boundary + 5).unwrap();
    /// let pieces = range.split_by_shard(2);
    /// assert_eq!(pieces.len(), 2);
    /// assert_eq!(pieces[0].shard, 0);
    /// assert_eq!(pieces[0].range.range_max(), boundary - 1);
    /// assert_eq!(pieces[1].shard, 1);
    /// assert_eq!(pieces[1].range.range_min(), boundary);
    /// ```
    pub fn split_by_shard(&self, hash_key_length: u8) -> SmallVec<[ShardRange; 2]> {
        let first = shard_key_of(self.min, hash_key_length);
        let last = shard_key_of(self.max, hash_key_length);

        if first == last {
            return smallvec![ShardRange {
                shard: first,
                range: *self,
            }];
        }

        let mut pieces = SmallVec::new();
        for shard in first..=last {
            let bounds = shard_bounds(shard, hash_key_length);
            pieces.push(ShardRange {
                shard,
                range: Self::new_unchecked(bounds.min.max(self.min), bounds.max.min(self.max)),
            });
        }
        pieces
    }
}

impl fmt::Display for GeohashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Collapse ranges into a sorted list of non-overlapping, non-adjacent ranges.
///
/// # Examples
///
/// ```
/// use geoscan::compute::range::{GeohashRange, merge_ranges};
///
/// let merged = merge_ranges(vec![
///     GeohashRange::new(21, 25).unwrap(),
///     GeohashRange::new(1, 5).unwrap(),
///     GeohashRange::new(7, 9).unwrap(),
/// ]);
/// assert_eq!(merged, vec![GeohashRange::new(1, 9).unwrap(), GeohashRange::new(21, 25).unwrap()]);
/// ```
pub fn merge_ranges(ranges: impl IntoIterator<Item = GeohashRange>) -> Vec<GeohashRange> {
    let mut sorted: Vec<GeohashRange> = ranges.into_iter().collect();
    sorted.sort_unstable();

    let mut merged: Vec<GeohashRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        let absorbed = merged.last_mut().is_some_and(|last| last.try_merge(&range));
        if !absorbed {
            merged.push(range);
        }
    }
    merged
}

/// Merge `ranges` and split the result per shard: one entry per store scan.
pub fn plan_scans(
    ranges: impl IntoIterator<Item = GeohashRange>,
    hash_key_length: u8,
) -> Vec<ShardRange> {
    merge_ranges(ranges)
        .iter()
        .flat_map(|range| range.split_by_shard(hash_key_length))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: u64, max: u64) -> GeohashRange {
        GeohashRange::new(min, max).unwrap()
    }

    /// All odd ids (valid leaf ids) represented by `ranges` within `[lo, hi]`.
    fn odd_ids(ranges: &[GeohashRange], lo: u64, hi: u64) -> Vec<u64> {
        (lo..=hi)
            .filter(|id| id % 2 == 1 && ranges.iter().any(|r| r.contains(*id)))
            .collect()
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(matches!(
            GeohashRange::new(10, 3),
            Err(GeoError::InvalidRange { min: 10, max: 3 })
        ));
        assert!(GeohashRange::new(7, 7).is_ok());
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_ranges(Vec::new()).is_empty());
        assert!(plan_scans(Vec::new(), 6).is_empty());
    }

    #[test]
    fn test_merge_overlapping_and_adjacent() {
        let merged = merge_ranges(vec![range(1, 5), range(3, 9), range(11, 13), range(17, 19)]);
        assert_eq!(merged, vec![range(1, 13), range(17, 19)]);
    }

    #[test]
    fn test_merge_contained_range() {
        let merged = merge_ranges(vec![range(1, 101), range(31, 41)]);
        assert_eq!(merged, vec![range(1, 101)]);
    }

    #[test]
    fn test_merge_preserves_leaf_ids() {
        let input = vec![
            range(41, 45),
            range(1, 3),
            range(5, 7),
            range(13, 21),
            range(23, 23),
            range(33, 35),
            range(15, 17),
            range(47, 61),
        ];
        let merged = merge_ranges(input.clone());

        assert_eq!(odd_ids(&input, 0, 70), odd_ids(&merged, 0, 70));

        for pair in merged.windows(2) {
            assert!(pair[0].range_max() < pair[1].range_min());
            assert!(!pair[0].is_mergeable(&pair[1]), "{} and {} should have merged", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_merge_does_not_bridge_a_leaf_id() {
        // 5 lies between the ranges and is a leaf id.
        let input = vec![range(2, 4), range(6, 8)];
        let merged = merge_ranges(input.clone());
        assert_eq!(merged, input);
        assert!(!merged.iter().any(|r| r.contains(5)));

        assert_eq!(merge_ranges(vec![range(2, 4), range(5, 8)]), vec![range(2, 8)]);
        assert_eq!(merge_ranges(vec![range(2, 5), range(7, 8)]), vec![range(2, 8)]);
        assert_eq!(odd_ids(&input, 0, 10), odd_ids(&merged, 0, 10));
    }

    #[test]
    fn test_merge_at_upper_end_of_id_space() {
        let merged = merge_ranges(vec![range(u64::MAX - 4, u64::MAX), range(u64::MAX - 9, u64::MAX - 6)]);
        assert_eq!(merged, vec![range(u64::MAX - 9, u64::MAX)]);
    }

    #[test]
    fn test_split_single_shard_unchanged() {
        let r = range(100, 200);
        let pieces = r.split_by_shard(6);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].shard, 0);
        assert_eq!(pieces[0].range, r);
    }

    #[test]
    fn test_split_is_exhaustive_and_disjoint() {
        let shard_span = 1u64 << 58;
        let r = range(shard_span * 3 - 17, shard_span * 6 + 41);
        let pieces = r.split_by_shard(6);

        assert_eq!(pieces.len(), 5);
        assert_eq!(pieces.first().unwrap().range.range_min(), r.range_min());
        assert_eq!(pieces.last().unwrap().range.range_max(), r.range_max());

        for piece in &pieces {
            assert_eq!(shard_key_of(piece.range.range_min(), 6), piece.shard);
            assert_eq!(shard_key_of(piece.range.range_max(), 6), piece.shard);
        }
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].range.range_max() + 1, pair[1].range.range_min());
            assert_eq!(pair[0].shard + 1, pair[1].shard);
        }
    }

    #[test]
    fn test_split_full_id_space() {
        let pieces = range(0, u64::MAX).split_by_shard(3);
        assert_eq!(pieces.len(), 8);
        assert_eq!(pieces[7].range.range_max(), u64::MAX);
    }

    #[test]
    fn test_plan_scans_merges_before_splitting() {
        let shard_span = 1u64 << 58;
        let base = shard_span * 10 + 1;
        // Three adjacent covering ranges inside one shard become one scan.
        let plan = plan_scans(
            vec![range(base, base + 6), range(base + 8, base + 20), range(base + 22, base + 40)],
            6,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].shard, 10);
        assert_eq!(plan[0].range, range(base, base + 40));
    }
}
