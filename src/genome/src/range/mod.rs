use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
};

mod error;
pub use error::ReferenceRangeError;

use rust_lapper::{Interval, Lapper};

use crate::contig::ContigId;

/// Dense, zero-based identifier of a [`ReferenceRange`], assigned in ascending
/// `(contig, start)` order once the full set of ranges for a pangenome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeId(pub u32);

impl Display for RangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for RangeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A half-open interval `[start, end)` on the reference, scoped to a single contig.
///
/// `ReferenceRange`s are meant to be kept in a sorted, non-overlapping collection: their
/// `Ord` implementation compares `(contig, start)` first, which is sufficient to recover
/// a total, reference-consistent order as long as the non-overlap invariant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceRange {
    pub contig: ContigId,
    pub start: u32,
    pub end: u32,
}

impl ReferenceRange {
    /// Construct a new range, rejecting empty or inverted intervals.
    pub fn new(contig: ContigId, start: u32, end: u32) -> Result<Self, ReferenceRangeError> {
        if start >= end {
            return Err(ReferenceRangeError::Inverted { contig: contig.to_string(), start, end });
        }
        Ok(Self { contig, start, end })
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.contig == other.contig && self.start < other.end && other.start < self.end
    }
}

impl PartialOrd for ReferenceRange {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReferenceRange {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.contig, self.start).cmp(&(other.contig, other.start))
    }
}

/// Per-contig interval index over a fixed collection of [`ReferenceRange`]s, used to
/// resolve an arbitrary `(contig, start, end)` input coordinate (e.g. from a haplotype
/// VCF record) back to the [`RangeId`] that contains it.
pub struct RangeIndex {
    lappers: HashMap<ContigId, Lapper<u32, u32>>,
}

impl RangeIndex {
    /// Build an index from a slice of ranges whose position IS their [`RangeId`].
    #[must_use]
    pub fn build(ranges: &[ReferenceRange]) -> Self {
        let mut by_contig: HashMap<ContigId, Vec<Interval<u32, u32>>> = HashMap::new();
        for (idx, range) in ranges.iter().enumerate() {
            by_contig.entry(range.contig).or_default().push(Interval {
                start: range.start,
                stop: range.end,
                val: idx as u32,
            });
        }
        let lappers = by_contig
            .into_iter()
            .map(|(contig, intervals)| (contig, Lapper::new(intervals)))
            .collect();
        Self { lappers }
    }

    /// Return the [`RangeId`] of the (unique, non-overlapping) reference range fully
    /// containing `[start, end)` on `contig`, if any.
    #[must_use]
    pub fn find_containing(&self, contig: ContigId, start: u32, end: u32) -> Option<RangeId> {
        let lapper = self.lappers.get(&contig)?;
        lapper
            .find(start, end)
            .find(|iv| iv.start <= start && end <= iv.stop)
            .map(|iv| RangeId(iv.val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(contig: u32, start: u32, end: u32) -> ReferenceRange {
        ReferenceRange::new(ContigId(contig), start, end).unwrap()
    }

    #[test]
    fn ranges_sort_by_contig_then_start() {
        let mut ranges = vec![range(1, 500, 600), range(0, 100, 200), range(0, 0, 100)];
        ranges.sort();
        assert_eq!(ranges, vec![range(0, 0, 100), range(0, 100, 200), range(1, 500, 600)]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(ReferenceRange::new(ContigId(0), 100, 100).is_err());
        assert!(ReferenceRange::new(ContigId(0), 200, 100).is_err());
    }

    #[test]
    fn index_resolves_containing_range() {
        let ranges = vec![range(0, 0, 100), range(0, 100, 250), range(1, 0, 50)];
        let index = RangeIndex::build(&ranges);
        assert_eq!(index.find_containing(ContigId(0), 10, 90), Some(RangeId(0)));
        assert_eq!(index.find_containing(ContigId(0), 100, 200), Some(RangeId(1)));
        assert_eq!(index.find_containing(ContigId(1), 0, 50), Some(RangeId(2)));
        assert_eq!(index.find_containing(ContigId(0), 90, 150), None);
    }
}
