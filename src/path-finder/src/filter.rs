//! Pre-Viterbi filtering of per-range read-support observations. Ranges that carry too
//! little signal (or whose signal is too dense to be informative, or whose ancestors are
//! indistinguishable at that range) are dropped before the HMM ever sees them -- this
//! keeps a handful of noisy ranges from dragging down confidently-supported neighbours.

use genome::ReferenceRange;

use crate::haploid::RangeObservation;

#[derive(Debug, Clone, Copy)]
pub struct RangeFilter {
    /// Drop ranges with fewer than this many total supporting reads.
    pub min_reads_per_range: u64,
    /// Drop ranges whose read depth per kilobase exceeds this (likely repetitive /
    /// multi-mapping region rather than informative signal).
    pub max_reads_per_kb: f64,
    /// Drop ranges where every candidate ancestor has an identical support count --
    /// such a range cannot discriminate between ancestors.
    pub remove_equal: bool,
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self { min_reads_per_range: 1, max_reads_per_kb: f64::INFINITY, remove_equal: false }
    }
}

impl RangeFilter {
    fn keep(&self, obs: &RangeObservation, range: &ReferenceRange) -> bool {
        let total = obs.total_reads();
        if total < self.min_reads_per_range {
            return false;
        }
        let kb = f64::from(range.len()) / 1000.0;
        if kb > 0.0 && total as f64 / kb > self.max_reads_per_kb {
            return false;
        }
        if self.remove_equal && obs.ancestor_haplotype.len() > 1 {
            let per_ancestor: Vec<u64> =
                obs.ancestor_haplotype.iter().map(|h| h.map_or(0, |hap| obs.contains_count(hap))).collect();
            if per_ancestor.iter().all(|&c| c == per_ancestor[0]) {
                return false;
            }
        }
        true
    }

    /// Apply the filter, returning only the observations (and their corresponding
    /// ranges, in lockstep) that pass. `observations` and `ranges` must be the same
    /// length and in the same order.
    #[must_use]
    pub fn apply(&self, observations: &[RangeObservation], ranges: &[ReferenceRange]) -> Vec<RangeObservation> {
        observations
            .iter()
            .zip(ranges)
            .filter(|(obs, range)| self.keep(obs, range))
            .map(|(obs, _)| obs.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::{ContigId, RangeId};

    fn range(len: u32) -> ReferenceRange {
        ReferenceRange::new(ContigId(0), 0, len).unwrap()
    }

    fn obs(sets: &[(&[u32], u32)], ancestor_haplotype: &[Option<u32>]) -> RangeObservation {
        RangeObservation {
            range: RangeId(0),
            sets: sets.iter().map(|&(s, c)| (s.to_vec(), c)).collect(),
            ancestor_haplotype: ancestor_haplotype.to_vec(),
        }
    }

    #[test]
    fn drops_ranges_below_min_reads() {
        let filter = RangeFilter { min_reads_per_range: 10, ..RangeFilter::default() };
        let observations = vec![obs(&[(&[0], 2), (&[1], 1)], &[Some(0), Some(1)]), obs(&[(&[0], 8), (&[1], 8)], &[Some(0), Some(1)])];
        let ranges = vec![range(1000), range(1000)];
        let kept = filter.apply(&observations, &ranges);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].total_reads(), 16);
    }

    #[test]
    fn drops_ranges_above_density_cap() {
        let filter = RangeFilter { max_reads_per_kb: 5.0, ..RangeFilter::default() };
        let observations = vec![obs(&[(&[0], 100), (&[1], 100)], &[Some(0), Some(1)])];
        let ranges = vec![range(1000)];
        assert!(filter.apply(&observations, &ranges).is_empty());
    }

    #[test]
    fn remove_equal_drops_uninformative_ranges() {
        let filter = RangeFilter { remove_equal: true, ..RangeFilter::default() };
        let observations = vec![
            obs(&[(&[0, 1, 2], 5)], &[Some(0), Some(1), Some(2)]),
            obs(&[(&[0], 5), (&[1], 3), (&[2], 2)], &[Some(0), Some(1), Some(2)]),
        ];
        let ranges = vec![range(1000), range(1000)];
        let kept = filter.apply(&observations, &ranges);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].contains_count(0), 5);
    }

    #[test]
    fn default_filter_keeps_everything_with_at_least_one_read() {
        let filter = RangeFilter::default();
        let observations = vec![obs(&[], &[Some(0), Some(1)]), obs(&[(&[0], 1)], &[Some(0), Some(1)])];
        let ranges = vec![range(1000), range(1000)];
        assert_eq!(filter.apply(&observations, &ranges).len(), 1);
    }
}
