//! Maps reads to the haplotype sets they support within a single reference range.
//!
//! Every overlapping canonical k-mer of a read is looked up in the [`KmerIndex`], and
//! each haplotype whose bit is set in the decoded row accumulates one vote. Votes are
//! tallied independently per reference range the read's k-mers touch --
//! [`ReadMapper::qualifying_sets`] keeps every such range unless
//! [`ReadMapperConfig::limit_single_ref_range`] restricts the read down to its single
//! best-supported range.
//!
//! Within a surviving range, only haplotypes voted for at least
//! `min_proportion_of_max_count` of the best-voted haplotype's count are kept -- this
//! is the read's final haplotype *set* at that range, and it is this set (not the raw
//! vote tally) that gets folded into [`ReadMappingCounts`], the multiset of observed
//! haplotype sets the rest of the pipeline (ancestor selection, path-finding) consumes.

use std::collections::BTreeSet;

use ahash::AHashMap;
use genome::{split_acgt_runs, RangeId};
use kmer_index::{canonical_kmers, KmerIndex, K};

/// Accumulated read-support counts: for each reference range, a multiset mapping an
/// immutable, sorted list of local haplotype indices (the read's final haplotype set
/// at that range) to the number of reads that produced exactly that set.
#[derive(Debug, Default, Clone)]
pub struct ReadMappingCounts {
    sets: AHashMap<RangeId, AHashMap<Vec<u32>, u32>>,
}

impl ReadMappingCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The observed `(haplotype set -> count)` multiset at `range`, if any read mapped
    /// there.
    #[must_use]
    pub fn sets_at(&self, range: RangeId) -> Option<&AHashMap<Vec<u32>, u32>> {
        self.sets.get(&range)
    }

    #[must_use]
    pub fn total_reads_at(&self, range: RangeId) -> u32 {
        self.sets.get(&range).map_or(0, |sets| sets.values().sum())
    }

    /// Every range with at least one observed haplotype set.
    pub fn ranges(&self) -> impl Iterator<Item = RangeId> + '_ {
        self.sets.keys().copied()
    }

    fn record(&mut self, range: RangeId, mut set: Vec<u32>) {
        set.sort_unstable();
        set.dedup();
        *self.sets.entry(range).or_default().entry(set).or_insert(0) += 1;
    }

    /// Fold another accumulator's counts into this one (used to merge per-worker
    /// partial sums back together after parallel mapping).
    pub fn merge(&mut self, other: &Self) {
        for (&range, other_sets) in &other.sets {
            let entry = self.sets.entry(range).or_default();
            for (set, &count) in other_sets {
                *entry.entry(set.clone()).or_insert(0) += count;
            }
        }
    }
}

/// Per-run configuration for [`ReadMapper`], mirroring the mapping filter knobs of the
/// engine's external configuration surface.
#[derive(Debug, Clone, Copy)]
pub struct ReadMapperConfig {
    /// A haplotype must carry at least this proportion of the best-voted haplotype's
    /// count within a range for a read to count it as supported. Default `1.0`: keep
    /// strictly the argmax set.
    pub min_proportion_of_max_count: f64,
    /// If set, a read whose k-mers resolve to more than one range is kept only when its
    /// best-supported range holds at least `min_same_reference_range` of all its hits;
    /// otherwise the read is dropped rather than spread across several ranges.
    pub limit_single_ref_range: bool,
    pub min_same_reference_range: f64,
}

impl Default for ReadMapperConfig {
    fn default() -> Self {
        Self { min_proportion_of_max_count: 1.0, limit_single_ref_range: false, min_same_reference_range: 0.9 }
    }
}

pub struct ReadMapper<'a> {
    index: &'a KmerIndex,
    config: ReadMapperConfig,
    min_run_len: usize,
}

impl<'a> ReadMapper<'a> {
    #[must_use]
    pub fn new(index: &'a KmerIndex, config: ReadMapperConfig) -> Self {
        Self { index, config, min_run_len: K - 1 }
    }

    /// Per-range, per-haplotype vote tally from every k-mer of `seq` that the index
    /// resolves. A k-mer shared by more than one range contributes a vote in each --
    /// the single-range restriction below (when enabled) is what resolves that
    /// ambiguity per read, not this tally.
    fn hap_votes_per_range(&self, seq: &[u8]) -> AHashMap<RangeId, AHashMap<u32, u32>> {
        let mut hits_per_range: AHashMap<RangeId, AHashMap<u32, u32>> = AHashMap::new();
        for run in split_acgt_runs(seq, self.min_run_len) {
            for (_, kmer) in canonical_kmers(run) {
                for &range in self.index.locate(kmer) {
                    let Some(table) = self.index.table(range) else { continue };
                    let Some(offset) = table.offset_of(kmer) else { continue };
                    let Some(row) = table.haplotype_set(offset) else { continue };
                    let votes = hits_per_range.entry(range).or_default();
                    for i in 0..table.n_haplotypes as u64 {
                        if row.get(i) {
                            *votes.entry(i as u32).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
        hits_per_range
    }

    /// The final, per-range haplotype set(s) a single read (or mate) supports, after
    /// the single-range restriction (if enabled) and the argmax-proportion filter.
    fn qualifying_sets(&self, seq: &[u8]) -> Vec<(RangeId, Vec<u32>)> {
        let mut hits_per_range = self.hap_votes_per_range(seq);
        if self.config.limit_single_ref_range && hits_per_range.len() > 1 {
            let total_hits: u32 = hits_per_range.values().map(|v| v.values().sum::<u32>()).sum();
            let Some((&best_range, best_total)) = hits_per_range
                .iter()
                .map(|(r, v)| (r, v.values().sum::<u32>()))
                .max_by_key(|&(_, total)| total)
            else {
                return Vec::new();
            };
            if total_hits == 0 || f64::from(best_total) / f64::from(total_hits) < self.config.min_same_reference_range {
                return Vec::new();
            }
            hits_per_range.retain(|&r, _| r == best_range);
        }

        hits_per_range
            .into_iter()
            .filter_map(|(range, votes)| {
                let max_vote = *votes.values().max()?;
                let threshold = (f64::from(max_vote) * self.config.min_proportion_of_max_count).ceil() as u32;
                let set: Vec<u32> = votes.into_iter().filter(|&(_, c)| c >= threshold.max(1)).map(|(h, _)| h).collect();
                (!set.is_empty()).then_some((range, set))
            })
            .collect()
    }

    /// Map a single-end read, folding its supported haplotype set(s) into `counts`. A
    /// read none of whose kmers are indexed, or whose surviving set is empty, is
    /// silently dropped.
    pub fn map_single(&self, seq: &[u8], counts: &mut ReadMappingCounts) {
        for (range, set) in self.qualifying_sets(seq) {
            counts.record(range, set);
        }
    }

    /// Map a read pair: each mate independently produces a per-range haplotype set, and
    /// only the ranges both mates agree on contribute, with the folded-in set being the
    /// *intersection* of the two mates' sets. A range whose intersection is empty
    /// contributes nothing.
    pub fn map_pair(&self, mate1: &[u8], mate2: &[u8], counts: &mut ReadMappingCounts) {
        let sets1: AHashMap<RangeId, Vec<u32>> = self.qualifying_sets(mate1).into_iter().collect();
        let sets2: AHashMap<RangeId, Vec<u32>> = self.qualifying_sets(mate2).into_iter().collect();
        for (range, set1) in &sets1 {
            let Some(set2) = sets2.get(range) else { continue };
            let a: BTreeSet<u32> = set1.iter().copied().collect();
            let b: BTreeSet<u32> = set2.iter().copied().collect();
            let intersection: Vec<u32> = a.intersection(&b).copied().collect();
            if !intersection.is_empty() {
                counts.record(*range, intersection);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bv::BitVec;
    use genome::RangeId;
    use kmer_index::{canonical_kmers, RangeKmerTable};

    fn index_from_sequence(seq: &[u8]) -> KmerIndex {
        let kmers = canonical_kmers(seq);
        let mut distinct: Vec<u64> = kmers.iter().map(|(_, k)| *k).collect();
        distinct.sort_unstable();
        distinct.dedup();
        // Every kmer here carries the same (single-haplotype) support, so they all
        // collapse onto one distinct row.
        let mut row: BitVec<u64> = BitVec::new_fill(false, 2);
        row.set(0, true);
        let kmer_offsets = distinct.into_iter().map(|k| (k, 0u32)).collect();
        let table = RangeKmerTable { range: RangeId(0), rows: vec![row], kmer_offsets, n_haplotypes: 2 };
        KmerIndex::from_tables(vec![table])
    }

    #[test]
    fn maps_single_end_read_to_supported_haplotype_set() {
        let seq = vec![b'A'; 40];
        let index = index_from_sequence(&seq);
        let mapper = ReadMapper::new(&index, ReadMapperConfig::default());
        let mut counts = ReadMappingCounts::new();
        mapper.map_single(&seq, &mut counts);
        let sets = counts.sets_at(RangeId(0)).unwrap();
        assert_eq!(sets.get(&vec![0]), Some(&1));
        assert_eq!(counts.total_reads_at(RangeId(0)), 1);
    }

    #[test]
    fn unindexed_read_contributes_nothing() {
        let seq = vec![b'A'; 40];
        let index = index_from_sequence(&seq);
        let mapper = ReadMapper::new(&index, ReadMapperConfig::default());
        let mut counts = ReadMappingCounts::new();
        mapper.map_single(&vec![b'C'; 40], &mut counts);
        assert!(counts.sets_at(RangeId(0)).is_none());
    }

    /// A k-mer genuinely shared by two ranges' tables must contribute a vote in each:
    /// with `limit_single_ref_range` off, a read built entirely from such k-mers
    /// supports both ranges.
    #[test]
    fn kmer_shared_across_ranges_contributes_votes_to_both() {
        let seq = vec![b'A'; 40];
        let kmers = canonical_kmers(&seq);
        let mut distinct: Vec<u64> = kmers.iter().map(|(_, k)| *k).collect();
        distinct.sort_unstable();
        distinct.dedup();
        let mut row: BitVec<u64> = BitVec::new_fill(false, 1);
        row.set(0, true);
        let kmer_offsets: Vec<(u64, u32)> = distinct.into_iter().map(|k| (k, 0u32)).collect();
        let table0 = RangeKmerTable { range: RangeId(0), rows: vec![row.clone()], kmer_offsets: kmer_offsets.clone(), n_haplotypes: 1 };
        let table1 = RangeKmerTable { range: RangeId(1), rows: vec![row], kmer_offsets, n_haplotypes: 1 };
        let index = KmerIndex::from_tables(vec![table0, table1]);

        let mapper = ReadMapper::new(&index, ReadMapperConfig::default());
        let mut counts = ReadMappingCounts::new();
        mapper.map_single(&seq, &mut counts);
        assert_eq!(counts.total_reads_at(RangeId(0)), 1);
        assert_eq!(counts.total_reads_at(RangeId(1)), 1);
    }

    #[test]
    fn paired_reads_intersect_support() {
        let seq = vec![b'A'; 40];
        let index = index_from_sequence(&seq);
        let mapper = ReadMapper::new(&index, ReadMapperConfig::default());
        let mut counts = ReadMappingCounts::new();
        mapper.map_pair(&seq, &seq, &mut counts);
        assert_eq!(counts.total_reads_at(RangeId(0)), 1);
    }

    #[test]
    fn merge_sums_counts_across_workers() {
        let seq = vec![b'A'; 40];
        let index = index_from_sequence(&seq);
        let mapper = ReadMapper::new(&index, ReadMapperConfig::default());
        let mut a = ReadMappingCounts::new();
        let mut b = ReadMappingCounts::new();
        mapper.map_single(&seq, &mut a);
        mapper.map_single(&seq, &mut b);
        a.merge(&b);
        assert_eq!(a.total_reads_at(RangeId(0)), 2);
    }
}
