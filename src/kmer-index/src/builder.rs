//! Builds a [`KmerIndex`] from a [`HaplotypeGraph`] and a [`SequenceProvider`].
//!
//! Construction runs one [`rayon`] task per range: each extracts every canonical 32-mer
//! from every haplotype sequence observed at that range, drops k-mers seen in more than
//! `max_haplotype_proportion` of the range's haplotypes (uninformative for
//! discriminating between them), and optionally subsamples the surviving set via a
//! `hash & hash_mask == hash_filter_value` predicate. A k-mer that genuinely occurs in
//! more than one range's table is kept in each -- resolving that ambiguity per read is
//! the read-mapper's single-range-restriction filter's job, not the index's.

use ahash::AHashMap;
use bv::BitVec;
use genome::split_acgt_runs;
use haplotype_graph::HaplotypeGraph;
use log::info;
use rayon::prelude::*;

use crate::{
    error::KmerIndexError,
    hash::{canonical_kmers, K},
    index::{KmerIndex, RangeKmerTable},
    provider::SequenceProvider,
};

/// Minimum contiguous ACGT run length worth hashing; anything shorter can't contain a
/// full k-mer.
const MIN_RUN_LEN: usize = K - 1;

pub struct KmerIndexBuilder {
    /// K-mers present in more than this fraction of a range's haplotypes are dropped:
    /// they are shared by nearly everyone and carry little discriminating power.
    pub max_haplotype_proportion: f64,
    /// Optional subsampling filter: a k-mer survives only if `kmer & hash_mask ==
    /// hash_filter_value`. `None` disables subsampling (every surviving k-mer is kept).
    pub hash_mask: Option<u64>,
    pub hash_filter_value: u64,
}

impl Default for KmerIndexBuilder {
    fn default() -> Self {
        Self { max_haplotype_proportion: 1.0, hash_mask: None, hash_filter_value: 0 }
    }
}

impl KmerIndexBuilder {
    fn passes_subsample(&self, kmer: u64) -> bool {
        match self.hash_mask {
            Some(mask) => (kmer & mask) == self.hash_filter_value,
            None => true,
        }
    }

    pub fn build(&self, graph: &HaplotypeGraph, provider: &dyn SequenceProvider) -> Result<KmerIndex, KmerIndexError> {
        let ranges = graph.ranges();
        let mut tables: Vec<Result<RangeKmerTable, KmerIndexError>> = (0..ranges.len())
            .into_par_iter()
            .map(|idx| self.build_range(graph, provider, genome::RangeId(idx as u32)))
            .collect();

        let mut built = Vec::with_capacity(tables.len());
        for result in tables.drain(..) {
            built.push(result?);
        }

        info!(
            "Built kmer index over {} ranges, {} total surviving kmers",
            built.len(),
            built.iter().map(|t| t.kmer_offsets.len()).sum::<usize>()
        );
        Ok(KmerIndex::from_tables(built))
    }

    fn build_range(
        &self,
        graph: &HaplotypeGraph,
        provider: &dyn SequenceProvider,
        range: genome::RangeId,
    ) -> Result<RangeKmerTable, KmerIndexError> {
        let hap_ids = graph.haplotypes_at(range);
        let n_haplotypes = hap_ids.len();
        let mut membership: AHashMap<u64, BitVec<u64>> = AHashMap::new();

        for (local_idx, hap_id) in hap_ids.iter().enumerate() {
            let sequence = provider
                .sequence(hap_id)
                .map_err(|e| KmerIndexError::SequenceUnavailable { hap_id: hap_id.to_string(), reason: e.to_string() })?;
            for run in split_acgt_runs(&sequence, MIN_RUN_LEN) {
                for (_, kmer) in canonical_kmers(run) {
                    if !self.passes_subsample(kmer) {
                        continue;
                    }
                    membership
                        .entry(kmer)
                        .or_insert_with(|| BitVec::new_fill(false, n_haplotypes as u64))
                        .set(local_idx as u64, true);
                }
            }
        }

        let max_count = (self.max_haplotype_proportion * n_haplotypes as f64).floor() as u64;
        let mut kmers: Vec<(u64, BitVec<u64>)> = membership
            .into_iter()
            .filter(|(_, row)| {
                let count = (0..n_haplotypes as u64).filter(|&i| row.get(i)).count() as u64;
                count >= 1 && (self.max_haplotype_proportion >= 1.0 || count <= max_count.max(1))
            })
            .collect();
        kmers.sort_unstable_by_key(|&(k, _)| k);

        // Deduplicate haplotype-sets: the same row pattern recurs across many kmers
        // within a range, so it is stored once and addressed by offset (§3/§4.C).
        let mut rows: Vec<BitVec<u64>> = Vec::new();
        let mut row_offsets: AHashMap<Vec<bool>, u32> = AHashMap::new();
        let mut kmer_offsets: Vec<(u64, u32)> = Vec::with_capacity(kmers.len());
        for (kmer, row) in kmers {
            let key: Vec<bool> = (0..n_haplotypes as u64).map(|i| row.get(i)).collect();
            let offset = *row_offsets.entry(key).or_insert_with(|| {
                rows.push(row);
                (rows.len() - 1) as u32
            });
            kmer_offsets.push((kmer, offset));
        }
        Ok(RangeKmerTable { range, rows, kmer_offsets, n_haplotypes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haplotype_graph::HapId;
    use std::io::Write as _;

    fn graph_with_two_haplotypes() -> (HaplotypeGraph, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.vcf");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "##ALT=<ID=hap1,SampleName=sampleA,GameteIndex=0,Region=1:0-1000,Checksum=abc>\n\
             ##ALT=<ID=hap2,SampleName=sampleB,GameteIndex=0,Region=1:0-1000,Checksum=def>\n\
             #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsampleA\tsampleB\n\
             1\t1\t.\tN\t<hap1>,<hap2>\t.\tPASS\tEND=1000\tGT\t1\t2\n"
        )
        .unwrap();
        (HaplotypeGraph::build(&[path], 1).unwrap(), dir)
    }

    struct FixedProvider;
    impl SequenceProvider for FixedProvider {
        fn sequence(&self, hap_id: &HapId) -> anyhow::Result<Vec<u8>> {
            Ok(match hap_id.as_str() {
                "hap1" => b"A".repeat(40),
                "hap2" => {
                    let mut seq = b"A".repeat(35);
                    seq.extend_from_slice(b"CCCCC");
                    seq
                }
                other => anyhow::bail!("unknown haplotype {other}"),
            })
        }
    }

    #[test]
    fn builds_shared_and_unique_kmers() {
        let (graph, _dir) = graph_with_two_haplotypes();
        let builder = KmerIndexBuilder::default();
        let index = builder.build(&graph, &FixedProvider).unwrap();
        assert_eq!(index.range_count(), 1);
        let table = index.table(genome::RangeId(0)).unwrap();
        assert!(!table.kmer_offsets.is_empty());
        // the all-A kmer is shared by both haplotypes.
        let first_kmer = table.kmer_offsets[0].0;
        let shared_row = &table.rows[table.offset_of(first_kmer).unwrap()];
        assert!(shared_row.get(0) || shared_row.get(1));
    }

    #[test]
    fn distinct_haplotype_sets_are_stored_once() {
        let (graph, _dir) = graph_with_two_haplotypes();
        let builder = KmerIndexBuilder::default();
        let index = builder.build(&graph, &FixedProvider).unwrap();
        let table = index.table(genome::RangeId(0)).unwrap();
        // more kmers share the all-A prefix's row than there are distinct haplotype-set
        // rows: the shared-prefix kmers all collapse onto the same offset.
        assert!(table.kmer_offsets.len() > table.rows.len());
        let mut distinct_offsets: Vec<u32> = table.kmer_offsets.iter().map(|&(_, o)| o).collect();
        distinct_offsets.sort_unstable();
        distinct_offsets.dedup();
        assert_eq!(distinct_offsets.len(), table.rows.len(), "every row must be referenced by at least one kmer");
    }

    fn graph_with_two_ranges_sharing_a_haplotype_sequence() -> (HaplotypeGraph, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.vcf");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "##ALT=<ID=hap1,SampleName=sampleA,GameteIndex=0,Region=1:0-1000,Checksum=abc>\n\
             ##ALT=<ID=hap2,SampleName=sampleA,GameteIndex=0,Region=1:1000-2000,Checksum=def>\n\
             #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsampleA\n\
             1\t1\t.\tN\t<hap1>\t.\tPASS\tEND=1000\tGT\t1\n\
             1\t1001\t.\tN\t<hap2>\t.\tPASS\tEND=2000\tGT\t1\n"
        )
        .unwrap();
        (HaplotypeGraph::build(&[path], 1).unwrap(), dir)
    }

    struct IdenticalAcrossRangesProvider;
    impl SequenceProvider for IdenticalAcrossRangesProvider {
        fn sequence(&self, hap_id: &HapId) -> anyhow::Result<Vec<u8>> {
            match hap_id.as_str() {
                "hap1" | "hap2" => Ok(b"A".repeat(40)),
                other => anyhow::bail!("unknown haplotype {other}"),
            }
        }
    }

    /// A k-mer that genuinely occurs in two distinct ranges' sequences must survive in
    /// both tables, not be discarded as an ambiguous collision.
    #[test]
    fn kmer_shared_across_ranges_survives_in_both_tables() {
        let (graph, _dir) = graph_with_two_ranges_sharing_a_haplotype_sequence();
        let builder = KmerIndexBuilder::default();
        let index = builder.build(&graph, &IdenticalAcrossRangesProvider).unwrap();
        assert_eq!(index.range_count(), 2);

        let table0 = index.table(genome::RangeId(0)).unwrap();
        let table1 = index.table(genome::RangeId(1)).unwrap();
        assert!(!table0.kmer_offsets.is_empty());
        assert!(!table1.kmer_offsets.is_empty());

        let shared_kmer = table0.kmer_offsets[0].0;
        assert!(table1.offset_of(shared_kmer).is_some(), "identical sequence across ranges should produce a shared kmer");
        assert_eq!(index.locate(shared_kmer), &[genome::RangeId(0), genome::RangeId(1)]);
    }

    #[test]
    fn max_haplotype_proportion_drops_universal_kmers() {
        let (graph, _dir) = graph_with_two_haplotypes();
        let builder = KmerIndexBuilder { max_haplotype_proportion: 0.4, ..Default::default() };
        let index = builder.build(&graph, &FixedProvider).unwrap();
        let table = index.table(genome::RangeId(0)).unwrap();
        for row in &table.rows {
            let count = (0..table.n_haplotypes as u64).filter(|&i| row.get(i)).count();
            assert!(count <= 1, "expected universal kmers to be filtered out");
        }
    }
}
