//! Per-sample pipeline: map reads, prune to a likely-ancestor panel, run the configured
//! Viterbi model, and collect the resulting path. This is §4.D through §4.G wired
//! end-to-end for exactly one sample -- the parts of the orchestrator that actually
//! touch the graph and the index live here; [`crate::run`] only owns the concurrency.

use ahash::AHashMap;
use ancestor_selector::{AncestorSelector, CandidateCoverage, CoverageInput};
use genome::{ReferenceRange, RangeId};
use haplotype_graph::{HaplotypeGraph, SampleGamete};
use kmer_index::KmerIndex;
use path_finder::{DiploidPathFinder, HaploidPathFinder, RangeFilter, RangeObservation};

use crate::{
    config::{OrchestratorConfig, PathType},
    error::OrchestratorError,
    path_output::{PathResult, PathStep},
    sample_job::SampleJob,
};

/// The local haplotype index `gamete` carries at `range`, i.e. its position in
/// [`HaplotypeGraph::haplotypes_at`] -- the same numbering `read_mapper` assigns reads
/// to, since both are built from the same `hap_ids[range]` ordering.
fn local_haplotype_index(graph: &HaplotypeGraph, range: RangeId, gamete: &SampleGamete) -> Option<u32> {
    let hap_id = graph.hap_id_of(range, gamete)?;
    graph.haplotypes_at(range).iter().position(|h| h == hap_id).map(|i| i as u32)
}

fn coverage_input(graph: &HaplotypeGraph, counts: &read_mapper::ReadMappingCounts) -> CoverageInput {
    let range_weights: AHashMap<RangeId, f64> = counts.ranges().map(|r| (r, f64::from(counts.total_reads_at(r)))).collect();

    let candidates: Vec<CandidateCoverage> = graph
        .sample_gametes_in_graph()
        .into_iter()
        .filter_map(|gamete| {
            // Keyed by (range, observed set), not just range: two gametes whose
            // haplotype shows up in different observed sets at the same range must
            // each get marginal credit for their own set's reads, so the sets can't be
            // collapsed into a single per-range weight here.
            let mut coverage: AHashMap<(RangeId, Vec<u32>), f64> = AHashMap::new();
            for range in counts.ranges() {
                let Some(local_hap) = local_haplotype_index(graph, range, &gamete) else { continue };
                let Some(sets) = counts.sets_at(range) else { continue };
                for (set, count) in sets {
                    if set.binary_search(&local_hap).is_ok() {
                        coverage.insert((range, set.clone()), f64::from(*count));
                    }
                }
            }
            (!coverage.is_empty()).then_some(CandidateCoverage { gamete, coverage })
        })
        .collect();

    CoverageInput { range_weights, candidates }
}

fn range_observations(
    graph: &HaplotypeGraph,
    counts: &read_mapper::ReadMappingCounts,
    candidates: &[SampleGamete],
) -> (Vec<RangeObservation>, Vec<ReferenceRange>) {
    let mut observations = Vec::with_capacity(graph.ranges().len());
    let mut ranges = Vec::with_capacity(graph.ranges().len());
    for (idx, range) in graph.ranges().iter().enumerate() {
        let range_id = RangeId(idx as u32);
        let sets = counts.sets_at(range_id).map(|m| m.iter().map(|(set, &c)| (set.clone(), c)).collect()).unwrap_or_default();
        let ancestor_haplotype = candidates.iter().map(|g| local_haplotype_index(graph, range_id, g)).collect();
        observations.push(RangeObservation { range: range_id, sets, ancestor_haplotype });
        ranges.push(*range);
    }
    (observations, ranges)
}

/// Map, prune, and impute a single sample. Returns an empty-steps [`PathResult`] (not
/// an error) whenever no reads mapped at all or no range survives filtering -- the
/// `DegenerateHMM` case.
pub fn impute_sample(
    job: &SampleJob,
    graph: &HaplotypeGraph,
    index: &KmerIndex,
    config: &OrchestratorConfig,
) -> Result<PathResult, OrchestratorError> {
    let counts = match &job.mate2 {
        Some(mate2) => read_mapper::map_paired_end_files(&job.mate1, mate2, index, config.read_mapper, config.decompression_threads)?,
        None => read_mapper::map_single_end_file(&job.mate1, index, config.read_mapper, config.decompression_threads)?,
    };

    if counts.ranges().next().is_none() {
        return Ok(PathResult { sample: job.sample_name.clone(), steps: Vec::new() });
    }

    let candidates: Vec<SampleGamete> = if config.ancestor.use_likely_ancestors {
        let input = coverage_input(graph, &counts);
        let selector = AncestorSelector::new(config.ancestor.max_ancestors, config.ancestor.min_coverage);
        let selection = selector.select(&input)?;
        selection.into_iter().map(|step| step.gamete).collect()
    } else {
        // No pruning: the HMM runs over the full sample-gamete panel.
        graph.sample_gametes_in_graph()
    };
    if candidates.is_empty() {
        return Ok(PathResult { sample: job.sample_name.clone(), steps: Vec::new() });
    }

    let (observations, ranges) = range_observations(graph, &counts, &candidates);
    let filtered = config.filter.apply(&observations, &ranges);
    if filtered.is_empty() {
        return Ok(PathResult { sample: job.sample_name.clone(), steps: Vec::new() });
    }

    let steps = match config.path_type {
        PathType::Haploid => {
            let finder = HaploidPathFinder::new(config.haploid.recombination_rate, config.haploid.prob_correct);
            let path = finder.find_path(&filtered, candidates.len());
            filtered
                .iter()
                .zip(path)
                .map(|(obs, idx)| PathStep::Haploid { range: obs.range, gamete: candidates[idx].clone() })
                .collect()
        }
        PathType::Diploid => {
            let finder =
                DiploidPathFinder::new(config.diploid.recombination_rate, config.diploid.inbreeding_coefficient, config.diploid.prob_correct);
            let path = finder.find_path(&filtered, candidates.len());
            filtered
                .iter()
                .zip(path)
                .map(|(obs, (i, j))| PathStep::Diploid { range: obs.range, gamete1: candidates[i].clone(), gamete2: candidates[j].clone() })
                .collect()
        }
    };

    Ok(PathResult { sample: job.sample_name.clone(), steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bv::BitVec;
    use kmer_index::RangeKmerTable;
    use std::io::Write as _;

    fn write_hvcf(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const TWO_SAMPLE_HVCF: &str = "\
##ALT=<ID=hapX,SampleName=donorX,GameteIndex=0,Region=1:0-1000,Checksum=abc>
##ALT=<ID=hapY,SampleName=donorY,GameteIndex=0,Region=1:0-1000,Checksum=def>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tdonorX\tdonorY
1\t1\t.\tN\t<hapX>,<hapY>\t.\tPASS\tEND=1000\tGT\t1|1\t2|2
";

    fn index_for_single_range(n_haplotypes: u64, kmer: u64, member: u64) -> KmerIndex {
        let mut row: BitVec<u64> = BitVec::new_fill(false, n_haplotypes);
        row.set(member, true);
        let table = RangeKmerTable { range: RangeId(0), rows: vec![row], kmer_offsets: vec![(kmer, 0)], n_haplotypes: n_haplotypes as usize };
        KmerIndex::from_tables(vec![table])
    }

    #[test]
    fn empty_reads_yield_empty_path_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let hvcf_path = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let graph = HaplotypeGraph::build(&[hvcf_path], 1).unwrap();
        let index = index_for_single_range(2, 123, 0);

        let reads_path = dir.path().join("empty.fastq");
        std::fs::write(&reads_path, "").unwrap();

        let job = SampleJob::single_end("unknown", reads_path);
        let config = OrchestratorConfig {
            threads: 1,
            decompression_threads: 1,
            output_dir: dir.path().to_path_buf(),
            read_mapper: read_mapper::ReadMapperConfig::default(),
            ancestor: crate::config::AncestorParams::default(),
            filter: RangeFilter::default(),
            path_type: PathType::Haploid,
            haploid: crate::config::HaploidParams::default(),
            diploid: crate::config::DiploidParams::default(),
        };
        let result = impute_sample(&job, &graph, &index, &config).unwrap();
        assert!(result.steps.is_empty());
    }

    /// An index whose single stored k-mer is the real canonical hash of `seq` -- unlike
    /// [`index_for_single_range`]'s arbitrary numeric k-mer, this lets a test feed `seq`
    /// through an actual FASTQ file and have it resolve.
    fn index_from_real_kmer(seq: &[u8], n_haplotypes: u64, member: u64) -> KmerIndex {
        let (_, kmer) = kmer_index::canonical_kmers(seq)[0];
        let mut row: BitVec<u64> = BitVec::new_fill(false, n_haplotypes);
        row.set(member, true);
        let table = RangeKmerTable { range: RangeId(0), rows: vec![row], kmer_offsets: vec![(kmer, 0)], n_haplotypes: n_haplotypes as usize };
        KmerIndex::from_tables(vec![table])
    }

    #[test]
    fn use_likely_ancestors_false_runs_over_full_gamete_panel() {
        let dir = tempfile::tempdir().unwrap();
        let hvcf_path = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let graph = HaplotypeGraph::build(&[hvcf_path], 1).unwrap();
        let seq = vec![b'A'; 40];
        let index = index_from_real_kmer(&seq, 2, 0);

        let reads_path = dir.path().join("reads.fastq");
        let fastq = format!("@r1\n{}\n+\n{}\n", std::str::from_utf8(&seq).unwrap(), "I".repeat(seq.len()));
        std::fs::write(&reads_path, fastq).unwrap();

        let job = SampleJob::single_end("donorX", reads_path);
        let config = OrchestratorConfig {
            threads: 1,
            decompression_threads: 1,
            output_dir: dir.path().to_path_buf(),
            read_mapper: read_mapper::ReadMapperConfig::default(),
            ancestor: crate::config::AncestorParams { use_likely_ancestors: false, max_ancestors: 1, min_coverage: 1.0 },
            filter: RangeFilter::default(),
            path_type: PathType::Haploid,
            haploid: crate::config::HaploidParams::default(),
            diploid: crate::config::DiploidParams::default(),
        };
        let result = impute_sample(&job, &graph, &index, &config).unwrap();
        // No pruning happened, so the panel is every sample gamete in the graph (4:
        // donorX/donorY each carry two gametes), not the ancestor-selector's
        // max_ancestors=1 cap -- the reads still resolve to donorX's haplotype.
        assert_eq!(result.steps.len(), 1);
        assert!(matches!(&result.steps[0], PathStep::Haploid { gamete, .. } if gamete.sample.as_ref() == "donorX"));
    }

    #[test]
    fn local_haplotype_index_matches_graph_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let hvcf_path = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let graph = HaplotypeGraph::build(&[hvcf_path], 1).unwrap();
        let donor_x = SampleGamete::new("donorX", 0);
        let idx = local_haplotype_index(&graph, RangeId(0), &donor_x).unwrap();
        assert_eq!(graph.haplotypes_at(RangeId(0))[idx as usize], *graph.hap_id_of(RangeId(0), &donor_x).unwrap());
    }
}
