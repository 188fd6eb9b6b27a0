//! Fans samples out to a bounded pool of worker threads that each run the
//! map-prune-impute pipeline (§4.D-G) independently, then serializes completed paths to
//! disk from a single sink thread.
//!
//! Canonical producer/worker/sink topology: one thread feeds [`SampleJob`]s into a
//! bounded channel, `threads` workers drain it and push [`PathResult`]s onto a second
//! bounded channel, and the calling thread drains that one and writes files -- the same
//! split [`haplotype_graph::HaplotypeGraph::build`] uses for parsing, just one level up.
//! `HaplotypeGraph` and `KmerIndex` are shared read-only across every worker via
//! ordinary borrows inside [`std::thread::scope`]; no `Arc` or lock is needed since
//! nothing mutates them after construction.

pub mod config;
pub use config::{AncestorParams, DiploidParams, HaploidParams, OrchestratorConfig, PathType};

pub mod error;
pub use error::OrchestratorError;

pub mod path_output;
pub use path_output::{PathResult, PathStep};

pub mod pipeline;
pub use pipeline::impute_sample;

pub mod sample_job;
pub use sample_job::SampleJob;

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::bounded;
use haplotype_graph::HaplotypeGraph;
use kmer_index::KmerIndex;
use log::{info, warn};

/// Bounded channel capacity between the job producer and workers, and between workers
/// and the sink -- kept small and equal per the orchestrator's own design notes.
const CHANNEL_CAPACITY: usize = 10;

/// Run every job in `jobs` to completion, skipping any whose output file already
/// exists in `config.output_dir` (idempotent re-runs). Returns the results that were
/// actually computed and written this call, in completion order (not input order).
pub fn run(jobs: Vec<SampleJob>, graph: &HaplotypeGraph, index: &KmerIndex, config: &OrchestratorConfig) -> Result<Vec<PathResult>, OrchestratorError> {
    run_cancellable(jobs, graph, index, config, &AtomicBool::new(false))
}

/// Same as [`run`], but a worker checks `cancel` between samples and a producer checks
/// it between jobs, so setting it from another thread stops new work from starting
/// without severing in-flight samples.
pub fn run_cancellable(
    jobs: Vec<SampleJob>,
    graph: &HaplotypeGraph,
    index: &KmerIndex,
    config: &OrchestratorConfig,
    cancel: &AtomicBool,
) -> Result<Vec<PathResult>, OrchestratorError> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let (job_tx, job_rx) = bounded::<SampleJob>(CHANNEL_CAPACITY);
    let (result_tx, result_rx) = bounded::<PathResult>(CHANNEL_CAPACITY);
    let mut results = Vec::new();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            for job in jobs {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let out_path = config.output_dir.join(format!("{}.path.tsv", job.sample_name));
                if out_path.exists() {
                    info!("Skipping {}: output already exists", job.sample_name);
                    continue;
                }
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        });

        for _ in 0..config.threads {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for job in job_rx {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    match impute_sample(&job, graph, index, config) {
                        Ok(result) => {
                            if result_tx.send(result).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("sample {}: {e} -- aborting this sample", job.sample_name),
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        for result in result_rx {
            let out_path = config.output_dir.join(format!("{}.path.tsv", result.sample));
            match result.write(&out_path) {
                Ok(()) => {
                    info!("Wrote path for {} ({} ranges)", result.sample, result.steps.len());
                    results.push(result);
                }
                Err(e) => warn!("failed to write path for {}: {e}", result.sample),
            }
        }
    });

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::RangeId;
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

    fn default_config(output_dir: std::path::PathBuf) -> OrchestratorConfig {
        OrchestratorConfig {
            threads: 2,
            decompression_threads: 1,
            output_dir,
            read_mapper: read_mapper::ReadMapperConfig::default(),
            ancestor: AncestorParams::default(),
            filter: path_finder::RangeFilter::default(),
            path_type: PathType::Haploid,
            haploid: HaploidParams::default(),
            diploid: DiploidParams::default(),
        }
    }

    #[test]
    fn skips_samples_whose_output_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let hvcf_path = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let graph = HaplotypeGraph::build(&[hvcf_path], 1).unwrap();

        let mut row: bv::BitVec<u64> = bv::BitVec::new_fill(false, 2);
        row.set(0, true);
        let table = kmer_index::RangeKmerTable { range: RangeId(0), rows: vec![row], kmer_offsets: vec![(1, 0)], n_haplotypes: 2 };
        let index = kmer_index::KmerIndex::from_tables(vec![table]);

        let config = default_config(dir.path().to_path_buf());
        std::fs::write(dir.path().join("already-done.path.tsv"), "#sample=already-done\n").unwrap();

        let reads_path = dir.path().join("reads.fastq");
        std::fs::write(&reads_path, "").unwrap();
        let jobs = vec![SampleJob::single_end("already-done", reads_path)];

        let results = run(jobs, &graph, &index, &config).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn unmapped_sample_writes_empty_path_file() {
        let dir = tempfile::tempdir().unwrap();
        let hvcf_path = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let graph = HaplotypeGraph::build(&[hvcf_path], 1).unwrap();

        let mut row: bv::BitVec<u64> = bv::BitVec::new_fill(false, 2);
        row.set(0, true);
        let table = kmer_index::RangeKmerTable { range: RangeId(0), rows: vec![row], kmer_offsets: vec![(1, 0)], n_haplotypes: 2 };
        let index = kmer_index::KmerIndex::from_tables(vec![table]);

        let config = default_config(dir.path().to_path_buf());
        let reads_path = dir.path().join("reads.fastq");
        std::fs::write(&reads_path, "").unwrap();
        let jobs = vec![SampleJob::single_end("newsample", reads_path)];

        let results = run(jobs, &graph, &index, &config).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].steps.is_empty());
        assert!(dir.path().join("newsample.path.tsv").exists());
    }
}
