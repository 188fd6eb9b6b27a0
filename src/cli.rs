//! Command line surface: `build-index` turns a set of haplotype-VCFs and FASTA
//! sequences into a k-mer index file; `impute` fans a batch of samples through the
//! orchestrator against a graph and a previously-built index.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use located_error::prelude::*;
use log::debug;
use orchestrator::{AncestorParams, DiploidParams, HaploidParams, OrchestratorConfig, PathType, SampleJob};
use path_finder::RangeFilter;
use read_mapper::ReadMapperConfig;
use serde::Serialize;

#[derive(Parser, Debug, Serialize)]
#[clap(name = "pangenome-impute", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// Pangenome-impute: k-mer based imputation of haplotype paths over a plant pangenome
pub struct Cli {
    /// Set the verbosity level (-v -vv -vvv)
    #[clap(short = 'v', long, parse(from_occurrences), global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Log the parsed arguments at debug level, mirroring the rest of this workspace's
    /// habit of echoing its own configuration before doing any work.
    pub fn log(&self) {
        debug!("{:#?}", self);
    }

    /// Serialize the parsed arguments to a timestamped `.yaml` file next to whichever
    /// output this invocation produces, so a run can later be reproduced exactly.
    pub fn serialize(&self) -> Result<()> {
        let serialized = serde_yaml::to_string(self).with_loc(|| "Failed to serialize command line arguments")?;
        let current_time = chrono::Local::now().format("%Y-%m-%dT%H%M%S");
        let (dir, name) = match &self.commands {
            Commands::BuildIndex { args } => (args.output.parent().unwrap_or_else(|| std::path::Path::new(".")).to_path_buf(), "build-index"),
            Commands::Impute { args } => (args.output_dir.clone(), "impute"),
        };
        std::fs::create_dir_all(&dir).with_loc(|| format!("Failed to create {}", dir.display()))?;
        let output_file = dir.join(format!("{current_time}-{name}.yaml"));
        std::fs::write(&output_file, serialized).with_loc(|| format!("Failed to write {}", output_file.display()))?;
        Ok(())
    }
}

#[derive(Subcommand, Debug, Serialize)]
pub enum Commands {
    /// Build a k-mer index from one or more haplotype-VCFs and FASTA sequence files.
    BuildIndex {
        #[clap(flatten)]
        args: BuildIndexArgs,
    },
    /// Impute haploid or diploid paths for a batch of samples.
    Impute {
        #[clap(flatten)]
        args: ImputeArgs,
    },
}

#[derive(Parser, Debug, Serialize)]
pub struct BuildIndexArgs {
    /// Haplotype-VCF file(s) describing the pangenome graph.
    #[clap(long, required(true), multiple_values(true))]
    pub hvcf: Vec<PathBuf>,

    /// FASTA file(s) providing the sequence for every `hapId` named in `--hvcf`.
    #[clap(long, required(true), multiple_values(true))]
    pub fasta: Vec<PathBuf>,

    /// Where to write the built index.
    #[clap(short, long)]
    pub output: PathBuf,

    /// Drop kmers present in more than this fraction of a range's haplotypes.
    #[clap(long, default_value("0.75"))]
    pub max_haplotype_proportion: f64,

    /// Keep only kmers whose low bits, masked by this value, equal `--hash-filter-value`.
    #[clap(long)]
    pub hash_mask: Option<u64>,

    #[clap(long, default_value("0"))]
    pub hash_filter_value: u64,

    #[clap(long, default_value("1"))]
    pub decompression_threads: usize,
}

#[derive(Parser, Debug, Serialize)]
pub struct ImputeArgs {
    /// Haplotype-VCF file(s) describing the pangenome graph.
    #[clap(long, required(true), multiple_values(true))]
    pub hvcf: Vec<PathBuf>,

    /// Previously-built k-mer index (see `build-index`).
    #[clap(long)]
    pub index: PathBuf,

    /// One sample name and its read file(s), repeatable: `--sample name:reads.fq` or
    /// `--sample name:mate1.fq:mate2.fq`.
    #[clap(long = "sample", required(true), multiple_values(true))]
    pub samples: Vec<String>,

    #[clap(short, long)]
    pub output_dir: PathBuf,

    #[clap(short, long, default_value("3"))]
    pub threads: usize,

    #[clap(long, default_value("1"))]
    pub decompression_threads: usize,

    #[clap(long, arg_enum, default_value("haploid"))]
    pub path_type: PathTypeArg,

    #[clap(long, default_value("0.01"))]
    pub recombination_rate: f64,

    #[clap(long, default_value("0.0"))]
    pub inbreeding_coefficient: f64,

    #[clap(long, default_value("0.99"))]
    pub prob_correct: f64,

    /// Prune each sample's candidate panel to at most `--max-ancestors` likely
    /// parental gametes before path-finding, instead of running the HMM over every
    /// sample gamete in the graph.
    #[clap(long, default_value("true"))]
    pub use_likely_ancestors: bool,

    #[clap(long, default_value("8"))]
    pub max_ancestors: usize,

    #[clap(long, default_value("1.0"))]
    pub min_coverage: f64,

    #[clap(long, default_value("1"))]
    pub min_reads_per_range: u64,

    #[clap(long, default_value("inf"))]
    pub max_reads_per_kb: f64,

    #[clap(long)]
    pub remove_equal: bool,

    #[clap(long)]
    pub limit_single_ref_range: bool,

    #[clap(long, default_value("0.9"))]
    pub min_same_reference_range: f64,

    #[clap(long, default_value("1.0"))]
    pub min_proportion_of_max_count: f64,
}

#[derive(clap::ArgEnum, Clone, Copy, Debug, Serialize)]
pub enum PathTypeArg {
    Haploid,
    Diploid,
}

impl From<PathTypeArg> for PathType {
    fn from(value: PathTypeArg) -> Self {
        match value {
            PathTypeArg::Haploid => PathType::Haploid,
            PathTypeArg::Diploid => PathType::Diploid,
        }
    }
}

/// Parse `name:reads.fq` or `name:mate1.fq:mate2.fq` into a [`SampleJob`].
pub fn parse_sample_job(spec: &str) -> Result<SampleJob> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| anyhow!("malformed --sample '{spec}': missing name"))?;
    let mate1 = parts.next().ok_or_else(|| anyhow!("malformed --sample '{spec}': missing read file"))?;
    match parts.next() {
        Some(mate2) => Ok(SampleJob::paired_end(name, PathBuf::from(mate1), PathBuf::from(mate2))),
        None => Ok(SampleJob::single_end(name, PathBuf::from(mate1))),
    }
}

impl ImputeArgs {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            threads: self.threads,
            decompression_threads: self.decompression_threads,
            output_dir: self.output_dir.clone(),
            read_mapper: ReadMapperConfig {
                min_proportion_of_max_count: self.min_proportion_of_max_count,
                limit_single_ref_range: self.limit_single_ref_range,
                min_same_reference_range: self.min_same_reference_range,
            },
            ancestor: AncestorParams {
                use_likely_ancestors: self.use_likely_ancestors,
                max_ancestors: self.max_ancestors,
                min_coverage: self.min_coverage,
            },
            filter: RangeFilter {
                min_reads_per_range: self.min_reads_per_range,
                max_reads_per_kb: self.max_reads_per_kb,
                remove_equal: self.remove_equal,
            },
            path_type: self.path_type.into(),
            haploid: HaploidParams { recombination_rate: self.recombination_rate, prob_correct: self.prob_correct },
            diploid: DiploidParams {
                recombination_rate: self.recombination_rate,
                inbreeding_coefficient: self.inbreeding_coefficient,
                prob_correct: self.prob_correct,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_end_sample_spec() {
        let job = parse_sample_job("sampleA:reads.fq").unwrap();
        assert_eq!(job.sample_name, "sampleA");
        assert_eq!(job.mate1, PathBuf::from("reads.fq"));
        assert!(job.mate2.is_none());
    }

    #[test]
    fn parses_paired_end_sample_spec() {
        let job = parse_sample_job("sampleA:m1.fq:m2.fq").unwrap();
        assert_eq!(job.mate1, PathBuf::from("m1.fq"));
        assert_eq!(job.mate2, Some(PathBuf::from("m2.fq")));
    }

    #[test]
    fn rejects_missing_name() {
        assert!(parse_sample_job(":reads.fq").is_err());
    }
}
