//! Root crate wiring the workspace's library components into the two commands the
//! binary exposes: building a k-mer index, and imputing sample paths against one.
//!
//! The core algorithms (graph construction, index building, read mapping, ancestor
//! selection, path-finding, orchestration) live in their own workspace crates; this
//! crate only owns the command-line surface and the FASTA-backed [`SequenceProvider`]
//! that supplies haplotype sequences to the index builder.

pub mod cli;
pub mod fasta;

use located_error::prelude::*;

use cli::{BuildIndexArgs, ImputeArgs};
use fasta::FastaSequenceProvider;
use haplotype_graph::HaplotypeGraph;
use kmer_index::{KmerIndex, KmerIndexBuilder};

/// Build a graph from `args.hvcf`, a FASTA-backed sequence provider from `args.fasta`,
/// and write the resulting index to `args.output`.
pub fn build_index(args: &BuildIndexArgs) -> Result<()> {
    let graph = HaplotypeGraph::build(&args.hvcf, args.decompression_threads).with_loc(|| "Failed to build haplotype graph")?;
    let provider = FastaSequenceProvider::load(&args.fasta).with_loc(|| "Failed to load FASTA sequences")?;

    let builder = KmerIndexBuilder {
        max_haplotype_proportion: args.max_haplotype_proportion,
        hash_mask: args.hash_mask,
        hash_filter_value: args.hash_filter_value,
    };
    let index = builder.build(&graph, &provider).with_loc(|| "Failed to build kmer index")?;
    index.write_to(&args.output).with_loc(|| format!("Failed to write kmer index to {}", args.output.display()))?;
    Ok(())
}

/// Build the graph named by `args.hvcf`, load the index at `args.index`, and run every
/// `--sample` job through the orchestrator.
pub fn impute(args: &ImputeArgs) -> Result<()> {
    let graph = HaplotypeGraph::build(&args.hvcf, args.decompression_threads).with_loc(|| "Failed to build haplotype graph")?;
    let index = KmerIndex::read_from(&args.index).with_loc(|| format!("Failed to read kmer index from {}", args.index.display()))?;

    let jobs = args
        .samples
        .iter()
        .map(|spec| cli::parse_sample_job(spec))
        .collect::<Result<Vec<_>>>()
        .with_loc(|| "Failed to parse --sample arguments")?;

    let config = args.orchestrator_config();
    let results = orchestrator::run(jobs, &graph, &index, &config).with_loc(|| "Orchestrator run failed")?;
    log::info!("Imputed {} sample(s) into {}", results.len(), args.output_dir.display());
    Ok(())
}
