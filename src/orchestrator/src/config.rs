use std::path::PathBuf;

use path_finder::RangeFilter;
use read_mapper::ReadMapperConfig;

/// Which Viterbi model a run should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    Haploid,
    Diploid,
}

#[derive(Debug, Clone, Copy)]
pub struct HaploidParams {
    pub recombination_rate: f64,
    pub prob_correct: f64,
}

impl Default for HaploidParams {
    fn default() -> Self {
        Self { recombination_rate: 0.01, prob_correct: 0.99 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiploidParams {
    pub recombination_rate: f64,
    pub inbreeding_coefficient: f64,
    pub prob_correct: f64,
}

impl Default for DiploidParams {
    fn default() -> Self {
        Self { recombination_rate: 0.01, inbreeding_coefficient: 0.0, prob_correct: 0.99 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AncestorParams {
    /// When `false`, path-finding runs over every sample gamete in the graph instead of
    /// a pruned panel -- `maxAncestors`/`minCoverage` are then ignored.
    pub use_likely_ancestors: bool,
    pub max_ancestors: usize,
    pub min_coverage: f64,
}

impl Default for AncestorParams {
    fn default() -> Self {
        Self { use_likely_ancestors: true, max_ancestors: 8, min_coverage: 1.0 }
    }
}

/// Every knob the orchestrator needs to drive a full sample run: read mapping, ancestor
/// pruning, range filtering, and which HMM to run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of concurrent sample workers.
    pub threads: usize,
    /// Threads handed to each worker's own FASTQ decompression.
    pub decompression_threads: usize,
    pub output_dir: PathBuf,
    pub read_mapper: ReadMapperConfig,
    pub ancestor: AncestorParams,
    pub filter: RangeFilter,
    pub path_type: PathType,
    pub haploid: HaploidParams,
    pub diploid: DiploidParams,
}

impl OrchestratorConfig {
    /// Configuration values outside their declared ranges are fatal before any work
    /// begins (§7) -- this is the single gate every probability-shaped knob passes
    /// through, regardless of which model it feeds.
    pub fn validate(&self) -> Result<(), crate::error::OrchestratorError> {
        use crate::error::OrchestratorError::{InvalidMinCoverage, InvalidProbability, InvalidThreadCount};

        if self.threads == 0 {
            return Err(InvalidThreadCount(self.threads));
        }
        if !(0.0..=1.0).contains(&self.ancestor.min_coverage) {
            return Err(InvalidMinCoverage(self.ancestor.min_coverage));
        }
        let probabilities: &[(&str, f64)] = &[
            ("probCorrect (haploid)", self.haploid.prob_correct),
            ("recombinationRate (haploid)", self.haploid.recombination_rate),
            ("probCorrect (diploid)", self.diploid.prob_correct),
            ("recombinationRate (diploid)", self.diploid.recombination_rate),
            ("inbreedingCoefficient", self.diploid.inbreeding_coefficient),
            ("minSameReferenceRange", self.read_mapper.min_same_reference_range),
            ("minProportionOfMaxCount", self.read_mapper.min_proportion_of_max_count),
        ];
        for &(name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(InvalidProbability { name: name.to_owned(), value });
            }
        }
        Ok(())
    }
}
