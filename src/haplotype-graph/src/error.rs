use thiserror::Error;

use genome::RangeId;

use crate::sample_gamete::SampleGamete;

/// Errors raised while constructing or querying a [`crate::HaplotypeGraph`].
///
/// Follows the error taxonomy of the wider engine: [`GraphError::MalformedInput`] and
/// [`GraphError::InvariantViolation`] are distinguished because the orchestrator treats
/// them differently -- a malformed file aborts the one sample/file involved, while an
/// invariant violation indicates upstream graph corruption and is always fatal.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{path}: malformed haplotype-VCF record at line {line}: {reason}")]
    MalformedInput { path: String, line: usize, reason: String },

    #[error(
        "invariant violation: sample gamete {gamete} maps to multiple haplotypes ({first} and {second}) at range {range}"
    )]
    InvariantViolation { gamete: SampleGamete, range: RangeId, first: String, second: String },

    #[error("invariant violation: reference ranges overlap after sorting ({first} and {second})")]
    OverlappingRanges { first: String, second: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
