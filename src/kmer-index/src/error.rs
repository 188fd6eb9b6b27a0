use thiserror::Error;

use genome::RangeId;

#[derive(Error, Debug)]
pub enum KmerIndexError {
    #[error("failed to fetch sequence for haplotype '{hap_id}': {reason}")]
    SequenceUnavailable { hap_id: String, reason: String },

    #[error("range {0} has no surviving haplotypes to index")]
    EmptyRange(RangeId),

    #[error("{path}: {reason}")]
    Serialization { path: String, reason: String },

    #[error("{path}:{line}: malformed kmer-index record: {reason}")]
    MalformedRecord { path: String, line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}
