use thiserror::Error;

#[derive(Error, Debug)]
pub enum HvcfReaderError {
    #[error("{0}: missing or unrecognized file extension (expected .vcf or .vcf.gz)")]
    InvalidFileExt(String),

    #[error("{0}: reached EOF before encountering a '#CHROM' header line")]
    MissingHeader(String),

    #[error("{path}:{line}: expected at least 9 tab-separated columns, found {found}")]
    TooFewColumns { path: String, line: usize, found: usize },

    #[error("{path}:{line}: malformed INFO field, missing END=")]
    MissingEnd { path: String, line: usize },

    #[error("{path}:{line}: malformed ALT field '{alt}'")]
    MalformedAlt { path: String, line: usize, alt: String },

    #[error("{path}:{line}: genotype '{gt}' for sample '{sample}' references ALT index {idx}, but only {n_alts} ALT alleles are declared")]
    GenotypeOutOfRange { path: String, line: usize, sample: String, gt: String, idx: usize, n_alts: usize },

    #[error("{path}:{line}: FORMAT column does not start with GT")]
    MissingGtFormat { path: String, line: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}
