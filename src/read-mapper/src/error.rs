use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadMapperError {
    #[error("{0}: missing or unrecognized file extension (expected .fastq or .fastq.gz)")]
    InvalidFileExt(String),

    #[error("{path}:{line}: truncated FASTQ record (expected 4 lines per record)")]
    TruncatedRecord { path: String, line: usize },

    #[error("{path}:{line}: FASTQ record is missing its '@' header marker")]
    MissingHeaderMarker { path: String, line: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
