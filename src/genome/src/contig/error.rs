use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContigTableError {
    #[error("Contig '{0}' is not registered in this table")]
    UnknownContig(String),

    #[error("{path}: {err}")]
    FileNotFound { path: String, err: String },

    #[error("At line {idx}: Failed to parse contig table line - got [{err}]")]
    ParseLine { idx: usize, err: std::io::Error },
}
