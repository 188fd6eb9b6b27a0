use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("minCoverage must lie in [0, 1], got {0}")]
    InvalidMinCoverage(f64),

    #[error("threads must be at least 1, got {0}")]
    InvalidThreadCount(usize),

    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: String, value: f64 },

    #[error(transparent)]
    ReadMapper(#[from] read_mapper::ReadMapperError),

    #[error(transparent)]
    AncestorSelector(#[from] ancestor_selector::AncestorSelectorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
