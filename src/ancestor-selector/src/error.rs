use thiserror::Error;

#[derive(Error, Debug)]
pub enum AncestorSelectorError {
    #[error("coverage universe is empty -- nothing to select ancestors for")]
    EmptyUniverse,

    #[error("minCoverage must lie in [0, 1], got {0}")]
    InvalidMinCoverage(f64),
}
