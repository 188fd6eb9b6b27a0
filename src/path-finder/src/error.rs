use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathFinderError {
    #[error("ancestor panel is empty -- nothing to find a path over")]
    EmptyPanel,

    #[error("recombination rate must be > 0 and < 1, got {0}")]
    InvalidRecombinationRate(f64),

    #[error("inbreeding coefficient must lie in [0, 1], got {0}")]
    InvalidInbreedingCoefficient(f64),
}
