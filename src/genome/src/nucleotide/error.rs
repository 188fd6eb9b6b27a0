use thiserror::Error;

#[derive(Error, Debug)]
#[error("'{0}' is not a valid ACGT nucleotide")]
pub struct ParseBaseError(pub char);
