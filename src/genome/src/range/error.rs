use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceRangeError {
    #[error("Reference range {contig}:{start}-{end} is empty or inverted (start >= end)")]
    Inverted { contig: String, start: u32, end: u32 },

    #[error("Reference ranges overlap: {0:?} and {1:?}")]
    Overlapping(String, String),
}
