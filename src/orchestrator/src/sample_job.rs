use std::path::PathBuf;

/// One sample's read files to be mapped and imputed. `mate2` present means paired-end.
#[derive(Debug, Clone)]
pub struct SampleJob {
    pub sample_name: String,
    pub mate1: PathBuf,
    pub mate2: Option<PathBuf>,
}

impl SampleJob {
    #[must_use]
    pub fn single_end(sample_name: impl Into<String>, reads: PathBuf) -> Self {
        Self { sample_name: sample_name.into(), mate1: reads, mate2: None }
    }

    #[must_use]
    pub fn paired_end(sample_name: impl Into<String>, mate1: PathBuf, mate2: PathBuf) -> Self {
        Self { sample_name: sample_name.into(), mate1, mate2: Some(mate2) }
    }
}
