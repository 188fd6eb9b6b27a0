//! Per-sample imputed path: the inferred ancestor (haploid) or ancestor pair (diploid)
//! at every reference range that survived filtering, in reference order.

use std::{
    io::{BufWriter, Write},
    path::Path,
};

use genome::RangeId;
use haplotype_graph::SampleGamete;

use crate::error::OrchestratorError;

#[derive(Debug, Clone)]
pub enum PathStep {
    Haploid { range: RangeId, gamete: SampleGamete },
    Diploid { range: RangeId, gamete1: SampleGamete, gamete2: SampleGamete },
}

#[derive(Debug, Clone)]
pub struct PathResult {
    pub sample: String,
    pub steps: Vec<PathStep>,
}

impl PathResult {
    /// Write this result as a small tab-separated file: a `#sample=` / `#pathType=`
    /// header pair, then one row per retained range. An empty `steps` list (the
    /// degenerate-HMM case -- no range survived filtering) still writes a well-formed,
    /// header-only file so downstream consumers can tell "not imputed" from "missing".
    pub fn write(&self, path: &Path) -> Result<(), OrchestratorError> {
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        let path_type = match self.steps.first() {
            Some(PathStep::Diploid { .. }) => "diploid",
            _ => "haploid",
        };
        writeln!(writer, "#sample={}", self.sample)?;
        writeln!(writer, "#pathType={path_type}")?;
        match path_type {
            "diploid" => writeln!(writer, "range\tgamete1\tgamete2")?,
            _ => writeln!(writer, "range\tgamete")?,
        }
        for step in &self.steps {
            match step {
                PathStep::Haploid { range, gamete } => writeln!(writer, "{range}\t{gamete}")?,
                PathStep::Diploid { range, gamete1, gamete2 } => writeln!(writer, "{range}\t{gamete1}\t{gamete2}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_empty_path_as_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampleA.path.tsv");
        let result = PathResult { sample: "sampleA".into(), steps: vec![] };
        result.write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("#sample=sampleA"));
        assert!(contents.contains("range\tgamete"));
    }

    #[test]
    fn writes_haploid_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampleA.path.tsv");
        let result = PathResult {
            sample: "sampleA".into(),
            steps: vec![
                PathStep::Haploid { range: RangeId(0), gamete: SampleGamete::new("donorX", 0) },
                PathStep::Haploid { range: RangeId(1), gamete: SampleGamete::new("donorY", 0) },
            ],
        };
        result.write(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[3], "0\tdonorX:0");
        assert_eq!(lines[4], "1\tdonorY:0");
    }
}
