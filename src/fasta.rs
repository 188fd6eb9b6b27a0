//! A simple in-memory multi-FASTA [`SequenceProvider`]: every record is read once at
//! startup and indexed by its header token, which the haplotype-VCF is expected to
//! carry verbatim as the `hapId`. This is the default stand-in for the external
//! compressed-genome store the core leaves pluggable; a deployment backed by a real
//! sequence archive can swap in its own `SequenceProvider` without touching the index
//! builder.

use std::{collections::HashMap, fs::File, io::{BufRead, BufReader}, path::Path};

use haplotype_graph::HapId;
use kmer_index::SequenceProvider;
use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FastaError {
    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("{0}: record '{1}' has no sequence lines")]
    EmptyRecord(String, String),
}

/// Every haplotype sequence named in a set of FASTA files, held entirely in memory.
pub struct FastaSequenceProvider {
    sequences: HashMap<String, Vec<u8>>,
}

impl FastaSequenceProvider {
    /// Read every record in every file of `paths`, keyed by the first whitespace-
    /// delimited token of its `>` header line. A `hapId` present in more than one file
    /// keeps the sequence from whichever file is read last.
    pub fn load(paths: &[impl AsRef<Path>]) -> Result<Self, FastaError> {
        let mut sequences = HashMap::new();
        for path in paths {
            let path = path.as_ref();
            let file = File::open(path).map_err(|e| FastaError::Io(path.display().to_string(), e))?;
            let reader = BufReader::new(file);

            let mut current: Option<String> = None;
            let mut buffer = Vec::new();
            for line in reader.lines() {
                let line = line.map_err(|e| FastaError::Io(path.display().to_string(), e))?;
                if let Some(header) = line.strip_prefix('>') {
                    if let Some(id) = current.take() {
                        if buffer.is_empty() {
                            return Err(FastaError::EmptyRecord(path.display().to_string(), id));
                        }
                        sequences.insert(id, std::mem::take(&mut buffer));
                    }
                    current = header.split_whitespace().next().map(str::to_owned);
                } else {
                    buffer.extend_from_slice(line.trim_end().as_bytes());
                }
            }
            if let Some(id) = current {
                if buffer.is_empty() {
                    return Err(FastaError::EmptyRecord(path.display().to_string(), id));
                }
                sequences.insert(id, buffer);
            }
            info!("Loaded FASTA sequences from {}", path.display());
        }
        Ok(Self { sequences })
    }
}

impl SequenceProvider for FastaSequenceProvider {
    fn sequence(&self, hap_id: &HapId) -> anyhow::Result<Vec<u8>> {
        self.sequences
            .get(hap_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no FASTA record found for haplotype '{hap_id}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_fasta(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_multi_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(&dir, "a.fasta", ">hap1 extra annotation\nACGT\nACGT\n>hap2\nTTTT\n");
        let provider = FastaSequenceProvider::load(&[path]).unwrap();
        assert_eq!(provider.sequence(&HapId::new("hap1")).unwrap(), b"ACGTACGT");
        assert_eq!(provider.sequence(&HapId::new("hap2")).unwrap(), b"TTTT");
    }

    #[test]
    fn missing_haplotype_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(&dir, "a.fasta", ">hap1\nACGT\n");
        let provider = FastaSequenceProvider::load(&[path]).unwrap();
        assert!(provider.sequence(&HapId::new("nope")).is_err());
    }
}
