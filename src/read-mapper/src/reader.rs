//! Minimal streaming FASTQ reader: only the sequence line of each record is retained,
//! since the mapper never inspects base qualities.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use gzp::{deflate::Bgzf, par::decompress::ParDecompressBuilder};

use crate::error::ReadMapperError;

const FASTQ_EXT: [&str; 2] = ["fastq", "gz"];

pub struct FastqReader {
    source: Box<dyn BufRead>,
    path: String,
    line_no: usize,
}

impl FastqReader {
    pub fn new(path: &Path, decompression_threads: usize) -> Result<Self, ReadMapperError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ReadMapperError::InvalidFileExt(path.display().to_string()))?;
        if !FASTQ_EXT.contains(&ext) {
            return Err(ReadMapperError::InvalidFileExt(path.display().to_string()));
        }
        let file = File::open(path)?;
        let source: Box<dyn Read> = match ext {
            "fastq" => Box::new(file),
            "gz" => ParDecompressBuilder::<Bgzf>::new().maybe_num_threads(decompression_threads).maybe_par_from_reader(file),
            _ => unreachable!(),
        };
        Ok(Self { source: Box::new(BufReader::new(source)), path: path.display().to_string(), line_no: 0 })
    }

    /// Read the next record's sequence, returning `Ok(None)` at end of file.
    pub fn next_sequence(&mut self) -> Result<Option<Vec<u8>>, ReadMapperError> {
        let mut header = String::new();
        if self.source.read_line(&mut header)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        if !header.starts_with('@') {
            return Err(ReadMapperError::MissingHeaderMarker { path: self.path.clone(), line: self.line_no });
        }

        let mut seq = String::new();
        let mut plus = String::new();
        let mut qual = String::new();
        if self.source.read_line(&mut seq)? == 0
            || self.source.read_line(&mut plus)? == 0
            || self.source.read_line(&mut qual)? == 0
        {
            return Err(ReadMapperError::TruncatedRecord { path: self.path.clone(), line: self.line_no });
        }
        self.line_no += 3;
        Ok(Some(seq.trim_end().as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fastq(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".fastq").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_sequence_lines() {
        let file = write_fastq("@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nTTTTGGGG\n+\nIIIIIIII\n");
        let mut reader = FastqReader::new(file.path(), 1).unwrap();
        assert_eq!(reader.next_sequence().unwrap(), Some(b"ACGTACGT".to_vec()));
        assert_eq!(reader.next_sequence().unwrap(), Some(b"TTTTGGGG".to_vec()));
        assert_eq!(reader.next_sequence().unwrap(), None);
    }

    #[test]
    fn rejects_truncated_record() {
        let file = write_fastq("@r1\nACGTACGT\n+\n");
        let mut reader = FastqReader::new(file.path(), 1).unwrap();
        assert!(reader.next_sequence().is_err());
    }
}
