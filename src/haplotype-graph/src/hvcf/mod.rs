//! Streaming reader for the haplotype-VCF input format (§6 of the engine interfaces):
//! a text format where each record declares haplotype presence at a reference range for
//! one or more sample gametes, the haplotype identifier carried as a symbolic ALT
//! allele, and `##ALT` meta-information lines associating each identifier with its
//! originating sample, gamete index, assembly region and sequence checksum.

pub mod error;
pub use error::HvcfReaderError;

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    sync::Arc,
};

use gzp::{deflate::Bgzf, par::decompress::ParDecompressBuilder};
use log::debug;

use crate::{haplotype::HapId, sample_gamete::SampleGamete};

const VCF_EXT: [&str; 2] = ["vcf", "gz"];

/// Metadata carried by a `##ALT` meta-information line for a given [`HapId`], before
/// its declared region has been resolved to a dense [`genome::RangeId`]. Graph
/// construction converts this into [`crate::haplotype::RawHapIdMetadata`] once ranges have
/// been sorted and assigned identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHapIdMetadata {
    pub sample: Arc<str>,
    pub gamete_index: u8,
    pub contig: Arc<str>,
    pub start: u32,
    pub end: u32,
    pub checksum: Arc<str>,
}

/// One `(contig, start, end, sampleGamete, hapId)` tuple resolved from a haplotype-VCF
/// data line, carrying a reference to the `##ALT` metadata declared for its `hapId`.
#[derive(Debug, Clone)]
pub struct HvcfRecord {
    pub contig: Arc<str>,
    pub start: u32,
    pub end: u32,
    pub sample_gamete: SampleGamete,
    pub hap_id: HapId,
}

/// Streaming reader over one `.vcf` or `.vcf.gz` (BGZF) haplotype-VCF file.
pub struct HvcfReader {
    source: Box<dyn BufRead>,
    path: String,
    samples: Vec<Arc<str>>,
    pub meta: HashMap<HapId, RawHapIdMetadata>,
    line_no: usize,
}

impl HvcfReader {
    /// Open `path` and parse its header, including every `##ALT` meta-information line
    /// preceding the `#CHROM` column header.
    pub fn new(path: &Path, decompression_threads: usize) -> Result<Self, HvcfReaderError> {
        let mut source = Self::open(path, decompression_threads)?;
        let mut meta = HashMap::new();
        let mut samples = Vec::new();
        let mut line_no = 0;
        let mut line = String::new();
        loop {
            line.clear();
            let n = source.read_line(&mut line)?;
            if n == 0 {
                return Err(HvcfReaderError::MissingHeader(path.display().to_string()));
            }
            line_no += 1;
            let line = line.trim_end();
            if let Some(alt_line) = line.strip_prefix("##ALT=<").and_then(|s| s.strip_suffix('>')) {
                let (id, metadata) = Self::parse_alt_meta(alt_line);
                if let (Some(id), Some(metadata)) = (id, metadata) {
                    meta.insert(id, metadata);
                }
                continue;
            }
            if let Some(header) = line.strip_prefix("#CHROM") {
                samples = header
                    .split('\t')
                    .skip(8) // QUAL FILTER INFO FORMAT already consumed by #CHROM...POS...FORMAT cols
                    .map(Arc::from)
                    .collect();
                break;
            }
            // any other `##` meta line is skipped silently.
        }
        debug!("Parsed {} ALT meta-information lines and {} samples from {}", meta.len(), samples.len(), path.display());
        Ok(Self { source, path: path.display().to_string(), samples, meta, line_no })
    }

    fn open(path: &Path, threads: usize) -> Result<Box<dyn BufRead>, HvcfReaderError> {
        let ext = path.extension().and_then(|e| e.to_str())
            .ok_or_else(|| HvcfReaderError::InvalidFileExt(path.display().to_string()))?;
        if !VCF_EXT.contains(&ext) {
            return Err(HvcfReaderError::InvalidFileExt(path.display().to_string()));
        }
        let file = File::open(path)?;
        let source: Box<dyn Read> = match ext {
            "vcf" => Box::new(file),
            "gz" => ParDecompressBuilder::<Bgzf>::new().maybe_num_threads(threads).maybe_par_from_reader(file),
            _ => unreachable!(),
        };
        Ok(Box::new(BufReader::new(source)))
    }

    /// Parse the body of a `##ALT=<...>` line (without the leading `##ALT=<` / trailing `>`).
    fn parse_alt_meta(body: &str) -> (Option<HapId>, Option<RawHapIdMetadata>) {
        let mut id = None;
        let mut sample = None;
        let mut gamete_index = None;
        let mut region = None;
        let mut checksum = None;
        for field in body.split(',') {
            let Some((key, value)) = field.split_once('=') else { continue };
            match key {
                "ID" => id = Some(HapId::new(value)),
                "SampleName" => sample = Some(Arc::<str>::from(value)),
                "GameteIndex" => gamete_index = value.parse::<u8>().ok(),
                "Region" => region = Some(value.to_owned()),
                "Checksum" => checksum = Some(Arc::<str>::from(value)),
                _ => {}
            }
        }
        let region = region.and_then(|r| {
            let (contig, span) = r.split_once(':')?;
            let (start, end) = span.split_once('-')?;
            Some((Arc::<str>::from(contig), start.parse().ok()?, end.parse().ok()?))
        });
        match (sample, gamete_index, region, checksum) {
            (Some(sample), Some(gamete_index), Some((contig, start, end)), Some(checksum)) => {
                (id.clone(), Some(RawHapIdMetadata { sample, gamete_index, contig, start, end, checksum }))
            }
            _ => (None, None),
        }
    }

    /// Parse the next data line, returning every `(sampleGamete, hapId)` assignment it
    /// declares. Returns `Ok(None)` at end of file.
    pub fn next_records(&mut self) -> Result<Option<Vec<HvcfRecord>>, HvcfReaderError> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.source.read_line(&mut line)?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            return self.parse_data_line(line).map(Some);
        }
    }

    fn parse_data_line(&self, line: &str) -> Result<Vec<HvcfRecord>, HvcfReaderError> {
        let path = || self.path.clone();
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 9 {
            return Err(HvcfReaderError::TooFewColumns { path: path(), line: self.line_no, found: cols.len() });
        }
        let contig: Arc<str> = Arc::from(cols[0]);
        let pos: u32 = cols[1].parse()?;
        let start = pos - 1;
        let end = cols[7]
            .split(';')
            .find_map(|kv| kv.strip_prefix("END="))
            .map(str::parse::<u32>)
            .transpose()?
            .ok_or_else(|| HvcfReaderError::MissingEnd { path: path(), line: self.line_no })?;

        let alts: Vec<HapId> = cols[4]
            .split(',')
            .map(|alt| {
                alt.strip_prefix('<').and_then(|a| a.strip_suffix('>'))
                    .map(HapId::new)
                    .ok_or_else(|| HvcfReaderError::MalformedAlt { path: path(), line: self.line_no, alt: alt.to_owned() })
            })
            .collect::<Result<_, _>>()?;

        let format: Vec<&str> = cols[8].split(':').collect();
        if format.first() != Some(&"GT") {
            return Err(HvcfReaderError::MissingGtFormat { path: path(), line: self.line_no });
        }

        let mut records = Vec::new();
        for (sample, gt_field) in self.samples.iter().zip(cols[9..].iter()) {
            let gt = gt_field.split(':').next().unwrap_or(".");
            for (gamete_index, allele) in gt.split(['|', '/']).enumerate() {
                let allele = allele.trim();
                if allele.is_empty() || allele == "." || allele == "0" {
                    continue;
                }
                let idx: usize = allele.parse().map_err(|_| HvcfReaderError::GenotypeOutOfRange {
                    path: path(), line: self.line_no, sample: sample.to_string(), gt: gt.to_owned(), idx: 0, n_alts: alts.len(),
                })?;
                let hap_id = alts.get(idx - 1).cloned().ok_or_else(|| HvcfReaderError::GenotypeOutOfRange {
                    path: path(), line: self.line_no, sample: sample.to_string(), gt: gt.to_owned(), idx, n_alts: alts.len(),
                })?;
                records.push(HvcfRecord {
                    contig: contig.clone(),
                    start,
                    end,
                    sample_gamete: SampleGamete::new(sample.clone(), gamete_index as u8),
                    hap_id,
                });
            }
        }
        Ok(records)
    }
}
