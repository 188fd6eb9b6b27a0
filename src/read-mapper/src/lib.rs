//! Streams reads from FASTQ input and maps them against a [`kmer_index::KmerIndex`],
//! accumulating per-range observed haplotype-set counts.

pub mod error;
pub use error::ReadMapperError;

pub mod reader;
pub use reader::FastqReader;

pub mod mapper;
pub use mapper::{ReadMapper, ReadMapperConfig, ReadMappingCounts};

use std::{path::Path, thread};

use crossbeam_channel::bounded;
use kmer_index::KmerIndex;
use log::info;

const CHANNEL_CAPACITY: usize = 4096;

/// Stream every read in `path` through a [`ReadMapper`] built over `index`, returning
/// the accumulated [`ReadMappingCounts`].
///
/// Reading runs on its own thread and feeds sequences through a bounded channel to the
/// calling thread, which does the (CPU-bound) k-mer lookup and vote accumulation --
/// the same read-ahead split the rest of the workspace uses to keep I/O wait off the
/// hot path.
pub fn map_single_end_file(
    path: &Path,
    index: &KmerIndex,
    config: ReadMapperConfig,
    decompression_threads: usize,
) -> Result<ReadMappingCounts, ReadMapperError> {
    let (tx, rx) = bounded::<Vec<u8>>(CHANNEL_CAPACITY);
    let path_owned = path.to_path_buf();
    let producer = thread::spawn(move || -> Result<(), ReadMapperError> {
        let mut reader = FastqReader::new(&path_owned, decompression_threads)?;
        while let Some(seq) = reader.next_sequence()? {
            if tx.send(seq).is_err() {
                break;
            }
        }
        Ok(())
    });

    let mapper = ReadMapper::new(index, config);
    let mut counts = ReadMappingCounts::new();
    let mut n_reads = 0usize;
    for seq in rx {
        mapper.map_single(&seq, &mut counts);
        n_reads += 1;
    }
    producer.join().expect("fastq reader thread panicked")?;
    info!("Mapped {n_reads} reads from {}", path.display());
    Ok(counts)
}

/// Same as [`map_single_end_file`] but for a paired-end run: mates are read from two
/// files in lockstep and only jointly-supported haplotypes are counted.
pub fn map_paired_end_files(
    mate1_path: &Path,
    mate2_path: &Path,
    index: &KmerIndex,
    config: ReadMapperConfig,
    decompression_threads: usize,
) -> Result<ReadMappingCounts, ReadMapperError> {
    let mut reader1 = FastqReader::new(mate1_path, decompression_threads)?;
    let mut reader2 = FastqReader::new(mate2_path, decompression_threads)?;
    let mapper = ReadMapper::new(index, config);
    let mut counts = ReadMappingCounts::new();
    let mut n_pairs = 0usize;
    loop {
        match (reader1.next_sequence()?, reader2.next_sequence()?) {
            (Some(mate1), Some(mate2)) => {
                mapper.map_pair(&mate1, &mate2, &mut counts);
                n_pairs += 1;
            }
            _ => break,
        }
    }
    info!("Mapped {n_pairs} read pairs from {} / {}", mate1_path.display(), mate2_path.display());
    Ok(counts)
}
