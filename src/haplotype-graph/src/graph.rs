//! The in-memory pangenome haplotype graph: a dense array of reference ranges, each
//! carrying the set of haplotypes observed in it and the sample-gamete assignments to
//! those haplotypes.
//!
//! Construction is parallel over input files: one producer thread per haplotype-VCF
//! feeds parsed records through a bounded channel to a pool of consumer threads, each
//! accumulating into a per-thread staging map keyed by `(contig, start, end)`. A final,
//! single-threaded pass merges the staging maps, sorts the discovered ranges, and only
//! then assigns dense [`RangeId`]s -- mirroring the rest of the workspace's habit of
//! separating "read records" from "assign identifiers" so the parallel phase never has
//! to coordinate on a shared counter.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use ahash::AHashMap;
use crossbeam_channel::bounded;
use genome::{ContigTable, RangeId, ReferenceRange};
use log::{info, warn};

use crate::{
    error::GraphError,
    haplotype::{HapId, HapIdMetadata},
    hvcf::{HvcfReader, HvcfRecord},
    sample_gamete::SampleGamete,
};

/// Channel capacity between producer (file reader) threads and consumer (aggregator)
/// threads. Bounded so a slow consumer applies backpressure to readers instead of the
/// whole input file being buffered in memory.
const CHANNEL_CAPACITY: usize = 4096;

struct RawRange {
    contig: Arc<str>,
    start: u32,
    end: u32,
}

/// The haplotype graph: every reference range known to the pangenome, the haplotypes
/// observed within each, and which sample gamete carries which haplotype.
pub struct HaplotypeGraph {
    contigs: ContigTable,
    ranges: Vec<ReferenceRange>,
    /// `hap_ids[range]` lists the distinct haplotypes observed at that range, in a
    /// stable order used as the haplotype's dense index within the range.
    hap_ids: Vec<Vec<HapId>>,
    /// `assignments[range]` maps each sample gamete present at that range to the index
    /// into `hap_ids[range]` of the haplotype it carries.
    assignments: Vec<AHashMap<SampleGamete, usize>>,
    metadata: HashMap<HapId, HapIdMetadata>,
}

impl HaplotypeGraph {
    /// Build a graph by reading every haplotype-VCF in `paths` in parallel.
    pub fn build(paths: &[PathBuf], decompression_threads: usize) -> Result<Self, GraphError> {
        let (tx, rx) = bounded::<HvcfRecord>(CHANNEL_CAPACITY);
        let (meta_tx, meta_rx) = bounded::<(HapId, crate::hvcf::RawHapIdMetadata)>(CHANNEL_CAPACITY);

        let producers: Vec<PathBuf> = paths.to_vec();
        let producer_handle = thread::spawn(move || -> Result<(), GraphError> {
            for path in producers {
                let mut reader = HvcfReader::new(&path, decompression_threads)
                    .map_err(|e| GraphError::MalformedInput { path: path.display().to_string(), line: 0, reason: e.to_string() })?;
                for (id, meta) in reader.meta.drain() {
                    if meta_tx.send((id, meta)).is_err() {
                        return Ok(());
                    }
                }
                loop {
                    match reader.next_records() {
                        Ok(Some(records)) => {
                            for record in records {
                                if tx.send(record).is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!("{}: {e} -- aborting this file", path.display());
                            break;
                        }
                    }
                }
            }
            Ok(())
        });

        let n_workers = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get).clamp(1, 8);
        let mut worker_handles = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let rx = rx.clone();
            worker_handles.push(thread::spawn(move || -> AHashMap<(Arc<str>, u32, u32), Vec<(SampleGamete, HapId)>> {
                let mut staged: AHashMap<(Arc<str>, u32, u32), Vec<(SampleGamete, HapId)>> = AHashMap::new();
                for record in rx {
                    staged
                        .entry((record.contig, record.start, record.end))
                        .or_default()
                        .push((record.sample_gamete, record.hap_id));
                }
                staged
            }));
        }
        drop(rx);

        let mut metadata_raw: HashMap<HapId, crate::hvcf::RawHapIdMetadata> = HashMap::new();
        for (id, meta) in meta_rx {
            metadata_raw.insert(id, meta);
        }

        producer_handle.join().expect("hvcf producer thread panicked")?;

        let mut merged: AHashMap<(Arc<str>, u32, u32), Vec<(SampleGamete, HapId)>> = AHashMap::new();
        for handle in worker_handles {
            let staged = handle.join().expect("hvcf aggregator thread panicked");
            for (range_key, assignments) in staged {
                merged.entry(range_key).or_default().extend(assignments);
            }
        }

        let mut raw_ranges: Vec<RawRange> = merged
            .keys()
            .map(|(contig, start, end)| RawRange { contig: contig.clone(), start: *start, end: *end })
            .collect();
        raw_ranges.sort_by(|a, b| (a.contig.as_ref(), a.start).cmp(&(b.contig.as_ref(), b.start)));

        let mut contigs = ContigTable::new();
        let mut ranges = Vec::with_capacity(raw_ranges.len());
        for raw in &raw_ranges {
            let contig_id = contigs.intern(&raw.contig);
            let range = ReferenceRange::new(contig_id, raw.start, raw.end)
                .map_err(|e| GraphError::MalformedInput { path: String::new(), line: 0, reason: e.to_string() })?;
            ranges.push(range);
        }
        for pair in ranges.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(GraphError::OverlappingRanges {
                    first: format!("{:?}", pair[0]),
                    second: format!("{:?}", pair[1]),
                });
            }
        }

        let mut hap_ids = Vec::with_capacity(ranges.len());
        let mut assignments = Vec::with_capacity(ranges.len());
        for (range_idx, raw) in raw_ranges.iter().enumerate() {
            let gamete_hap = &merged[&(raw.contig.clone(), raw.start, raw.end)];
            let mut distinct: Vec<HapId> = gamete_hap.iter().map(|(_, h)| h.clone()).collect();
            distinct.sort();
            distinct.dedup();
            let index_of: AHashMap<HapId, usize> = distinct.iter().cloned().enumerate().map(|(i, h)| (h, i)).collect();

            let mut range_assignments: AHashMap<SampleGamete, usize> = AHashMap::new();
            for (gamete, hap_id) in gamete_hap {
                let idx = index_of[hap_id];
                if let Some(&prev) = range_assignments.get(gamete) {
                    if prev != idx {
                        return Err(GraphError::InvariantViolation {
                            gamete: gamete.clone(),
                            range: RangeId(u32::try_from(range_idx).unwrap_or(u32::MAX)),
                            first: distinct[prev].to_string(),
                            second: distinct[idx].to_string(),
                        });
                    }
                } else {
                    range_assignments.insert(gamete.clone(), idx);
                }
            }
            hap_ids.push(distinct);
            assignments.push(range_assignments);
        }

        let mut metadata = HashMap::with_capacity(metadata_raw.len());
        for (id, raw) in metadata_raw {
            let Some(contig_id) = Some(contigs.intern(&raw.contig)) else { continue };
            metadata.insert(
                id,
                HapIdMetadata {
                    sample: raw.sample,
                    gamete_index: raw.gamete_index,
                    range: RangeId(
                        u32::try_from(
                            ranges
                                .iter()
                                .position(|r| r.contig == contig_id && r.start == raw.start && r.end == raw.end)
                                .unwrap_or(0),
                        )
                        .unwrap_or(0),
                    ),
                    checksum: raw.checksum,
                },
            );
        }

        info!("Built haplotype graph: {} ranges, {} distinct haplotypes total", ranges.len(), hap_ids.iter().map(Vec::len).sum::<usize>());

        Ok(Self { contigs, ranges, hap_ids, assignments, metadata })
    }

    #[must_use]
    pub fn ranges(&self) -> &[ReferenceRange] {
        &self.ranges
    }

    #[must_use]
    pub fn contigs(&self) -> &ContigTable {
        &self.contigs
    }

    #[must_use]
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// All distinct haplotypes observed at `range`, in their dense local order.
    #[must_use]
    pub fn haplotypes_at(&self, range: RangeId) -> &[HapId] {
        &self.hap_ids[range.0 as usize]
    }

    /// The haplotype that `gamete` carries at `range`, if the graph has an assignment
    /// for it (the sample may simply not be genotyped at that range).
    #[must_use]
    pub fn hap_id_of(&self, range: RangeId, gamete: &SampleGamete) -> Option<&HapId> {
        let idx = *self.assignments[range.0 as usize].get(gamete)?;
        self.hap_ids[range.0 as usize].get(idx)
    }

    /// Every sample gamete assigned a haplotype at `range`.
    pub fn sample_gametes_at(&self, range: RangeId) -> impl Iterator<Item = &SampleGamete> {
        self.assignments[range.0 as usize].keys()
    }

    /// The full set of sample gametes known anywhere in the graph.
    #[must_use]
    pub fn sample_gametes_in_graph(&self) -> Vec<SampleGamete> {
        let mut all: Vec<SampleGamete> = self.assignments.iter().flat_map(AHashMap::keys).cloned().collect();
        all.sort();
        all.dedup();
        all
    }

    #[must_use]
    pub fn metadata(&self, hap_id: &HapId) -> Option<&HapIdMetadata> {
        self.metadata.get(hap_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_hvcf(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const TWO_SAMPLE_HVCF: &str = "\
##ALT=<ID=hap1,SampleName=sampleA,GameteIndex=0,Region=1:0-1000,Checksum=abc>
##ALT=<ID=hap2,SampleName=sampleB,GameteIndex=0,Region=1:0-1000,Checksum=def>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsampleA\tsampleB
1\t1\t.\tN\t<hap1>,<hap2>\t.\tPASS\tEND=1000\tGT\t1|1\t2|2
";

    #[test]
    fn builds_graph_from_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let graph = HaplotypeGraph::build(&[path], 1).unwrap();
        assert_eq!(graph.range_count(), 1);
        let range = graph.ranges()[0];
        assert_eq!(graph.haplotypes_at(RangeId(0)).len(), 2);
        let a0 = SampleGamete::new("sampleA", 0);
        assert!(graph.hap_id_of(RangeId(0), &a0).is_some());
        let _ = range;
    }

    #[test]
    fn merges_ranges_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = write_hvcf(dir.path(), "a.vcf", TWO_SAMPLE_HVCF);
        let other = TWO_SAMPLE_HVCF
            .replace("sampleA", "sampleC")
            .replace("sampleB", "sampleD")
            .replace("hap1", "hap3")
            .replace("hap2", "hap4");
        let p2 = write_hvcf(dir.path(), "b.vcf", &other);
        let graph = HaplotypeGraph::build(&[p1, p2], 1).unwrap();
        assert_eq!(graph.range_count(), 1);
        assert_eq!(graph.sample_gametes_at(RangeId(0)).count(), 4);
    }
}
