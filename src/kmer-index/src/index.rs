//! The two-level k-mer index: a flat `kmer -> list<(range, offset)>` lookup table
//! shared across the whole graph, and a per-range haplotype-membership matrix addressed
//! by that `offset`. A k-mer that genuinely occurs in more than one reference range
//! appears once per range it's found in; disambiguating which range a given *read*
//! actually belongs to is the read-mapper's job (its single-range-restriction filter),
//! not this index's.

use std::{
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use ahash::AHashMap;
use bv::BitVec;
use genome::RangeId;
use itertools::Itertools;
use log::{info, warn};

use crate::error::KmerIndexError;

/// One range's haplotype-membership matrix: `rows[offset]` is a bitset over the range's
/// local haplotype indices (see [`haplotype_graph::HaplotypeGraph::haplotypes_at`]).
/// Many k-mers within a range share the same haplotype-set, so the set itself is stored
/// once per distinct pattern in `rows`, and `kmer_offsets` maps each surviving k-mer to
/// the row that describes it -- the two-level encoding §3/§4.C is named after.
#[derive(Debug, Clone)]
pub struct RangeKmerTable {
    pub range: RangeId,
    /// Distinct haplotype-set rows observed at this range; every row has popcount >= 1
    /// and no two rows are equal.
    pub rows: Vec<BitVec<u64>>,
    /// `(kmer, offset into rows)`, sorted ascending by kmer hash.
    pub kmer_offsets: Vec<(u64, u32)>,
    pub n_haplotypes: usize,
}

impl RangeKmerTable {
    #[must_use]
    pub fn offset_of(&self, kmer: u64) -> Option<usize> {
        self.kmer_offsets.binary_search_by_key(&kmer, |&(k, _)| k).ok().map(|i| self.kmer_offsets[i].1 as usize)
    }

    #[must_use]
    pub fn haplotype_set(&self, offset: usize) -> Option<&BitVec<u64>> {
        self.rows.get(offset)
    }

    /// Every surviving k-mer hash, in ascending order.
    pub fn kmers(&self) -> impl Iterator<Item = u64> + '_ {
        self.kmer_offsets.iter().map(|&(k, _)| k)
    }

    /// Drop any row no longer referenced by a surviving k-mer, remapping offsets in
    /// place. Called after k-mers are removed (e.g. cross-range collision pruning) so
    /// row storage doesn't accumulate dead entries.
    pub fn prune_unused_rows(&mut self) {
        let mut used = vec![false; self.rows.len()];
        for &(_, offset) in &self.kmer_offsets {
            used[offset as usize] = true;
        }
        let mut remap = vec![0u32; self.rows.len()];
        let mut new_rows = Vec::with_capacity(self.rows.len());
        for (old_offset, &keep) in used.iter().enumerate() {
            if keep {
                remap[old_offset] = new_rows.len() as u32;
                new_rows.push(self.rows[old_offset].clone());
            }
        }
        for (_, offset) in &mut self.kmer_offsets {
            *offset = remap[*offset as usize];
        }
        self.rows = new_rows;
    }
}

/// The full index: a global kmer lookup plus one [`RangeKmerTable`] per range.
#[derive(Debug, Default)]
pub struct KmerIndex {
    lookup: AHashMap<u64, Vec<RangeId>>,
    tables: Vec<RangeKmerTable>,
}

impl KmerIndex {
    #[must_use]
    pub fn from_tables(tables: Vec<RangeKmerTable>) -> Self {
        let mut lookup: AHashMap<u64, Vec<RangeId>> = AHashMap::with_capacity(tables.iter().map(|t| t.kmer_offsets.len()).sum());
        for table in &tables {
            for kmer in table.kmers() {
                lookup.entry(kmer).or_default().push(table.range);
            }
        }
        Self { lookup, tables }
    }

    /// Resolve a canonical k-mer hash to every range that contains it. Usually a
    /// single-element slice, but a k-mer genuinely shared by more than one range's
    /// sequence resolves to all of them; an unknown k-mer resolves to an empty slice.
    #[must_use]
    pub fn locate(&self, kmer: u64) -> &[RangeId] {
        self.lookup.get(&kmer).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn table(&self, range: RangeId) -> Option<&RangeKmerTable> {
        self.tables.get(range.0 as usize)
    }

    #[must_use]
    pub fn range_count(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn kmer_count(&self) -> usize {
        self.lookup.len()
    }

    /// Serialize the index as one record per range, matching §6's three-line-group
    /// contract: a header line naming the range and its dimensions, a comma-separated
    /// line of the range's *distinct* haplotype-set rows (each a binary digit string,
    /// MSB-first over `n_haplotypes` bits -- one entry per row, not per k-mer), and a
    /// comma-separated line of `hash@offset` pairs, `hash` the canonical k-mer as
    /// decimal, `offset` the row index that k-mer resolves to.
    pub fn write_to(&self, path: &Path) -> Result<(), KmerIndexError> {
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        for table in &self.tables {
            writeln!(writer, ">{}\t{}\t{}", table.range, table.n_haplotypes, table.rows.len())?;
            writeln!(
                writer,
                "{}",
                table.rows.iter().map(|row| (0..table.n_haplotypes as u64).map(|i| u64::from(row.get(i))).join("")).join(",")
            )?;
            writeln!(writer, "{}", table.kmer_offsets.iter().map(|(kmer, offset)| format!("{kmer}@{offset}")).join(","))?;
        }
        info!(
            "Wrote kmer index ({} ranges, {} kmers, {} distinct rows) to {}",
            self.tables.len(),
            self.kmer_count(),
            self.tables.iter().map(|t| t.rows.len()).sum::<usize>(),
            path.display()
        );
        Ok(())
    }

    /// Parse an index previously written by [`KmerIndex::write_to`].
    pub fn read_from(path: &Path) -> Result<Self, KmerIndexError> {
        let file = std::fs::File::open(path)?;
        Self::read(BufReader::new(file), &path.display().to_string())
    }

    fn read<R: Read>(reader: BufReader<R>, path: &str) -> Result<Self, KmerIndexError> {
        let mut lines = reader.lines();
        let mut tables = Vec::new();
        let mut line_no = 0;
        loop {
            let Some(header) = lines.next() else { break };
            let header = header?;
            line_no += 1;
            if header.is_empty() {
                continue;
            }
            let header = header.strip_prefix('>').ok_or_else(|| KmerIndexError::MalformedRecord {
                path: path.to_owned(), line: line_no, reason: "expected '>' header line".into(),
            })?;
            let (range_str, n_hap_str, _n_rows_str) = header
                .splitn(3, '\t')
                .collect_tuple()
                .ok_or_else(|| KmerIndexError::MalformedRecord { path: path.to_owned(), line: line_no, reason: "malformed header".into() })?;
            let range = RangeId(range_str.parse()?);
            let n_haplotypes: usize = n_hap_str.parse()?;

            let rows_line = lines.next().transpose()?.ok_or_else(|| KmerIndexError::MalformedRecord {
                path: path.to_owned(), line: line_no + 1, reason: "missing row-matrix line".into(),
            })?;
            line_no += 1;
            let rows: Vec<BitVec<u64>> = if rows_line.is_empty() {
                Vec::new()
            } else {
                rows_line
                    .split(',')
                    .map(|bits| {
                        let mut row: BitVec<u64> = BitVec::new_fill(false, n_haplotypes as u64);
                        for (i, c) in bits.chars().enumerate() {
                            if c == '1' {
                                row.set(i as u64, true);
                            }
                        }
                        row
                    })
                    .collect()
            };

            let kmers_line = lines.next().transpose()?.ok_or_else(|| KmerIndexError::MalformedRecord {
                path: path.to_owned(), line: line_no + 1, reason: "missing kmer@offset line".into(),
            })?;
            line_no += 1;
            let kmer_offsets: Vec<(u64, u32)> = if kmers_line.is_empty() {
                Vec::new()
            } else {
                kmers_line
                    .split(',')
                    .map(|entry| {
                        let (kmer_str, offset_str) = entry.split_once('@').ok_or_else(|| KmerIndexError::MalformedRecord {
                            path: path.to_owned(), line: line_no, reason: format!("expected 'kmer@offset', got '{entry}'"),
                        })?;
                        let kmer: u64 = kmer_str.parse()?;
                        let offset: u32 = offset_str.parse()?;
                        if offset as usize >= rows.len() {
                            return Err(KmerIndexError::MalformedRecord {
                                path: path.to_owned(), line: line_no, reason: format!("offset {offset} out of range ({} rows)", rows.len()),
                            });
                        }
                        Ok((kmer, offset))
                    })
                    .collect::<Result<_, KmerIndexError>>()?
            };

            tables.push(RangeKmerTable { range, rows, kmer_offsets, n_haplotypes });
        }
        if tables.iter().any(|t| t.kmer_offsets.is_empty()) {
            warn!("{path}: index contains one or more ranges with zero surviving kmers");
        }
        Ok(Self::from_tables(tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table(range: u32) -> RangeKmerTable {
        let mut row0: BitVec<u64> = BitVec::new_fill(false, 3);
        row0.set(0, true);
        row0.set(2, true);
        let mut row1: BitVec<u64> = BitVec::new_fill(false, 3);
        row1.set(1, true);
        // kmers 10 and 30 share the same haplotype-set (row 0); kmer 20 is distinct.
        RangeKmerTable {
            range: RangeId(range),
            rows: vec![row0, row1],
            kmer_offsets: vec![(10, 0), (20, 1), (30, 0)],
            n_haplotypes: 3,
        }
    }

    #[test]
    fn round_trips_through_text_format() {
        let index = KmerIndex::from_tables(vec![sample_table(0), sample_table(1)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.kidx");
        index.write_to(&path).unwrap();
        let reloaded = KmerIndex::read_from(&path).unwrap();
        assert_eq!(reloaded.range_count(), 2);
        assert_eq!(reloaded.kmer_count(), 3); // kmers 10/20/30, each shared across both ranges
        let table = reloaded.table(RangeId(0)).unwrap();
        assert_eq!(table.kmer_offsets, vec![(10, 0), (20, 1), (30, 0)]);
        assert!(table.haplotype_set(0).unwrap().get(0));
        assert!(!table.haplotype_set(0).unwrap().get(1));
        // kmers 10 and 30 resolve to the same distinct row.
        assert_eq!(table.offset_of(10), table.offset_of(30));
    }

    #[test]
    fn locate_resolves_known_kmer() {
        let index = KmerIndex::from_tables(vec![sample_table(5)]);
        assert_eq!(index.locate(10), &[RangeId(5)]);
        assert!(index.locate(999).is_empty());
    }

    /// A k-mer present in more than one range's table must resolve to every one of
    /// them, not just the last one built.
    #[test]
    fn locate_returns_every_range_for_a_shared_kmer() {
        let index = KmerIndex::from_tables(vec![sample_table(0), sample_table(1)]);
        assert_eq!(index.locate(10), &[RangeId(0), RangeId(1)]);
        assert_eq!(index.locate(20), &[RangeId(0), RangeId(1)]);
    }

    #[test]
    fn prune_unused_rows_remaps_offsets() {
        let mut table = sample_table(0);
        table.kmer_offsets.retain(|&(k, _)| k != 20); // drop the only kmer referencing row 1
        table.prune_unused_rows();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.offset_of(10), Some(0));
        assert_eq!(table.offset_of(30), Some(0));
    }
}
