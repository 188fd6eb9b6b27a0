use std::{
    fmt::{self, Display, Formatter},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

mod error;
pub use error::ContigTableError;

use located_error::prelude::*;
use log::debug;

/// Dense, zero-based identifier of a contig (chromosome / scaffold) within a [`ContigTable`].
///
/// Unlike a human reference, plant pangenomes commonly mix numbered chromosomes with
/// named scaffolds, so contigs are interned by name rather than parsed as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContigId(pub u32);

impl Display for ContigId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for ContigId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Interning table assigning a dense [`ContigId`] to each contig name, in the order the
/// contigs are meant to sort in. This mirrors a FASTA `.fai` index: the file order *is*
/// the reference order used to total-order [`crate::ReferenceRange`]s.
#[derive(Debug, Clone, Default)]
pub struct ContigTable {
    names: Vec<String>,
}

impl ContigTable {
    #[must_use]
    pub fn new() -> Self {
        Self { names: Vec::new() }
    }

    /// Build a table from an ordered slice of contig names. Order of appearance fixes
    /// the sort order of the resulting [`ContigId`]s.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for name in names {
            table.intern(&name.into());
        }
        table
    }

    /// Parse a `.fai`-style contig index: one `<name>\t<length>` pair per line. Only the
    /// name column is consulted; line order establishes the reference order.
    pub fn from_fai(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_loc(|| format!("Failed to open contig index {}", path.display()))?;
        let mut table = Self::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|err| ContigTableError::ParseLine { idx, err })?;
            let Some(name) = line.split('\t').next() else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            table.intern(name);
        }
        debug!("Interned {} contigs from {}", table.names.len(), path.display());
        Ok(table)
    }

    /// Return the [`ContigId`] for `name`, interning it (assigning the next dense id) if
    /// this is the first time it is seen.
    pub fn intern(&mut self, name: &str) -> ContigId {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            return ContigId(pos as u32);
        }
        self.names.push(name.to_owned());
        ContigId((self.names.len() - 1) as u32)
    }

    /// Look up a previously-interned contig without registering it.
    pub fn get(&self, name: &str) -> Result<ContigId, ContigTableError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|pos| ContigId(pos as u32))
            .ok_or_else(|| ContigTableError::UnknownContig(name.to_owned()))
    }

    #[must_use]
    pub fn name(&self, id: ContigId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_dense() {
        let mut table = ContigTable::new();
        let a = table.intern("scaffold_7");
        let b = table.intern("1");
        let a_again = table.intern("scaffold_7");
        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(a), Some("scaffold_7"));
    }

    #[test]
    fn unknown_contig_errors() {
        let table = ContigTable::from_names(["1", "2"]);
        assert!(table.get("3").is_err());
        assert_eq!(table.get("1").unwrap(), ContigId(0));
    }
}
