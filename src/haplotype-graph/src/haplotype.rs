use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use genome::RangeId;

/// Stable, content-hash identifier of a haplotype. Two haplotypes with identical
/// sequence at the same reference range share a `HapId` -- the hash is computed
/// upstream (by the provider of the haplotype-VCF) and carried verbatim as the
/// symbolic ALT allele identifier; this type never recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HapId(pub Arc<str>);

impl HapId {
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HapId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for HapId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// File-level metadata associated with a [`HapId`], as declared by the haplotype-VCF's
/// `##ALT` meta-information line that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HapIdMetadata {
    pub sample: Arc<str>,
    pub gamete_index: u8,
    pub range: RangeId,
    pub checksum: Arc<str>,
}
