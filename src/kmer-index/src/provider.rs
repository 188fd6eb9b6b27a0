//! Abstraction over however haplotype sequences are actually fetched (assembly FASTA,
//! pangenome sequence store, ...), so the index builder can be unit-tested against a
//! mock provider instead of real sequence files.

use haplotype_graph::HapId;
use mockall::automock;

// Left as an unconditional #[automock] rather than #[cfg_attr(test, automock)] so that
// MockSequenceProvider stays visible to downstream crates' own test modules.
#[automock]
pub trait SequenceProvider: Send + Sync {
    /// Return the full nucleotide sequence for `hap_id`. Lowercase/masked bases are
    /// acceptable; non-ACGT bytes are handled by [`genome::split_acgt_runs`] downstream.
    fn sequence(&self, hap_id: &HapId) -> anyhow::Result<Vec<u8>>;
}
