pub mod contig;
pub use contig::{ContigId, ContigTable};

pub mod range;
pub use range::{RangeIndex, ReferenceRange, ReferenceRangeError, RangeId};

pub mod nucleotide;
pub use nucleotide::{split_acgt_runs, Base};
