//! The pangenome haplotype graph: reference ranges, the haplotypes observed at each,
//! and which sample gamete carries which haplotype.

pub mod error;
pub use error::GraphError;

pub mod sample_gamete;
pub use sample_gamete::SampleGamete;

pub mod haplotype;
pub use haplotype::{HapId, HapIdMetadata};

pub mod hvcf;
pub use hvcf::{HvcfReader, HvcfReaderError, HvcfRecord};

pub mod graph;
pub use graph::HaplotypeGraph;
