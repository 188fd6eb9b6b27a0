//! Greedy weighted set-cover selection of a small ancestor/parent panel per sample.

pub mod error;
pub use error::AncestorSelectorError;

pub mod selector;
pub use selector::{AncestorSelector, CandidateCoverage, CoverageInput, SelectionStep};
