//! Viterbi path-finding over a fixed ancestor panel: given per-range read-support
//! counts against each ancestor, recover the most likely sequence of ancestor
//! haplotypes (haploid) or ancestor pairs (diploid) a sample was imputed from.

pub mod diploid;
pub mod emission;
pub mod error;
pub mod filter;
pub mod haploid;

pub use diploid::DiploidPathFinder;
pub use emission::{ln_binomial_coeff, ln_binomial_pmf, ln_factorial, ln_multinomial_pmf, log_sum_exp};
pub use error::PathFinderError;
pub use filter::RangeFilter;
pub use haploid::{HaploidPathFinder, RangeObservation};
