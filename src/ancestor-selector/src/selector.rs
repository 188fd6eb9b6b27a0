//! Greedy weighted set-cover over reference ranges: pick a small panel of candidate
//! ancestor gametes whose combined read-support explains as much of a sample's observed
//! range coverage as possible.
//!
//! This is the classical greedy approximation to weighted set cover (repeatedly take
//! the set with the largest remaining marginal weight) -- not optimal, but within the
//! usual `ln(n)`-factor bound, and deterministic given a fixed candidate order, which
//! matters here since the panel chosen for one sample feeds directly into path-finder.
//! Coverage weight is the actual read-support a candidate would explain at a range
//! (`cover(g) = sum over observed (range, haplotype set) of its read count, restricted
//! to sets containing g`), not mere presence/absence, so a candidate that is the sole
//! explanation for a deeply-sequenced range outranks one that merely touches many
//! shallow ones.
//!
//! "Covered" is tracked per `(range, haplotype set)` observation, not per range: a
//! range can hold several distinct observed haplotype sets (e.g. two candidates whose
//! local haplotypes never co-occur in the same read), and picking a candidate that
//! explains one set must not zero out the marginal gain of a later candidate that only
//! explains a different set at the same range.

use ahash::{AHashMap, AHashSet};
use genome::RangeId;
use haplotype_graph::SampleGamete;
use itertools::Itertools;

use crate::error::AncestorSelectorError;

/// One candidate ancestor and the weighted read-support it would explain per observed
/// `(range, haplotype set)` if selected, e.g. `coverage[(r, s)]` is the read count of
/// the observation "range `r`, reads resolving to haplotype set `s`", present only
/// when `s` contains this gamete's local haplotype at `r`.
#[derive(Debug, Clone)]
pub struct CandidateCoverage {
    pub gamete: SampleGamete,
    pub coverage: AHashMap<(RangeId, Vec<u32>), f64>,
}

/// The full set-cover problem instance: a weight per range in the universe (the total
/// read support observed there, used to normalize cumulative coverage) and the
/// per-range weighted coverage each candidate ancestor would contribute.
#[derive(Debug, Clone, Default)]
pub struct CoverageInput {
    pub range_weights: AHashMap<RangeId, f64>,
    pub candidates: Vec<CandidateCoverage>,
}

/// One greedy selection step, useful for diagnostics and for testing the diminishing-
/// marginal-gain property of the algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStep {
    pub gamete: SampleGamete,
    pub marginal_gain: f64,
    pub cumulative_coverage: f64,
}

pub struct AncestorSelector {
    pub max_ancestors: usize,
    pub min_coverage: f64,
}

impl AncestorSelector {
    #[must_use]
    pub fn new(max_ancestors: usize, min_coverage: f64) -> Self {
        Self { max_ancestors, min_coverage }
    }

    /// Run the greedy selection, returning each step in the order ancestors were
    /// chosen. Stops once `max_ancestors` have been picked, once `min_coverage` of the
    /// total range weight is covered, or once no remaining candidate offers any
    /// marginal gain (the panel is "dry").
    pub fn select(&self, input: &CoverageInput) -> Result<Vec<SelectionStep>, AncestorSelectorError> {
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(AncestorSelectorError::InvalidMinCoverage(self.min_coverage));
        }
        let total_weight: f64 = input.range_weights.values().sum();
        if total_weight <= 0.0 {
            return Err(AncestorSelectorError::EmptyUniverse);
        }

        let mut remaining: Vec<&CandidateCoverage> = input.candidates.iter().collect();
        let mut covered: AHashSet<(RangeId, Vec<u32>)> = AHashSet::new();
        let mut steps = Vec::new();
        let mut cumulative = 0.0;

        while steps.len() < self.max_ancestors && cumulative / total_weight < self.min_coverage {
            let best = remaining
                .iter()
                .map(|c| {
                    let gain: f64 = c.coverage.iter().filter(|(key, _)| !covered.contains(*key)).map(|(_, w)| w).sum();
                    (gain, *c)
                })
                // deterministic tie-break: highest gain first, ties broken by gamete sort order.
                .sorted_by(|(gain_a, a), (gain_b, b)| {
                    gain_b.partial_cmp(gain_a).unwrap_or(std::cmp::Ordering::Equal).then(a.gamete.cmp(&b.gamete))
                })
                .next();

            let Some((gain, candidate)) = best else { break };
            if gain <= 0.0 {
                break;
            }

            covered.extend(candidate.coverage.keys().cloned());
            cumulative += gain;
            steps.push(SelectionStep {
                gamete: candidate.gamete.clone(),
                marginal_gain: gain,
                cumulative_coverage: cumulative / total_weight,
            });
            remaining.retain(|c| c.gamete != candidate.gamete);
        }

        Ok(steps)
    }
}
