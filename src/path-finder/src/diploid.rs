//! Diploid Viterbi path-finding: the hidden state at each range is an *ordered* pair
//! of ancestor indices `(i, j)`, one per gamete copy. `n` ancestors give `n^2` states.
//!
//! Each gamete copy recombines independently with the same per-range rate used by
//! [`crate::haploid::HaploidPathFinder`] (`s_h = rho/(n-1)`, uniform switch probability
//! per other ancestor). When *both* copies switch in the same step and land on the
//! *same* new homozygous ancestor, `inbreeding_coefficient` (`f`) is the probability
//! that coincidence reflects identity by descent (one joint event, weight
//! `p_same * s_h`) rather than two independent draws (weight `s_h^2`) -- this is the
//! only place inbreeding enters the model, and it only applies when the *source* state
//! is itself homozygous; transitions out of a heterozygous source follow the plain
//! `p_same^2` / `p_same*s_h` / `s_h^2` rules with no `f` term at all (§4.G).
//!
//! The full `n^2 x n^2` log-transition table is precomputed once per
//! [`DiploidPathFinder::find_path`] call (it depends only on `n`, `rho`, and `f`, not
//! on the observations) by [`DiploidPathFinder::ln_transition_table`], which also
//! row-normalizes each source's targets to sum to exactly `1` (§8.7) -- the §4.G
//! bullet weights for an inbred homozygous source don't already sum to `1` on their
//! own. Viterbi is the straightforward dense `O(n^2)` per step this table makes it:
//! for each destination state, max over every source state of `previous score +
//! transition`.
//!
//! Emission scoring follows the exact four-category partition rather than an
//! approximating multinomial over per-ancestor marginal counts: for a heterozygous
//! state `(h_a, h_b)` with `h_a != h_b`, reads are split into "only supports `h_a`",
//! "only supports `h_b`", "supports both" (ambiguous), and "supports neither", and the
//! ambiguous reads are summed in log-space over every possible attribution split
//! (`log_sum_exp`) rather than assigned a single expected split -- this is what makes
//! `(a, b)` and `(b, a)` score identically and what keeps the emission numerically
//! stable as read depth grows.

use ndarray::{Array2, Array4};

use crate::emission::{ln_binomial_pmf, ln_multinomial_pmf, log_sum_exp};
use crate::haploid::RangeObservation;

pub struct DiploidPathFinder {
    /// Per-gamete-copy probability of a recombination event, same units as
    /// [`crate::haploid::HaploidPathFinder::recombination_rate`].
    pub recombination_rate: f64,
    /// Probability a simultaneous switch of both gamete copies to the same ancestor
    /// reflects identity by descent rather than two independent draws.
    pub inbreeding_coefficient: f64,
    /// Probability a read drawn at a true ancestor haplotype correctly supports it.
    pub prob_correct: f64,
}

impl DiploidPathFinder {
    #[must_use]
    pub fn new(recombination_rate: f64, inbreeding_coefficient: f64, prob_correct: f64) -> Self {
        Self { recombination_rate, inbreeding_coefficient, prob_correct }
    }

    /// Emission log-probability of `obs` given the sample's two gametes trace back to
    /// ancestors `i` and `j`. Symmetric in `(i, j)` by construction -- reads carry no
    /// information about which physical chromosome they came from.
    fn emission_log_prob(&self, i: usize, j: usize, obs: &RangeObservation) -> f64 {
        let total = obs.total_reads();
        if total == 0 {
            return 0.0;
        }
        let p = self.prob_correct;
        let ha = obs.ancestor_haplotype.get(i).copied().flatten();
        let hb = obs.ancestor_haplotype.get(j).copied().flatten();
        match (ha, hb) {
            (Some(a), Some(b)) if a != b => {
                let (only_a, only_b, both, neither) = obs.classify_pair(a, b);
                let terms: Vec<f64> = (0..=both)
                    .map(|k| {
                        let counts = [only_a + k, only_b + (both - k), neither];
                        ln_multinomial_pmf(&counts, &[p / 2.0, p / 2.0, 1.0 - p])
                    })
                    .collect();
                log_sum_exp(&terms)
            }
            // homozygous, or exactly one gamete has a haplotype here -- the absent copy
            // contributes nothing, so scoring collapses to a binomial against the one
            // haplotype that is actually present.
            (Some(a), _) | (_, Some(a)) => ln_binomial_pmf(obs.contains_count(a), total, p),
            (None, None) => ln_binomial_pmf(0, total, p),
        }
    }

    /// Transition probability (not log) from ordered source `(a, b)` to ordered target
    /// `(i, j)`, per §4.G's table. `matches` counts how many of the two positions keep
    /// their source value; the generic (non-inbred) weight is `p_same^matches *
    /// s_h^(2-matches)`. A homozygous source (`a == b`) additionally: never applies `f`
    /// when staying put (`matches == 2`); applies `(1-f)` to the generic weight
    /// otherwise; and, when landing on a *different* homozygous target (`matches == 0`,
    /// `i == j`), adds an `f * p_same * s_h` identity-by-descent term on top.
    fn transition_prob(&self, source: (usize, usize), target: (usize, usize), n: usize) -> f64 {
        let (a, b) = source;
        let (i, j) = target;
        let p_same = 1.0 - self.recombination_rate;
        let s_h = self.recombination_rate / (n - 1) as f64;
        let f = self.inbreeding_coefficient;

        let matches = usize::from(i == a) + usize::from(j == b);
        let generic = match matches {
            2 => p_same * p_same,
            1 => p_same * s_h,
            _ => s_h * s_h,
        };

        if a == b {
            if matches == 2 {
                generic
            } else if i == j {
                f * p_same * s_h + (1.0 - f) * generic
            } else {
                (1.0 - f) * generic
            }
        } else {
            generic
        }
    }

    /// Builds the full `n^2 x n^2` log-transition table, row-normalized so that for
    /// every source `(a, b)` the target weights sum to exactly `1` (§8.7). The
    /// homozygous-source bullets in §4.G's table are relative weights, not already a
    /// normalized distribution -- summing them directly leaves a `1 - f*rho` deficit
    /// whenever both the inbreeding coefficient and the recombination rate are
    /// nonzero, since the `f` term trades mass between categories without adding any
    /// back for the vanishing `(a,a) -> (a,a)` contribution. Normalizing per source row
    /// preserves the bullets' relative proportions exactly while guaranteeing a valid
    /// stochastic matrix; heterozygous-source rows already sum to `1` on their own, so
    /// normalizing them is a no-op.
    fn ln_transition_table(&self, n: usize) -> Array4<f64> {
        let mut ln_trans = Array4::<f64>::from_elem((n, n, n, n), f64::NEG_INFINITY);
        for a in 0..n {
            for b in 0..n {
                let mut row = Vec::with_capacity(n * n);
                for i in 0..n {
                    for j in 0..n {
                        row.push(self.transition_prob((a, b), (i, j), n).ln());
                    }
                }
                let ln_z = log_sum_exp(&row);
                for i in 0..n {
                    for j in 0..n {
                        ln_trans[[a, b, i, j]] = row[i * n + j] - ln_z;
                    }
                }
            }
        }
        ln_trans
    }

    /// Run Viterbi over `observations`, returning the most likely `(ancestor_i,
    /// ancestor_j)` pair at each range. Returns an empty path for a degenerate HMM (no
    /// observations or a zero-sized panel), matching the haploid finder's contract.
    #[must_use]
    pub fn find_path(&self, observations: &[RangeObservation], n_ancestors: usize) -> Vec<(usize, usize)> {
        if observations.is_empty() || n_ancestors == 0 {
            return Vec::new();
        }
        if n_ancestors == 1 {
            return vec![(0, 0); observations.len()];
        }

        let n = n_ancestors;

        // The transition table depends only on (n, rho, f), not on the observations, so
        // it is built once and reused at every step.
        let ln_trans = self.ln_transition_table(n);

        let mut v = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                v[[i, j]] = self.emission_log_prob(i, j, &observations[0]);
            }
        }

        type Back = Array2<(usize, usize)>;
        let mut backpointers: Vec<Back> = Vec::with_capacity(observations.len());
        backpointers.push(Array2::from_shape_fn((n, n), |(i, j)| (i, j)));

        for obs in &observations[1..] {
            let mut next = Array2::<f64>::zeros((n, n));
            let mut back = Array2::from_shape_fn((n, n), |_| (0usize, 0usize));
            for i in 0..n {
                for j in 0..n {
                    let mut best = (f64::NEG_INFINITY, (0usize, 0usize));
                    for a in 0..n {
                        for b in 0..n {
                            let cand = v[[a, b]] + ln_trans[[a, b, i, j]];
                            if cand > best.0 {
                                best = (cand, (a, b));
                            }
                        }
                    }
                    next[[i, j]] = best.0 + self.emission_log_prob(i, j, obs);
                    back[[i, j]] = best.1;
                }
            }
            v = next;
            backpointers.push(back);
        }

        let mut best_final = (f64::NEG_INFINITY, (0usize, 0usize));
        for i in 0..n {
            for j in 0..n {
                if v[[i, j]] > best_final.0 {
                    best_final = (v[[i, j]], (i, j));
                }
            }
        }

        let mut path = vec![(0usize, 0usize); observations.len()];
        path[observations.len() - 1] = best_final.1;
        for t in (1..observations.len()).rev() {
            path[t - 1] = backpointers[t][[path[t].0, path[t].1]];
        }
        path
    }
}
