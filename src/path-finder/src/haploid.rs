//! Haploid Viterbi path-finding: at each reference range the hidden state is "which
//! ancestor gamete does this sample's single chromosome copy trace back to", with a
//! recombination-driven transition between ranges and a binomial emission scored
//! against the observed multiset of read-supported haplotype sets.
//!
//! The naive Viterbi recurrence is `O(n^2)` per step (every one of `n` ancestors can
//! transition to every other). Because the transition matrix here has only two
//! distinct values -- "stay on the same ancestor" and "switch to any other ancestor,
//! uniformly" -- the recurrence reduces to `O(n)`: the best incoming score is either
//! the previous score of the same ancestor (scaled by the stay probability) or the
//! single largest previous score among every *other* ancestor (scaled by the switch
//! probability), and that global max (and runner-up, for when the max itself is the
//! current ancestor) can be precomputed once per step.

use genome::RangeId;

use crate::emission::ln_binomial_pmf;

/// One range's observed read-support: the multiset of distinct haplotype sets reads
/// resolved to (sorted local haplotype indices, read count), plus which haplotype (if
/// any) each candidate ancestor gamete carries at this range.
#[derive(Debug, Clone)]
pub struct RangeObservation {
    pub range: RangeId,
    /// `(sorted haplotype-set, read count)` pairs, as accumulated in
    /// `read_mapper::ReadMappingCounts`.
    pub sets: Vec<(Vec<u32>, u32)>,
    /// `ancestor_haplotype[a]` is the local haplotype index ancestor `a` carries at
    /// this range, or `None` if the gamete has no haplotype here (a "null" state).
    pub ancestor_haplotype: Vec<Option<u32>>,
}

impl RangeObservation {
    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.sets.iter().map(|&(_, c)| u64::from(c)).sum()
    }

    /// Total read count of every observed set containing `hap`.
    #[must_use]
    pub fn contains_count(&self, hap: u32) -> u64 {
        self.sets.iter().filter(|(set, _)| set.binary_search(&hap).is_ok()).map(|&(_, c)| u64::from(c)).sum()
    }

    /// Partitions read counts by membership of `a` and `b` (`a != b`) into the four
    /// mutually exclusive classes the diploid emission's ambiguous-read split needs:
    /// `(n_only_a, n_only_b, n_both, n_neither)`.
    #[must_use]
    pub fn classify_pair(&self, a: u32, b: u32) -> (u64, u64, u64, u64) {
        let (mut only_a, mut only_b, mut both, mut neither) = (0u64, 0u64, 0u64, 0u64);
        for (set, count) in &self.sets {
            let count = u64::from(*count);
            let has_a = set.binary_search(&a).is_ok();
            let has_b = set.binary_search(&b).is_ok();
            match (has_a, has_b) {
                (true, false) => only_a += count,
                (false, true) => only_b += count,
                (true, true) => both += count,
                (false, false) => neither += count,
            }
        }
        (only_a, only_b, both, neither)
    }
}

pub struct HaploidPathFinder {
    /// Per-range probability of a recombination event shifting the sample's ancestry
    /// to a uniformly-random *different* ancestor.
    pub recombination_rate: f64,
    /// Probability a read drawn at the sample's true ancestor correctly supports that
    /// ancestor's haplotype (the binomial emission's success probability).
    pub prob_correct: f64,
}

impl HaploidPathFinder {
    #[must_use]
    pub fn new(recombination_rate: f64, prob_correct: f64) -> Self {
        Self { recombination_rate, prob_correct }
    }

    /// Emission log-likelihood of `obs` given the sample's gamete at this range traces
    /// to ancestor `ancestor_idx`. A range with zero reads contributes `0.0` (every
    /// state equally likely locally), matching the filter/HMM contract for degenerate
    /// ranges.
    fn emission_log_prob(&self, ancestor_idx: usize, obs: &RangeObservation) -> f64 {
        let total = obs.total_reads();
        if total == 0 {
            return 0.0;
        }
        let correct = match obs.ancestor_haplotype.get(ancestor_idx).copied().flatten() {
            Some(hap) => obs.contains_count(hap),
            None => 0,
        };
        ln_binomial_pmf(correct, total, self.prob_correct)
    }

    /// Run Viterbi over `observations` (one per range, in range order) against a panel
    /// of `n_ancestors` candidates, returning the most likely ancestor index at each
    /// range. Returns an empty path if there are no usable observations (a degenerate
    /// HMM, not an error) or if `n_ancestors == 0`.
    #[must_use]
    pub fn find_path(&self, observations: &[RangeObservation], n_ancestors: usize) -> Vec<usize> {
        if observations.is_empty() || n_ancestors == 0 {
            return Vec::new();
        }
        if n_ancestors == 1 {
            return vec![0; observations.len()];
        }

        // p_same = 1 - rho is the probability of staying on the same ancestor; the
        // remaining rho is spread uniformly over the other n-1 ancestors.
        let p_same = 1.0 - self.recombination_rate;
        let ln_trans_stay = p_same.ln();
        let ln_trans_switch = ((1.0 - p_same) / (n_ancestors - 1) as f64).ln();

        let mut viterbi: Vec<f64> = (0..n_ancestors).map(|h| self.emission_log_prob(h, &observations[0])).collect();
        let mut backpointers: Vec<Vec<usize>> = Vec::with_capacity(observations.len());
        backpointers.push(vec![0; n_ancestors]);

        for obs in &observations[1..] {
            let (max1_idx, max1_val, max2_val) = Self::top_two(&viterbi);
            let mut next = vec![0.0; n_ancestors];
            let mut back = vec![0usize; n_ancestors];
            for h in 0..n_ancestors {
                let stay_score = viterbi[h] + ln_trans_stay;
                let (switch_from, switch_best) = if h == max1_idx { (max2_val.1, max2_val.0) } else { (max1_idx, max1_val) };
                let switch_score = switch_best + ln_trans_switch;
                let (best_score, best_from) = if stay_score >= switch_score { (stay_score, h) } else { (switch_score, switch_from) };
                next[h] = best_score + self.emission_log_prob(h, obs);
                back[h] = best_from;
            }
            viterbi = next;
            backpointers.push(back);
        }

        let mut path = vec![0usize; observations.len()];
        let (last, _) = viterbi.iter().enumerate().fold((0, f64::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        path[observations.len() - 1] = last;
        for t in (1..observations.len()).rev() {
            path[t - 1] = backpointers[t][path[t]];
        }
        path
    }

    /// Returns `(argmax, max_value, (second_argmax, second_value))`.
    fn top_two(values: &[f64]) -> (usize, f64, (usize, f64)) {
        let mut max1 = (0usize, f64::NEG_INFINITY);
        let mut max2 = (0usize, f64::NEG_INFINITY);
        for (i, &v) in values.iter().enumerate() {
            if v > max1.1 {
                max2 = max1;
                max1 = (i, v);
            } else if v > max2.1 {
                max2 = (i, v);
            }
        }
        (max1.0, max1.1, max2)
    }
}
