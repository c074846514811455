//! Turn a raw score vector into a weight set that satisfies a
//! [`WeightPolicy`].
//!
//! ```text
//!  (uids, weights) ──validate──► non-zero pairs
//!        │
//!        ├── none, or n < min_allowed_weights ──► uniform 1/n over 0..n
//!        ├── fewer than min_allowed_weights   ──► 1e-5 floor + weights over 0..n
//!        └── otherwise                        ──► drop below exclude quantile
//!                                                      │
//!                                          normalize_max_weight(max_weight_limit)
//! ```

use crate::config::WeightPolicy;
use crate::emit::check_emission_input;
use crate::error::{WeightError, WeightResult};
use crate::normalize::normalize_max_weight;
use crate::scatter::{scatter, universe_size};
use tracing::debug;

/// Floor weight given to every uid when a submission is too sparse.
pub const MIN_WEIGHT_FLOOR: f64 = 1e-5;

/// Weights ready for emission: every value is in `[0, max_weight_limit]`
/// and the values sum to one (unless the universe is empty).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedWeights {
    /// Uids, ascending when the whole universe is returned, otherwise in
    /// input order.
    pub uids: Vec<i64>,
    /// Weights paired with `uids`.
    pub weights: Vec<f64>,
}

impl ProcessedWeights {
    fn uniform(len: usize) -> Self {
        ProcessedWeights {
            uids: (0..len as i64).collect(),
            weights: vec![1.0 / len as f64; len],
        }
    }

    /// Number of uids.
    pub fn len(&self) -> usize {
        self.uids.len()
    }

    /// `true` if no uid carries weight.
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }
}

/// Quantized values at the width chosen by [`WeightPolicy::max_emission_bits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmissionValues {
    /// 16-bit emission.
    U16(Vec<u16>),
    /// 32-bit emission.
    U32(Vec<u32>),
}

impl EmissionValues {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            EmissionValues::U16(v) => v.len(),
            EmissionValues::U32(v) => v.len(),
        }
    }

    /// `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every value to `u64`.
    pub fn to_u64_vec(&self) -> Vec<u64> {
        match self {
            EmissionValues::U16(v) => v.iter().map(|&x| u64::from(x)).collect(),
            EmissionValues::U32(v) => v.iter().map(|&x| u64::from(x)).collect(),
        }
    }
}

/// Uids and quantized values produced by [`WeightPolicy::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Uids paired with `values`.
    pub uids: Vec<u64>,
    /// Quantized values.
    pub values: EmissionValues,
}

/// `q`-quantile of `values` with linear interpolation between order
/// statistics. `values` must be non-empty and `q` in `[0, 1]`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Apply `policy` to a raw `(uid, weight)` assignment over the universe
/// `[0, n)`.
///
/// Zero weights are discarded first. A submission with no non-zero weight
/// (or a universe smaller than the policy's minimum) becomes uniform over
/// every uid. A submission with too few non-zero weights is padded with
/// [`MIN_WEIGHT_FLOOR`] on every uid. Otherwise the low tail below
/// `exclude_quantile` is dropped, never leaving fewer than
/// `min_allowed_weights`. The result always goes through
/// [`normalize_max_weight`].
///
/// # Errors
///
/// - [`WeightError::InvalidArgument`] if `n < 0` or `policy` is invalid.
/// - [`WeightError::LengthMismatch`], [`WeightError::NegativeWeight`],
///   [`WeightError::NegativeUid`] as for emission.
/// - [`WeightError::IndexOutOfRange`] if a uid with non-zero weight is `>= n`.
pub fn process_weights(
    n: i64,
    uids: &[i64],
    weights: &[f64],
    policy: &WeightPolicy,
) -> WeightResult<ProcessedWeights> {
    let len = universe_size(n)?;
    policy.validate()?;
    check_emission_input(uids, weights)?;

    let mut nz_uids = Vec::new();
    let mut nz_weights = Vec::new();
    for (&uid, &weight) in uids.iter().zip(weights) {
        if weight > 0.0 {
            if uid >= n {
                return Err(WeightError::IndexOutOfRange { index: uid, len });
            }
            nz_uids.push(uid);
            nz_weights.push(weight);
        }
    }

    let min = policy.min_allowed_weights;
    if nz_weights.is_empty() || len < min {
        debug!(n, non_zero = nz_weights.len(), min, "returning uniform weights");
        return Ok(ProcessedWeights::uniform(len));
    }

    if nz_weights.len() < min {
        debug!(n, non_zero = nz_weights.len(), min, "padding sparse weights with floor");
        let dense: Vec<f64> = scatter(n, &nz_uids, &nz_weights)?
            .into_iter()
            .map(|w| w + MIN_WEIGHT_FLOOR)
            .collect();
        let weights = normalize_max_weight(&dense, policy.max_weight_limit)?;
        return Ok(ProcessedWeights { uids: (0..n).collect(), weights });
    }

    let k = nz_weights.len();
    let max_exclude = k.saturating_sub(min) as f64 / k as f64;
    let q = policy.exclude_quantile.min(max_exclude);
    let cutoff = quantile(&nz_weights, q);

    let (kept_uids, kept_weights): (Vec<i64>, Vec<f64>) = nz_uids
        .into_iter()
        .zip(nz_weights)
        .filter(|&(_, w)| w >= cutoff)
        .unzip();
    debug!(kept = kept_uids.len(), dropped = k - kept_uids.len(), cutoff, "applied exclude quantile");

    let weights = normalize_max_weight(&kept_weights, policy.max_weight_limit)?;
    Ok(ProcessedWeights { uids: kept_uids, weights })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn policy(min: usize, limit: f64, quantile: f64) -> WeightPolicy {
        WeightPolicy {
            min_allowed_weights: min,
            max_weight_limit: limit,
            exclude_quantile: quantile,
            ..Default::default()
        }
    }

    #[test]
    fn linear_quantile() {
        assert_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], 0.0), 1.0);
        assert_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], 1.0), 4.0);
        assert_abs_diff_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], 0.5), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn all_zero_becomes_uniform() {
        let out = process_weights(4, &[0, 1], &[0.0, 0.0], &policy(1, 0.5, 0.0)).unwrap();
        assert_eq!(out.uids, vec![0, 1, 2, 3]);
        assert_eq!(out.weights, vec![0.25; 4]);
    }

    #[test]
    fn small_universe_becomes_uniform() {
        let out = process_weights(2, &[0, 1], &[3.0, 1.0], &policy(8, 1.0, 0.0)).unwrap();
        assert_eq!(out.weights, vec![0.5, 0.5]);
        assert!(process_weights(0, &[], &[], &policy(8, 1.0, 0.0)).unwrap().is_empty());
    }

    #[test]
    fn sparse_submission_is_padded() {
        let out = process_weights(4, &[2], &[1.0], &policy(2, 1.0, 0.0)).unwrap();
        assert_eq!(out.uids, vec![0, 1, 2, 3]);
        let total = 1.0 + 4.0 * MIN_WEIGHT_FLOOR;
        assert_abs_diff_eq!(out.weights[2], (1.0 + MIN_WEIGHT_FLOOR) / total, epsilon = 1e-12);
        assert_abs_diff_eq!(out.weights[0], MIN_WEIGHT_FLOOR / total, epsilon = 1e-12);
    }

    #[test]
    fn exclude_quantile_drops_low_tail() {
        let uids = [0, 1, 2, 3, 4];
        let weights = [1.0, 2.0, 3.0, 4.0, 0.0];
        let out = process_weights(5, &uids, &weights, &policy(2, 1.0, 0.5)).unwrap();
        // Quantile 0.5 of [1, 2, 3, 4] is 2.5.
        assert_eq!(out.uids, vec![2, 3]);
        assert_abs_diff_eq!(out.weights[0], 3.0 / 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.weights[1], 4.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn exclusion_never_drops_below_minimum() {
        let out = process_weights(4, &[0, 1, 2, 3], &[1.0, 2.0, 3.0, 4.0], &policy(3, 1.0, 1.0)).unwrap();
        // max_exclude = 1/4, so the cutoff is the 0.25-quantile, 1.75.
        assert_eq!(out.uids, vec![1, 2, 3]);
    }

    #[test]
    fn ceiling_is_applied() {
        let out = process_weights(3, &[0, 1, 2], &[8.0, 1.0, 1.0], &policy(1, 0.5, 0.0)).unwrap();
        assert_abs_diff_eq!(out.weights[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.weights[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn rejects_invalid_input() {
        let p = policy(1, 0.5, 0.0);
        assert!(matches!(process_weights(-1, &[], &[], &p), Err(WeightError::InvalidArgument { .. })));
        assert!(matches!(
            process_weights(3, &[0, 1], &[1.0], &p),
            Err(WeightError::LengthMismatch { .. })
        ));
        assert!(matches!(
            process_weights(3, &[0], &[-1.0], &p),
            Err(WeightError::NegativeWeight { .. })
        ));
        assert!(matches!(process_weights(3, &[-2], &[1.0], &p), Err(WeightError::NegativeUid { .. })));
        assert!(matches!(
            process_weights(3, &[5], &[1.0], &p),
            Err(WeightError::IndexOutOfRange { index: 5, len: 3 })
        ));
        assert!(matches!(
            process_weights(3, &[0], &[1.0], &policy(1, 0.0, 0.0)),
            Err(WeightError::Config(_))
        ));
    }
}
