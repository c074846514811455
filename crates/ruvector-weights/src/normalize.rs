//! Sum normalization with an optional per-element ceiling.
//!
//! [`normalize_max_weight`] turns an arbitrary non-negative weight vector
//! into a probability distribution in which no element exceeds `limit`.
//! Mass above the ceiling is clipped and handed to the uncapped elements in
//! proportion to their current share, pass after pass, until nothing is
//! above the ceiling. Each pass caps at least one more element, so the loop
//! runs at most `n` times. All reductions are sequential left-to-right sums,
//! which keeps the output bit-reproducible for identical input.

use crate::error::{WeightError, WeightResult};
use std::borrow::Cow;
use tracing::{debug, trace};

fn check_weights(weights: &[f64]) -> WeightResult<()> {
    for (position, &value) in weights.iter().enumerate() {
        if !value.is_finite() {
            return Err(WeightError::invalid_argument(
                "weights",
                format!("weight at position {position} is not finite ({value})"),
            ));
        }
        if value < 0.0 {
            return Err(WeightError::NegativeWeight { position, value });
        }
    }
    Ok(())
}

/// Weights together with their total, guaranteed finite.
///
/// When the plain sum of finite weights overflows, every weight is divided
/// by the largest one first; ratios are unchanged and the total is at most
/// `n`. Otherwise the input is borrowed untouched so ordinary inputs keep
/// bit-exact `w / sum` results. Weights must be finite and non-negative.
pub(crate) fn finite_total(weights: &[f64]) -> (Cow<'_, [f64]>, f64) {
    let total: f64 = weights.iter().sum();
    if total.is_finite() {
        return (Cow::Borrowed(weights), total);
    }
    let peak = weights.iter().copied().fold(0.0, f64::max);
    trace!(peak, "weight sum overflows, rescaling by the largest weight");
    let scaled: Vec<f64> = weights.iter().map(|w| w / peak).collect();
    let total: f64 = scaled.iter().sum();
    (Cow::Owned(scaled), total)
}

fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Divide every weight by the total.
///
/// An all-zero (or empty) vector is returned unchanged as zeros: no weight
/// is not the same as equal weight.
pub fn normalize(weights: &[f64]) -> WeightResult<Vec<f64>> {
    check_weights(weights)?;
    let (weights, total) = finite_total(weights);
    if total == 0.0 {
        return Ok(weights.into_owned());
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

/// Normalize `weights` to sum to one with every element at most `limit`.
///
/// - All-zero input returns the uniform vector `1/n`.
/// - If `limit * n <= 1` no distribution can satisfy the ceiling (or only
///   the uniform one can), so the result saturates to uniform.
/// - If the plain sum-normalized vector already respects `limit`, it is
///   returned as-is; in particular `limit == 1.0` is plain normalization.
///
/// Ordering by magnitude is preserved (capped elements tie at `limit`).
///
/// # Errors
///
/// [`WeightError::InvalidArgument`] if `limit` is not in `(0, 1]` or a
/// weight is not finite; [`WeightError::NegativeWeight`] for negative
/// weights.
pub fn normalize_max_weight(weights: &[f64], limit: f64) -> WeightResult<Vec<f64>> {
    if !(limit > 0.0 && limit <= 1.0) {
        return Err(WeightError::invalid_argument("limit", format!("must be in (0, 1], got {limit}")));
    }
    check_weights(weights)?;

    let n = weights.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let (weights, total) = finite_total(weights);
    if total == 0.0 {
        debug!(n, "all weights are zero, falling back to uniform");
        return Ok(uniform(n));
    }
    if limit * n as f64 <= 1.0 {
        debug!(n, limit, "limit is not achievable above uniform, saturating");
        return Ok(uniform(n));
    }

    let base: Vec<f64> = weights.iter().map(|w| w / total).collect();
    if base.iter().all(|&w| w <= limit) {
        return Ok(base);
    }

    let mut capped = vec![false; n];
    let mut result = base.clone();
    for pass in 0..n {
        let mut newly_capped = 0usize;
        for (i, &w) in result.iter().enumerate() {
            if !capped[i] && w > limit {
                capped[i] = true;
                newly_capped += 1;
            }
        }
        if newly_capped == 0 {
            break;
        }

        let capped_count = capped.iter().filter(|&&c| c).count();
        let free_mass = 1.0 - limit * capped_count as f64;
        let free_count = n - capped_count;
        let free_base: f64 = base
            .iter()
            .zip(&capped)
            .filter(|(_, &c)| !c)
            .map(|(w, _)| w)
            .sum();
        trace!(pass, newly_capped, capped_count, free_mass, "clipping pass");

        for (i, w) in result.iter_mut().enumerate() {
            *w = if capped[i] {
                limit
            } else if free_base > 0.0 {
                base[i] * free_mass / free_base
            } else {
                // Remaining elements carry no weight of their own; spread evenly.
                free_mass / free_count as f64
            };
        }
    }
    Ok(result)
}
