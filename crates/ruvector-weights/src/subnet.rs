//! Restrict root weights to the subnets that currently exist.

use crate::error::{WeightError, WeightResult};
use crate::scatter::universe_size;
use std::collections::BTreeSet;
use tracing::warn;

/// Sparse weights that survived [`filter_available`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredWeights<T> {
    /// Kept uids, in input order.
    pub uids: Vec<i64>,
    /// Values paired with `uids`.
    pub values: Vec<T>,
    /// Uids that were dropped, in input order.
    pub dropped: Vec<i64>,
}

impl<T> FilteredWeights<T> {
    /// `true` if nothing survived the filter.
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }
}

/// Keep the `(uid, value)` pairs whose uid is an available subnet inside
/// the universe `[0, n)`.
///
/// Unavailable or out-of-universe uids are not an error: each one is logged
/// at warn level as `subnet unavailable` and recorded in
/// [`FilteredWeights::dropped`].
///
/// # Errors
///
/// [`WeightError::InvalidArgument`] if `n < 0`, and
/// [`WeightError::LengthMismatch`] if `uids` and `values` differ in length.
pub fn filter_available<T: Copy>(
    n: i64,
    uids: &[i64],
    values: &[T],
    available_subnets: &[i64],
) -> WeightResult<FilteredWeights<T>> {
    let len = universe_size(n)?;
    if uids.len() != values.len() {
        return Err(WeightError::length_mismatch("uids", uids.len(), "values", values.len()));
    }

    let available: BTreeSet<i64> = available_subnets.iter().copied().collect();
    let mut kept = FilteredWeights { uids: Vec::new(), values: Vec::new(), dropped: Vec::new() };

    for (&uid, &value) in uids.iter().zip(values) {
        let in_universe = usize::try_from(uid).map_or(false, |i| i < len);
        if in_universe && available.contains(&uid) {
            kept.uids.push(uid);
            kept.values.push(value);
        } else {
            warn!(uid, universe = len, "subnet unavailable: dropping weight for uid {uid}");
            kept.dropped.push(uid);
        }
    }
    Ok(kept)
}
