//! Emission quantization.
//!
//! Normalized weights are scaled onto the full range of a fixed-width
//! unsigned integer (`u16` on chain today) and rounded to nearest with ties
//! to even, the rounding numpy and Python peers apply. Values are clamped to
//! `[0, MAX]` so float overshoot can never wrap.

use crate::error::{WeightError, WeightResult};
use crate::normalize::finite_total;
use std::fmt;
use tracing::debug;

/// Largest emission value for 16-bit weights.
pub const U16_MAX: u16 = u16::MAX;

/// Largest emission value for 32-bit weights.
pub const U32_MAX: u32 = u32::MAX;

/// Unsigned integer widths that emission values can be quantized into.
pub trait EmissionWidth: Copy + Default + PartialEq + fmt::Debug {
    /// Bit width of the target integer.
    const BITS: u32;

    /// Largest representable value, as `f64`.
    fn max_f64() -> f64;

    /// Convert an already rounded and clamped value.
    fn from_clamped(value: f64) -> Self;
}

impl EmissionWidth for u16 {
    const BITS: u32 = 16;

    fn max_f64() -> f64 {
        f64::from(U16_MAX)
    }

    fn from_clamped(value: f64) -> Self {
        value as u16
    }
}

impl EmissionWidth for u32 {
    const BITS: u32 = 32;

    fn max_f64() -> f64 {
        f64::from(U32_MAX)
    }

    fn from_clamped(value: f64) -> Self {
        value as u32
    }
}

/// Validate parallel uid / weight sequences for emission.
pub(crate) fn check_emission_input(uids: &[i64], weights: &[f64]) -> WeightResult<()> {
    if uids.len() != weights.len() {
        return Err(WeightError::length_mismatch("uids", uids.len(), "weights", weights.len()));
    }
    for (position, &value) in weights.iter().enumerate() {
        if value.is_nan() || value == f64::INFINITY {
            return Err(WeightError::invalid_argument(
                "weights",
                format!("weight at position {position} is not finite ({value})"),
            ));
        }
        if value < 0.0 {
            return Err(WeightError::NegativeWeight { position, value });
        }
    }
    if let Some((position, &uid)) = uids.iter().enumerate().find(|(_, &uid)| uid < 0) {
        return Err(WeightError::NegativeUid { position, uid });
    }
    Ok(())
}

/// Quantize `weights` into `T` for emission alongside their `uids`.
///
/// Weights are divided by their sum, scaled by `T`'s maximum and rounded
/// to nearest. A zero sum is a valid "emit nothing" request and yields all
/// zeros. The returned uid list is a validated copy of the input and both
/// lists have the input's length.
///
/// # Errors
///
/// [`WeightError::LengthMismatch`], [`WeightError::NegativeWeight`] or
/// [`WeightError::NegativeUid`]; NaN or infinite weights are rejected as
/// [`WeightError::InvalidArgument`]. Finite weights whose sum overflows are
/// rescaled, not rejected.
pub fn quantize_for_emit<T: EmissionWidth>(
    uids: &[i64],
    weights: &[f64],
) -> WeightResult<(Vec<u64>, Vec<T>)> {
    check_emission_input(uids, weights)?;
    let out_uids: Vec<u64> = uids.iter().map(|&uid| uid as u64).collect();

    let (weights, total) = finite_total(weights);
    if total == 0.0 {
        debug!(count = weights.len(), "weights sum to zero, emitting zeros");
        return Ok((out_uids, vec![T::default(); weights.len()]));
    }

    let max = T::max_f64();
    let values = weights
        .iter()
        .map(|w| T::from_clamped((w / total * max).round_ties_even().clamp(0.0, max)))
        .collect();
    Ok((out_uids, values))
}

/// Quantize weights into the on-chain `u16` range.
///
/// See [`quantize_for_emit`].
pub fn convert_values_and_ids_for_emit(
    uids: &[i64],
    weights: &[f64],
) -> WeightResult<(Vec<u64>, Vec<u16>)> {
    quantize_for_emit::<u16>(uids, weights)
}
