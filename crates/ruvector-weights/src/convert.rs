//! Dense weight and bond vectors from sparse `(uid, value)` pairs.
//!
//! These are the entry points the rest of the system calls. Each one is a
//! composition of [`scatter`](crate::scatter::scatter),
//! [`filter_available`](crate::subnet::filter_available) and
//! [`normalize`](crate::normalize::normalize).

use crate::error::WeightResult;
use crate::normalize::normalize;
use crate::scatter::scatter;
use crate::subnet::filter_available;

/// Scatter weights into a dense vector of length `n` and sum-normalize it.
///
/// An all-zero scatter stays all-zero: this path means "no weight", not
/// "no information", so it never falls back to uniform.
///
/// ```
/// use ruvector_weights::convert::convert_weight_uids_and_vals_to_tensor;
///
/// let dense = convert_weight_uids_and_vals_to_tensor(4, &[1, 3], &[50.0, 50.0]).unwrap();
/// assert_eq!(dense, vec![0.0, 0.5, 0.0, 0.5]);
/// ```
pub fn convert_weight_uids_and_vals_to_tensor(
    n: i64,
    uids: &[i64],
    weights: &[f64],
) -> WeightResult<Vec<f64>> {
    normalize(&scatter(n, uids, weights)?)
}

/// Like [`convert_weight_uids_and_vals_to_tensor`], but uids that are not in
/// `subnets` are dropped with a `subnet unavailable` warning instead of
/// failing the call.
pub fn convert_root_weight_uids_and_vals_to_tensor(
    n: i64,
    uids: &[i64],
    weights: &[f64],
    subnets: &[i64],
) -> WeightResult<Vec<f64>> {
    let kept = filter_available(n, uids, weights, subnets)?;
    convert_weight_uids_and_vals_to_tensor(n, &kept.uids, &kept.values)
}

/// Scatter integer bonds into a dense vector of length `n`. No normalization.
pub fn convert_bond_uids_and_vals_to_tensor(
    n: i64,
    uids: &[i64],
    bonds: &[i64],
) -> WeightResult<Vec<i64>> {
    scatter(n, uids, bonds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeightError;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_are_normalized() {
        let dense = convert_weight_uids_and_vals_to_tensor(3, &[0, 1, 2], &[15.0, 5.0, 80.0]).unwrap();
        for (got, want) in dense.iter().zip([0.15, 0.05, 0.8]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn all_zero_weights_stay_zero() {
        let dense = convert_weight_uids_and_vals_to_tensor(4, &[0, 1, 2, 3], &[0.0; 4]).unwrap();
        assert_eq!(dense, vec![0.0; 4]);
    }

    #[test]
    fn root_weights_drop_unavailable_subnets() {
        let dense =
            convert_root_weight_uids_and_vals_to_tensor(3, &[1, 3], &[100.0, 200.0], &[1, 2]).unwrap();
        assert_eq!(dense, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn bonds_are_scattered_verbatim() {
        let dense = convert_bond_uids_and_vals_to_tensor(5, &[1, 3, 4], &[10, 20, 30]).unwrap();
        assert_eq!(dense, vec![0, 10, 0, 20, 30]);
    }

    #[test]
    fn bond_errors_propagate() {
        assert!(matches!(
            convert_bond_uids_and_vals_to_tensor(5, &[1, 3, 6], &[10, 20, 30]),
            Err(WeightError::IndexOutOfRange { index: 6, len: 5 })
        ));
        assert!(matches!(
            convert_bond_uids_and_vals_to_tensor(-1, &[0], &[10]),
            Err(WeightError::InvalidArgument { field: "n", .. })
        ));
    }
}
