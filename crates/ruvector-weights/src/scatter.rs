//! Sparse-to-dense scatter.

use crate::error::{WeightError, WeightResult};

/// Validate a signed universe size.
pub(crate) fn universe_size(n: i64) -> WeightResult<usize> {
    usize::try_from(n)
        .map_err(|_| WeightError::invalid_argument("n", format!("universe size must be >= 0, got {n}")))
}

/// Scatter `(index, value)` pairs into a zero-filled vector of length `n`.
///
/// Pairs are applied in input order, so a repeated index keeps the value
/// of its last occurrence. Empty input yields `n` zeros.
///
/// # Errors
///
/// - [`WeightError::InvalidArgument`] if `n < 0`.
/// - [`WeightError::LengthMismatch`] if `indices` and `values` differ in length.
/// - [`WeightError::IndexOutOfRange`] if any index is negative or `>= n`.
pub fn scatter<T: Copy + Default>(n: i64, indices: &[i64], values: &[T]) -> WeightResult<Vec<T>> {
    let len = universe_size(n)?;
    if indices.len() != values.len() {
        return Err(WeightError::length_mismatch("indices", indices.len(), "values", values.len()));
    }

    let mut dense = vec![T::default(); len];
    for (&index, &value) in indices.iter().zip(values) {
        let slot = usize::try_from(index)
            .ok()
            .filter(|&i| i < len)
            .ok_or(WeightError::IndexOutOfRange { index, len })?;
        dense[slot] = value;
    }
    Ok(dense)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatters_into_zeros() {
        let dense = scatter(5, &[1, 3, 4], &[10i64, 20, 30]).unwrap();
        assert_eq!(dense, vec![0, 10, 0, 20, 30]);
    }

    #[test]
    fn empty_input_gives_zero_vector() {
        assert_eq!(scatter::<f64>(4, &[], &[]).unwrap(), vec![0.0; 4]);
        assert!(scatter::<f64>(0, &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_index_last_write_wins() {
        let dense = scatter(3, &[2, 0, 2], &[1.0, 5.0, 9.0]).unwrap();
        assert_eq!(dense, vec![5.0, 0.0, 9.0]);
    }

    #[test]
    fn rejects_negative_universe() {
        let err = scatter(-1, &[0, 1], &[10, 20]).unwrap_err();
        assert!(matches!(err, WeightError::InvalidArgument { field: "n", .. }));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = scatter(6, &[0, 1, 3, 4, 5], &[10, 20, 30]).unwrap_err();
        assert!(matches!(err, WeightError::LengthMismatch { left_len: 5, right_len: 3, .. }));
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let err = scatter(3, &[0, 3], &[10, 20]).unwrap_err();
        assert!(matches!(err, WeightError::IndexOutOfRange { index: 3, len: 3 }));

        let err = scatter(3, &[-1], &[10]).unwrap_err();
        assert!(matches!(err, WeightError::IndexOutOfRange { index: -1, len: 3 }));
    }
}
