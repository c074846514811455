//! Integration tests for [`ruvector_weights::codec`].
//!
//! Arrays are built from fixed values so every run encodes the same bytes.

use ndarray::{Array, IxDyn};
use proptest::prelude::*;
use ruvector_weights::codec::{deserialize, serialize, TensorEnvelope};
use ruvector_weights::tensor::{DataType, NumericArray};
use ruvector_weights::WeightError;

fn sample(dtype: DataType) -> NumericArray {
    NumericArray::from_vec([2, 3], vec![0.0f64, 1.0, -2.0, 3.5, 100.0, 0.25])
        .unwrap()
        .cast(dtype)
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn every_dtype_round_trips() {
    for dtype in DataType::ALL {
        let array = sample(dtype);
        let envelope = serialize(&array).unwrap();

        assert_eq!(envelope.dtype(), dtype);
        assert_eq!(envelope.shape(), &[2, 3]);
        assert_eq!(deserialize(&envelope).unwrap(), array, "round trip failed for {dtype}");
    }
}

#[test]
fn every_dtype_round_trips_through_json() {
    for dtype in DataType::ALL {
        let envelope = serialize(&sample(dtype)).unwrap();
        let json = envelope.to_json().unwrap();

        let parsed = TensorEnvelope::from_json(&json).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.to_array().unwrap(), sample(dtype));
    }
}

#[test]
fn empty_array_round_trips() {
    let array = NumericArray::empty(DataType::Float32);
    let envelope = serialize(&array).unwrap();

    assert_eq!(envelope.shape(), &[0]);
    let back = deserialize(&envelope).unwrap();
    assert!(back.is_empty());
    assert_eq!(back.dtype(), DataType::Float32);
}

#[test]
fn higher_rank_array_keeps_its_shape() {
    let array = NumericArray::from_vec([2, 2, 2], (0..8).collect::<Vec<i32>>()).unwrap();
    let back = deserialize(&serialize(&array).unwrap()).unwrap();

    assert_eq!(back.shape().dims(), &[2, 2, 2]);
    assert_eq!(back.as_slice::<i32>().unwrap(), &[0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn ndarray_boundary_round_trips() {
    let source = Array::from_shape_fn(IxDyn(&[3, 4]), |ix| (ix[0] * 4 + ix[1]) as f32 * 0.5);
    let array = NumericArray::from(source.clone());

    let back = deserialize(&serialize(&array).unwrap()).unwrap();
    assert_eq!(back.to_ndarray::<f32>().unwrap(), source);
}

#[test]
fn dense_weights_cross_the_envelope() {
    let dense = ruvector_weights::convert_weight_uids_and_vals_to_tensor(4, &[1, 3], &[50.0, 50.0]).unwrap();
    let envelope = serialize(&NumericArray::from(dense.clone())).unwrap();
    assert_eq!(envelope.to_f64_vec().unwrap(), dense);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn garbage_payload_is_a_decode_error() {
    let envelope = TensorEnvelope::new("AAECAwQ=", "float32", &[2i64]).unwrap();
    assert!(matches!(deserialize(&envelope), Err(WeightError::Decode(_))));
}

#[test]
fn envelope_requires_a_dtype() {
    assert!(matches!(
        TensorEnvelope::new("", None::<&str>, &[1i64]),
        Err(WeightError::InvalidArgument { field: "dtype", .. })
    ));
}

#[test]
fn json_with_negative_dimension_is_rejected() {
    let json = r#"{"buffer":"","dtype":"float32","shape":[2,-3]}"#;
    assert!(matches!(TensorEnvelope::from_json(json), Err(WeightError::Json(_))));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn finite_f64_vectors_round_trip(values in prop::collection::vec(-1e12f64..1e12, 0..256)) {
        let array = NumericArray::from_slice(&values);
        let back = deserialize(&serialize(&array).unwrap()).unwrap();
        prop_assert_eq!(back.as_slice::<f64>().unwrap(), values.as_slice());
    }

    #[test]
    fn i64_matrices_round_trip(rows in 1usize..8, cols in 1usize..8, seed in any::<i64>()) {
        let values: Vec<i64> = (0..rows * cols).map(|i| seed.wrapping_mul(i as i64 + 1)).collect();
        let array = NumericArray::from_vec([rows, cols], values).unwrap();
        let envelope = serialize(&array).unwrap();

        prop_assert_eq!(envelope.shape(), &[rows, cols][..]);
        prop_assert_eq!(deserialize(&envelope).unwrap(), array);
    }
}
