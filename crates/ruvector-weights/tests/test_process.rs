//! End-to-end tests for [`ruvector_weights::process`] driven by a
//! [`WeightPolicy`].

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use ruvector_weights::config::WeightPolicy;
use ruvector_weights::process::{process_weights, EmissionValues, MIN_WEIGHT_FLOOR};
use ruvector_weights::U16_MAX;
use tempfile::tempdir;

fn scores(n: usize) -> Vec<f64> {
    // Deterministic, strictly increasing, no ties.
    (0..n).map(|i| 1.0 + i as f64 * 0.5).collect()
}

#[test]
fn default_policy_caps_every_uid() {
    let n = 32;
    let uids: Vec<i64> = (0..n as i64).collect();
    let out = WeightPolicy::default().process(n as i64, &uids, &scores(n)).unwrap();

    assert_eq!(out.len(), n);
    assert!(out.weights.iter().all(|&w| w <= 0.1 + 1e-12));
    assert_abs_diff_eq!(out.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
}

#[test]
fn sparse_submission_spreads_floor_over_universe() {
    let policy = WeightPolicy { min_allowed_weights: 4, max_weight_limit: 1.0, ..Default::default() };
    let out = process_weights(6, &[1, 4], &[2.0, 2.0], &policy).unwrap();

    assert_eq!(out.uids, vec![0, 1, 2, 3, 4, 5]);
    let total = 4.0 + 6.0 * MIN_WEIGHT_FLOOR;
    assert_abs_diff_eq!(out.weights[0], MIN_WEIGHT_FLOOR / total, epsilon = 1e-15);
    assert_abs_diff_eq!(out.weights[4], (2.0 + MIN_WEIGHT_FLOOR) / total, epsilon = 1e-12);
}

#[test]
fn policy_file_drives_processing_and_emission() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("policy.json");
    WeightPolicy { min_allowed_weights: 2, max_weight_limit: 0.5, max_emission_bits: 16, ..Default::default() }
        .to_json(&path)
        .unwrap();
    let policy = WeightPolicy::from_json(&path).unwrap();

    let processed = policy.process(3, &[0, 1, 2], &[8.0, 1.0, 1.0]).unwrap();
    let emission = policy.emit(&processed).unwrap();

    assert_eq!(emission.uids, vec![0, 1, 2]);
    match emission.values {
        EmissionValues::U16(values) => {
            // 0.5 -> 32767.5 rounds up, 0.25 -> 16383.75 rounds up.
            assert_eq!(values, vec![32768, 16384, 16384]);
        }
        other => panic!("expected 16-bit emission, got {other:?}"),
    }
}

#[test]
fn chain_params_round_trip_through_processing() {
    // 6553 / 65535 is just under 0.1.
    let policy = WeightPolicy::from_chain_params(1, 6553, 0).unwrap();
    let out = policy.process(20, &(0..20).collect::<Vec<i64>>(), &scores(20)).unwrap();
    assert!(out.weights.iter().all(|&w| w <= policy.max_weight_limit + 1e-12));
}

proptest! {
    #[test]
    fn processed_weights_respect_the_policy(
        weights in prop::collection::vec(0.0f64..100.0, 1..64),
        min in 0usize..16,
        limit in 0.05f64..=1.0,
        quantile in 0.0f64..=1.0,
    ) {
        let n = weights.len() as i64;
        let uids: Vec<i64> = (0..n).collect();
        let policy = WeightPolicy {
            min_allowed_weights: min,
            max_weight_limit: limit,
            exclude_quantile: quantile,
            ..Default::default()
        };
        let out = process_weights(n, &uids, &weights, &policy).unwrap();

        prop_assert_eq!(out.uids.len(), out.weights.len());
        prop_assert!((out.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        if limit * out.len() as f64 > 1.0 {
            prop_assert!(out.weights.iter().all(|&w| w <= limit + 1e-12));
        }

        let emission = policy.emit(&out).unwrap();
        prop_assert_eq!(emission.values.len(), out.len());
        prop_assert!(emission.values.to_u64_vec().iter().all(|&v| v <= u64::from(U16_MAX)));
    }
}
