//! Test suite for the difference estimators
//!
//! Covers the strata bank, the b-bit minwise sketch, the hybrid
//! composition, the quasi-estimator fallback, and the end-to-end
//! estimate-then-decode sizing loop.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recon_oxide::estimation::{
    quasi_estimate, BitMinwiseEstimator, HybridEstimator, HybridEstimatorFactory, StrataEstimator,
};
use recon_oxide::reconciliation::{ibf_parameters, Ibf, IbfConfig, KeyValueIbf};
use recon_oxide::DifferenceSets;
use std::collections::HashSet;

fn config() -> IbfConfig {
    IbfConfig::default()
}

// ============================================================================
// Category 1: Strata estimator
// ============================================================================

#[test]
fn test_strata_self_estimate_zero() {
    let mut estimator = StrataEstimator::new(config(), 32).unwrap();
    for id in 0..2_000u64 {
        estimator.add(id, format!("row {}", id).as_bytes());
    }
    assert_eq!(estimator.decode(&estimator.clone()).unwrap(), Some(0));
}

#[test]
fn test_strata_counts_modifications_as_differences() {
    let mut a = StrataEstimator::new(config(), 32).unwrap();
    let mut b = StrataEstimator::new(config(), 32).unwrap();
    for id in 0..200u64 {
        a.add(id, format!("row {}", id).as_bytes());
        if id < 30 {
            b.add(id, format!("row {} v2", id).as_bytes());
        } else {
            b.add(id, format!("row {}", id).as_bytes());
        }
    }
    let estimate = a.decode(&b).unwrap().unwrap();
    assert!(estimate >= 15, "estimate {} misses the changes", estimate);
    assert!(estimate <= 90);
}

#[test]
fn test_strata_estimate_within_factor_two() {
    let mut a = StrataEstimator::new(config(), 32).unwrap();
    let mut b = StrataEstimator::new(config(), 32).unwrap();
    for id in 0..3_000u64 {
        a.add(id, b"x");
    }
    for id in 150..3_000u64 {
        b.add(id, b"x");
    }
    // 150 true differences
    let estimate = a.decode(&b).unwrap().unwrap();
    assert!(estimate >= 75, "estimate {}", estimate);
    assert!(estimate <= 300, "estimate {}", estimate);
}

// ============================================================================
// Category 2: b-bit minwise estimator
// ============================================================================

#[test]
fn test_minwise_similarity_tracks_overlap() {
    let mut a = BitMinwiseEstimator::new(2, 128, 2_000).unwrap();
    let mut b = BitMinwiseEstimator::new(2, 128, 2_000).unwrap();
    for id in 0..1_000u64 {
        a.add(id);
    }
    for id in 500..1_500u64 {
        b.add(id);
    }
    // true Jaccard is 500 / 1500
    let similarity = a.similarity(&b).unwrap();
    assert!(similarity > 0.08, "similarity {}", similarity);
    assert!(similarity < 0.65, "similarity {}", similarity);
}

#[test]
fn test_minwise_round_trip_comparable() {
    let mut a = BitMinwiseEstimator::new(2, 64, 1_000).unwrap();
    let mut b = BitMinwiseEstimator::new(2, 64, 1_000).unwrap();
    for id in 0..800u64 {
        a.add(id);
        b.add(id);
    }
    let a_wire = BitMinwiseEstimator::deserialize(&a.serialize()).unwrap();
    let b_wire = BitMinwiseEstimator::deserialize(&b.serialize()).unwrap();
    assert!((a_wire.similarity(&b_wire).unwrap() - 1.0).abs() < 1e-9);
}

// ============================================================================
// Category 3: Hybrid estimator
// ============================================================================

#[test]
fn test_hybrid_identical_sets() {
    let mut a = HybridEstimatorFactory::create(config(), 2_000, 0).unwrap();
    let mut b = HybridEstimatorFactory::create(config(), 2_000, 0).unwrap();
    for id in 0..2_000u64 {
        a.add(id, format!("row {}", id).as_bytes());
        b.add(id, format!("row {}", id).as_bytes());
    }
    assert_eq!(a.decode(&b).unwrap(), Some(0));
}

#[test]
fn test_hybrid_disjoint_sets_within_factor_two() {
    let mut a = HybridEstimatorFactory::create(config(), 400, 0).unwrap();
    let mut b = HybridEstimatorFactory::create(config(), 400, 0).unwrap();
    for id in 0..400u64 {
        a.add(id, b"row");
    }
    for id in 10_000..10_400u64 {
        b.add(id, b"row");
    }
    // 800 true differences, capped at the combined item count
    let estimate = a.decode(&b).unwrap().unwrap();
    assert!(estimate >= 400, "estimate {}", estimate);
    assert!(estimate <= 800, "estimate {}", estimate);
}

#[test]
fn test_hybrid_factory_failed_decode_deepens() {
    let first = HybridEstimatorFactory::create(config(), 5_000, 0).unwrap();
    let retry = HybridEstimatorFactory::create(config(), 5_000, 2).unwrap();
    assert_eq!(first.strata().strata_count(), 7);
    assert_eq!(retry.strata().strata_count(), 13);
    assert_eq!(retry.decode_factor(), 4);
}

#[test]
fn test_hybrid_round_trip_comparable() {
    let mut a = HybridEstimatorFactory::create(config(), 1_000, 0).unwrap();
    let mut b = HybridEstimatorFactory::create(config(), 1_000, 0).unwrap();
    for id in 0..1_000u64 {
        a.add(id, b"row");
        if id >= 50 {
            b.add(id, b"row");
        }
    }
    let a_wire = HybridEstimator::deserialize(config(), &a.serialize()).unwrap();
    let b_wire = HybridEstimator::deserialize(config(), &b.serialize()).unwrap();
    let direct = a.decode(&b).unwrap().unwrap();
    let over_wire = a_wire.decode(&b_wire).unwrap().unwrap();
    assert_eq!(direct, over_wire);
}

// ============================================================================
// Category 4: Quasi-estimator fallback
// ============================================================================

#[test]
fn test_quasi_estimates_one_sided_difference() {
    let mut remote = Ibf::new(config(), 2_048).unwrap();
    for id in 0..300u64 {
        remote.add(id, b"row");
    }
    let local: Vec<(u64, Vec<u8>)> = (200..500u64).map(|id| (id, b"row".to_vec())).collect();
    let estimate = quasi_estimate(
        &remote,
        local.iter().map(|(id, v)| (*id, v.as_slice())),
        300,
    );
    // 200 local records are unknown to the remote side
    assert!(estimate >= 150, "estimate {}", estimate);
    assert!(estimate <= 600, "estimate {}", estimate);
}

// ============================================================================
// Category 5: Estimate-then-decode sizing loop
// ============================================================================

#[test]
fn test_sizing_loop_estimate_then_decode() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut successes = 0;
    let trials = 5;

    for _ in 0..trials {
        let shared: HashSet<u64> = std::iter::repeat_with(|| rng.random::<u64>())
            .take(2_000)
            .collect();
        let left_only: HashSet<u64> = std::iter::repeat_with(|| rng.random::<u64>())
            .take(30)
            .filter(|id| !shared.contains(id))
            .collect();
        let right_only: HashSet<u64> = std::iter::repeat_with(|| rng.random::<u64>())
            .take(30)
            .filter(|id| !shared.contains(id) && !left_only.contains(id))
            .collect();

        let mut a_est = HybridEstimatorFactory::create(config(), 2_000, 0).unwrap();
        let mut b_est = HybridEstimatorFactory::create(config(), 2_000, 0).unwrap();
        for &id in shared.iter().chain(left_only.iter()) {
            a_est.add(id, &id.to_le_bytes());
        }
        for &id in shared.iter().chain(right_only.iter()) {
            b_est.add(id, &id.to_le_bytes());
        }

        let estimate = a_est.decode(&b_est).unwrap().expect("strata anchored");
        let true_diff = (left_only.len() + right_only.len()) as u64;
        assert!(estimate >= true_diff / 3, "estimate {} too low", estimate);
        assert!(
            estimate <= 3 * true_diff.max(1) + 40,
            "estimate {} too high for {}",
            estimate,
            true_diff
        );

        let sizing = ibf_parameters(estimate.max(true_diff), 0);
        let cfg = IbfConfig {
            hash_count: sizing.hash_count,
            count_kind: sizing.count_kind,
            ..config()
        };
        let mut a = KeyValueIbf::new(cfg, sizing.block_size).unwrap();
        let mut b = KeyValueIbf::new(cfg, sizing.block_size).unwrap();
        for &id in shared.iter().chain(left_only.iter()) {
            a.add(id, &id.to_le_bytes());
        }
        for &id in shared.iter().chain(right_only.iter()) {
            b.add(id, &id.to_le_bytes());
        }

        let mut sets = DifferenceSets::new();
        if a.subtract_and_decode(&b, &mut sets).unwrap() {
            assert_eq!(sets.only_in_a, left_only);
            assert_eq!(sets.only_in_b, right_only);
            successes += 1;
        }
    }

    assert!(
        successes >= trials - 1,
        "only {} of {} sizing rounds decoded",
        successes,
        trials
    );
}

// ============================================================================
// Category 6: Property-based tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_strata_estimate_nonnegative_and_bounded(
        shared in prop::collection::hash_set(0u64..5_000, 0..200),
        extra in prop::collection::hash_set(5_000u64..6_000, 0..40)
    ) {
        let mut a = StrataEstimator::new(config(), 32).unwrap();
        let mut b = StrataEstimator::new(config(), 32).unwrap();
        for &id in &shared {
            a.add(id, &id.to_le_bytes());
            b.add(id, &id.to_le_bytes());
        }
        for &id in &extra {
            a.add(id, &id.to_le_bytes());
        }
        if let Some(estimate) = a.decode(&b).unwrap() {
            prop_assert!(estimate <= 4 * extra.len() as u64 + 8);
        }
    }

    #[test]
    fn prop_minwise_similarity_in_unit_range(
        left in prop::collection::hash_set(0u64..2_000, 1..100),
        right in prop::collection::hash_set(0u64..2_000, 1..100)
    ) {
        let mut a = BitMinwiseEstimator::new(2, 32, 1_000).unwrap();
        let mut b = BitMinwiseEstimator::new(2, 32, 1_000).unwrap();
        for &id in &left {
            a.add(id);
        }
        for &id in &right {
            b.add(id);
        }
        let similarity = a.similarity(&b).unwrap();
        prop_assert!((0.0..=1.0).contains(&similarity));
    }
}
