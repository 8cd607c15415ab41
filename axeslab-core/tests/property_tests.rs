//! Property tests for metric invariants.
//!
//! Uses proptest to verify:
//! 1. PSI is non-negative and zero for a sample against itself
//! 2. Dip is undefined below the sample gate and never negative above it
//! 3. KS statistic stays in [0, 1]
//! 4. Shape and temporal metrics never panic and are finite when available
//! 5. k-means labels stay in range

use axeslab_core::kmeans::{fit, KMeansConfig};
use axeslab_core::{
    approximate_dip, compute_shape_metrics, compute_temporal_metrics, ks_statistic,
    population_stability_index, DipConfig, Metric, PsiConfig, ShapeConfig, TemporalConfig,
    MIN_DIP_SAMPLES,
};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_sample(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1e3..1e3_f64, min..max)
}

fn finite_or_missing(m: &Metric) -> bool {
    m.value().map_or(true, f64::is_finite)
}

// ── 1. PSI ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn psi_is_non_negative(a in arb_sample(0, 300), b in arb_sample(0, 300)) {
        let psi = population_stability_index(&a, &b, &PsiConfig::default());
        prop_assert!(psi >= 0.0);
        prop_assert!(psi.is_finite());
    }

    #[test]
    fn psi_of_sample_with_itself_is_zero(a in arb_sample(0, 300)) {
        prop_assert_eq!(population_stability_index(&a, &a, &PsiConfig::default()), 0.0);
    }
}

// ── 2. Dip ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn dip_needs_forty_values(a in arb_sample(0, MIN_DIP_SAMPLES)) {
        prop_assert_eq!(approximate_dip(&a, 256), None);
    }

    #[test]
    fn dip_is_non_negative(a in arb_sample(MIN_DIP_SAMPLES, 200)) {
        let dip = approximate_dip(&a, 128).unwrap();
        prop_assert!(dip >= 0.0 && dip.is_finite());
    }
}

// ── 3. KS ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ks_in_unit_interval(a in arb_sample(1, 100), b in arb_sample(1, 100)) {
        let d = ks_statistic(&a, &b).unwrap();
        prop_assert!((0.0..=1.0).contains(&d));
    }
}

// ── 4. Shape / temporal ──────────────────────────────────────────────

proptest! {
    #[test]
    fn shape_metrics_are_total(a in arb_sample(0, 120)) {
        let m = compute_shape_metrics(&a, &ShapeConfig::default(), &DipConfig::default());
        prop_assert!(finite_or_missing(&m.sk_k_score));
        prop_assert!(finite_or_missing(&m.outlier_ratio));
        if let Some(r) = m.outlier_ratio.value() {
            prop_assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn temporal_metrics_are_total(a in arb_sample(0, 200)) {
        let m = compute_temporal_metrics(&a, &TemporalConfig::default(), &PsiConfig::default());
        prop_assert!(finite_or_missing(&m.st_var_ratio));
        prop_assert!(finite_or_missing(&m.seasonal_corr));
        prop_assert_eq!(m.psi_trigger_rate.is_available(), a.len() >= 30);
    }
}

// ── 5. k-means ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn kmeans_labels_in_range(
        points in prop::collection::vec(prop::collection::vec(-50.0..50.0_f64, 2), 5..60),
        k in 1usize..5,
    ) {
        let fit = fit(&points, &KMeansConfig { n_init: 2, ..KMeansConfig::new(k, 3) }).unwrap();
        prop_assert_eq!(fit.labels.len(), points.len());
        prop_assert!(fit.labels.iter().all(|&l| l < k));
        prop_assert!(fit.inertia >= 0.0);
    }
}
