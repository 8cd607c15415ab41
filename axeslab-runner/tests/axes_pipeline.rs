//! Integration tests: CSV text → table → axes vector.

use axeslab_core::{PsiMode, Unavailable};
use axeslab_runner::{read_csv, AxesError, EngineConfig, FeatureBuilder};

/// `n` rows of `date,a,b,value` with a bimodal `a/b` cloud and a target
/// that drifts upward over time. Rows are written newest first.
fn drifting_csv(n: usize) -> String {
    let mut out = String::from("date,a,b,value\n");
    for i in (0..n).rev() {
        let day = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(i as u64);
        let side = if i % 2 == 0 { -4.0 } else { 4.0 };
        let a = side + ((i * 7) % 10) as f64 * 0.05;
        let b = -side + ((i * 3) % 10) as f64 * 0.05;
        let value = i as f64 * 0.1 + ((i * 13) % 17) as f64 * 0.01;
        out.push_str(&format!("{day},{a},{b},{value}\n"));
    }
    out
}

#[test]
fn drifting_target_triggers_psi() {
    let data = read_csv(drifting_csv(500).as_bytes()).unwrap();
    let (axes, resolved) = FeatureBuilder::default()
        .build_resolved(&data, None, None)
        .unwrap();

    assert_eq!(resolved.time_column, "date");
    assert_eq!(resolved.target_column, "value");
    assert_eq!(resolved.density_columns, vec!["a", "b"]);

    let psi = axes.psi_trigger_rate.value().unwrap();
    assert!(psi > 0.1, "psi {psi}");
    // Time-ordered trend: rolling windows see far less spread than the whole.
    assert!(axes.st_var_ratio.value().unwrap() < 0.1);
    assert!(axes.density_k.is_some());
    assert!(axes.silhouette_approx.value().unwrap() > 0.5);
}

#[test]
fn rolling_psi_mode_reports_a_window_share() {
    let data = read_csv(drifting_csv(500).as_bytes()).unwrap();
    let mut config = EngineConfig::default();
    config.temporal.psi_mode = PsiMode::Rolling;
    let axes = FeatureBuilder::new(config).build(&data, None, None).unwrap();
    // Every 100-row window of a trend sits in a narrow slice of the range.
    let rate = axes.psi_trigger_rate.value().unwrap();
    assert!(rate > 0.9 && rate <= 1.0, "rate {rate}");
}

#[test]
fn short_table_keeps_shape_metrics() {
    let data = read_csv(drifting_csv(20).as_bytes()).unwrap();
    let axes = FeatureBuilder::default().build(&data, None, None).unwrap();

    for m in [&axes.st_var_ratio, &axes.seasonal_corr, &axes.psi_trigger_rate] {
        assert_eq!(
            m.reason(),
            Some(&Unavailable::InsufficientData {
                required: 30,
                actual: 20
            })
        );
    }
    assert!(axes.sk_k_score.is_available());
    assert!(axes.outlier_ratio.is_available());
    assert!(axes.density_k.is_none());
}

#[test]
fn mid_length_series_reports_zero_psi() {
    let data = read_csv(drifting_csv(80).as_bytes()).unwrap();
    let axes = FeatureBuilder::default().build(&data, None, None).unwrap();
    assert_eq!(axes.psi_trigger_rate.value(), Some(0.0));
    assert!(axes.st_var_ratio.is_available());
}

#[test]
fn lowered_density_gate_admits_small_tables() {
    let data = read_csv(drifting_csv(20).as_bytes()).unwrap();
    let mut config = EngineConfig::default();
    config.density.min_samples = 10;
    let axes = FeatureBuilder::new(config).build(&data, None, None).unwrap();
    assert!(axes.density_k.is_some());
}

#[test]
fn unknown_feature_column_is_an_error() {
    let data = read_csv(drifting_csv(40).as_bytes()).unwrap();
    let err = FeatureBuilder::default()
        .build(&data, None, Some("missing"))
        .unwrap_err();
    assert_eq!(err, AxesError::MissingColumn("missing".into()));
}
