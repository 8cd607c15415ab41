//! AxesLab Runner: axes composition, retention evaluation, reports, jobs.
//!
//! This crate builds on `axeslab-core` to provide:
//! - Engine configuration loaded from TOML
//! - CSV loading into the core table model
//! - The axes feature composer
//! - A seeded random-forest classifier and the retention evaluator
//! - Dataset profiles and fingerprints
//! - Synthetic shifted tables for retention experiments
//! - Threshold profiles and the axes report schema check
//! - JSON reports and the jobs behind each CLI command

pub mod axes;
pub mod config;
pub mod data_loader;
pub mod forest;
pub mod jobs;
pub mod profile;
pub mod report;
pub mod retention;
pub mod schema;
pub mod shift;
pub mod thresholds;

pub use axes::{compute_axes, AxesError, AxesVector, ComposerConfig, FeatureBuilder, ResolvedColumns};
pub use config::{ConfigError, EngineConfig};
pub use data_loader::{load_csv, read_csv, save_csv, write_csv, LoadError};
pub use forest::{DecisionTree, ForestConfig, ForestError, RandomForest};
pub use jobs::{
    run_axes_job, run_full_job, run_profile_job, run_retention_job, run_schema_job, run_shift_job,
    run_threshold_job, AxesJob, FullJob, ProfileJob, RetentionJob, ShiftJob, ThresholdJob,
};
pub use profile::{dataset_fingerprint, ColumnProfile, DatasetProfile, NumericSummary};
pub use report::{read_json, write_json, FullMetadata, FullReport};
pub use retention::{
    evaluate_retention, holdout_split, macro_f1, RetentionConfig, RetentionError,
    RetentionReport, ShiftIntensity,
};
pub use schema::{validate_axes_report, SchemaViolation};
pub use shift::{shift_dataset, shift_features, ShiftConfig, ShiftError};
pub use thresholds::{
    assert_thresholds, Finding, MetricBounds, Severity, ThresholdError, ThresholdOutcome,
    ThresholdProfile,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<EngineConfig>();
        assert_sync::<EngineConfig>();
        assert_send::<RetentionConfig>();
        assert_sync::<RetentionConfig>();
        assert_send::<ForestConfig>();
        assert_sync::<ForestConfig>();
        assert_send::<ShiftConfig>();
        assert_sync::<ShiftConfig>();
        assert_send::<ThresholdProfile>();
        assert_sync::<ThresholdProfile>();
    }

    #[test]
    fn axes_vector_is_send_sync() {
        assert_send::<AxesVector>();
        assert_sync::<AxesVector>();
    }

    #[test]
    fn feature_builder_is_send_sync() {
        assert_send::<FeatureBuilder>();
        assert_sync::<FeatureBuilder>();
    }

    #[test]
    fn random_forest_is_send_sync() {
        assert_send::<RandomForest>();
        assert_sync::<RandomForest>();
    }

    #[test]
    fn retention_report_is_send_sync() {
        assert_send::<RetentionReport>();
        assert_sync::<RetentionReport>();
    }

    #[test]
    fn full_report_is_send_sync() {
        assert_send::<FullReport>();
        assert_sync::<FullReport>();
    }

    #[test]
    fn dataset_profile_is_send_sync() {
        assert_send::<DatasetProfile>();
        assert_sync::<DatasetProfile>();
    }
}
