//! Top-level jobs: load inputs, compute, write the JSON report.
//!
//! Each job takes its paths and the engine config explicitly and returns
//! the report it wrote, so callers can print a summary without re-reading
//! the output file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use axeslab_core::Dataset;

use crate::axes::{AxesVector, FeatureBuilder};
use crate::config::EngineConfig;
use crate::data_loader::{load_csv, save_csv};
use crate::profile::{dataset_fingerprint, DatasetProfile};
use crate::report::{read_json, write_json, FullMetadata, FullReport};
use crate::retention::{evaluate_retention, RetentionReport};
use crate::schema::{validate_axes_report, SchemaViolation};
use crate::shift::shift_dataset;
use crate::thresholds::{assert_thresholds, ThresholdOutcome, ThresholdProfile};

#[derive(Debug, Clone)]
pub struct AxesJob {
    pub input: PathBuf,
    pub out: PathBuf,
    pub feature_col: Option<String>,
    pub time_col: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetentionJob {
    pub base: PathBuf,
    pub shifted: PathBuf,
    pub out: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FullJob {
    pub input: PathBuf,
    pub shifted: Option<PathBuf>,
    pub out: PathBuf,
    pub feature_col: Option<String>,
    pub time_col: Option<String>,
    /// `false` skips retention even when a shifted table is given.
    pub retention: bool,
}

#[derive(Debug, Clone)]
pub struct ProfileJob {
    pub input: PathBuf,
    pub out: PathBuf,
}

/// Write a synthetically shifted copy of a table.
#[derive(Debug, Clone)]
pub struct ShiftJob {
    pub input: PathBuf,
    pub out: PathBuf,
}

/// Check a written report against a threshold profile.
#[derive(Debug, Clone)]
pub struct ThresholdJob {
    pub metrics: PathBuf,
    pub profile: PathBuf,
    pub fail_on_warn: bool,
}

pub fn run_axes_job(job: &AxesJob, config: &EngineConfig) -> Result<AxesVector> {
    let data = load_csv(&job.input)
        .with_context(|| format!("failed to load {}", job.input.display()))?;
    info!(input = %job.input.display(), rows = data.n_rows(), "run-axes: loaded");

    let axes = FeatureBuilder::new(config.clone())
        .build(&data, job.time_col.as_deref(), job.feature_col.as_deref())
        .context("failed to compute axes metrics")?;

    write_json(&job.out, &axes)?;
    info!(
        out = %job.out.display(),
        available = axes.available_count(),
        "run-axes: report written"
    );
    Ok(axes)
}

pub fn run_retention_job(job: &RetentionJob, config: &EngineConfig) -> Result<RetentionReport> {
    let base = load_csv(&job.base)
        .with_context(|| format!("failed to load base table {}", job.base.display()))?;
    let shifted = load_csv(&job.shifted)
        .with_context(|| format!("failed to load shifted table {}", job.shifted.display()))?;
    info!(
        base_rows = base.n_rows(),
        shifted_rows = shifted.n_rows(),
        "run-retention: loaded"
    );

    let report = evaluate_retention(&base, &shifted, &config.retention)
        .context("failed to evaluate retention")?;

    write_json(&job.out, &report)?;
    info!(out = %job.out.display(), "run-retention: report written");
    Ok(report)
}

pub fn run_full_job(job: &FullJob, config: &EngineConfig) -> Result<FullReport> {
    let data = load_csv(&job.input)
        .with_context(|| format!("failed to load {}", job.input.display()))?;
    info!(input = %job.input.display(), rows = data.n_rows(), "run-full: loaded");

    let (axes, resolved) = FeatureBuilder::new(config.clone())
        .build_resolved(&data, job.time_col.as_deref(), job.feature_col.as_deref())
        .context("failed to compute axes metrics")?;

    let shifted = match (&job.shifted, job.retention) {
        (Some(path), true) => Some(
            load_csv(path)
                .with_context(|| format!("failed to load shifted table {}", path.display()))?,
        ),
        _ => None,
    };

    let retention_metrics = match &shifted {
        Some(shifted) => Some(
            evaluate_retention(&data, shifted, &config.retention)
                .context("failed to evaluate retention")?,
        ),
        None => {
            info!("run-full: retention skipped");
            None
        }
    };

    let report = FullReport {
        metadata: FullMetadata::new(
            config,
            data.n_rows(),
            shifted.as_ref().map(|s| s.n_rows()),
            resolved.target_column,
            resolved.time_column,
            dataset_fingerprint(&data),
        ),
        axes_metrics: axes,
        retention_metrics,
    };

    write_json(&job.out, &report)?;
    info!(out = %job.out.display(), "run-full: report written");
    Ok(report)
}

pub fn run_profile_job(job: &ProfileJob) -> Result<DatasetProfile> {
    let data = load_csv(&job.input)
        .with_context(|| format!("failed to load {}", job.input.display()))?;
    let profile = DatasetProfile::compute(&data);
    write_json(&job.out, &profile)?;
    info!(
        out = %job.out.display(),
        rows = profile.rows,
        columns = profile.columns,
        "profile: report written"
    );
    Ok(profile)
}

pub fn run_shift_job(job: &ShiftJob, config: &EngineConfig) -> Result<Dataset> {
    let data = load_csv(&job.input)
        .with_context(|| format!("failed to load {}", job.input.display()))?;
    let shifted = shift_dataset(&data, &config.shift)
        .with_context(|| format!("failed to shift {}", job.input.display()))?;
    save_csv(&job.out, &shifted)
        .with_context(|| format!("failed to write {}", job.out.display()))?;
    info!(out = %job.out.display(), rows = shifted.n_rows(), "shift: table written");
    Ok(shifted)
}

/// Load errors (missing files, bad JSON, empty profile) are `Err`; threshold
/// violations are reported in the outcome.
pub fn run_threshold_job(job: &ThresholdJob) -> Result<ThresholdOutcome> {
    let report = read_json(&job.metrics)?;
    let profile = ThresholdProfile::from_file(&job.profile)
        .with_context(|| format!("failed to load profile {}", job.profile.display()))?;
    let outcome = assert_thresholds(&report, &profile, job.fail_on_warn);
    info!(
        metrics = %job.metrics.display(),
        passed = outcome.passed(),
        warnings = outcome.warnings(),
        "assert-thresholds: checked"
    );
    Ok(outcome)
}

pub fn run_schema_job(metrics: &Path) -> Result<Vec<SchemaViolation>> {
    let report = read_json(metrics)?;
    let violations = validate_axes_report(&report);
    info!(
        metrics = %metrics.display(),
        violations = violations.len(),
        "validate-schema: checked"
    );
    Ok(violations)
}
