//! JSON report shapes and writing.
//!
//! Every command writes one pretty-printed JSON document. Unavailable
//! metrics serialize as `null`; parent directories of the output path are
//! created on demand.

use std::path::Path;

use anyhow::{Context, Result};
use axeslab_core::PsiMode;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::axes::AxesVector;
use crate::config::EngineConfig;
use crate::retention::RetentionReport;

pub const ANALYSIS_TYPE_FULL: &str = "full_metrics";

/// Run context recorded alongside `run-full` results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullMetadata {
    pub version: String,
    pub analysis_type: String,
    pub generated_at: String,
    pub base_samples: usize,
    pub shifted_samples: Option<usize>,
    pub feature_column: String,
    pub time_column: String,
    pub min_samples_required: usize,
    pub psi_threshold: f64,
    pub psi_bins: usize,
    pub psi_mode: PsiMode,
    pub dip_threshold: f64,
    pub dataset_fingerprint: String,
}

impl FullMetadata {
    /// Metadata stamped with the crate version and the current UTC time.
    pub fn new(
        config: &EngineConfig,
        base_samples: usize,
        shifted_samples: Option<usize>,
        feature_column: impl Into<String>,
        time_column: impl Into<String>,
        dataset_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            analysis_type: ANALYSIS_TYPE_FULL.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            base_samples,
            shifted_samples,
            feature_column: feature_column.into(),
            time_column: time_column.into(),
            min_samples_required: config.retention.min_rows,
            psi_threshold: config.psi.threshold,
            psi_bins: config.psi.bins,
            psi_mode: config.temporal.psi_mode,
            dip_threshold: config.dip.threshold,
            dataset_fingerprint: dataset_fingerprint.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullReport {
    pub metadata: FullMetadata,
    pub axes_metrics: AxesVector,
    /// `None` when retention was skipped; serialized as `null`.
    pub retention_metrics: Option<RetentionReport>,
}

/// Serialize `value` as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize report to JSON")
}

/// Write `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
    }
    let json = to_json(value)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    Ok(())
}

/// Read a JSON document written by one of the jobs.
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse report: {}", path.display()))
}
