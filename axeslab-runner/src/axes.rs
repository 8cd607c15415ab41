//! Axes feature composer.
//!
//! Turns one table into a flat axes vector:
//! - temporal stability of the target in time order
//! - distributional shape of the target
//! - cluster density of the remaining numeric columns
//!
//! Each group degrades independently: a table too short for temporal
//! metrics still gets shape and density values when their own gates pass.

use axeslab_core::{
    compute_density_metrics, compute_shape_metrics, compute_temporal_metrics, Column, Dataset,
    DensityMetrics, Metric, ShapeMetrics, TableError, TemporalMetrics,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// A text target with at most this many distinct values is encoded as
    /// category codes (default 50).
    pub max_category_codes: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_category_codes: 50,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AxesError {
    #[error("dataset has no columns")]
    EmptyDataset,

    #[error("column not found: {0}")]
    MissingColumn(String),

    #[error("target column {0} is not numeric and no numeric column can replace it")]
    NoNumericTarget(String),

    #[error(transparent)]
    Table(TableError),
}

impl From<TableError> for AxesError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::MissingColumn(name) => AxesError::MissingColumn(name),
            TableError::NotNumeric(name) => AxesError::NoNumericTarget(name),
            other => AxesError::Table(other),
        }
    }
}

/// The per-dataset indicator set. Serializes flat; unavailable metrics
/// become `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxesVector {
    pub st_var_ratio: Metric,
    pub seasonal_corr: Metric,
    pub psi_trigger_rate: Metric,
    pub sk_k_score: Metric,
    pub outlier_ratio: Metric,
    pub dip_stat: Metric,
    pub intra_cluster_density: Metric,
    pub silhouette_approx: Metric,
    pub density_k: Option<usize>,
}

impl AxesVector {
    pub const KEYS: [&'static str; 9] = [
        "st_var_ratio",
        "seasonal_corr",
        "psi_trigger_rate",
        "sk_k_score",
        "outlier_ratio",
        "dip_stat",
        "intra_cluster_density",
        "silhouette_approx",
        "density_k",
    ];

    fn from_parts(t: TemporalMetrics, s: ShapeMetrics, d: DensityMetrics) -> Self {
        Self {
            st_var_ratio: t.st_var_ratio,
            seasonal_corr: t.seasonal_corr,
            psi_trigger_rate: t.psi_trigger_rate,
            sk_k_score: s.sk_k_score,
            outlier_ratio: s.outlier_ratio,
            dip_stat: s.dip_stat,
            intra_cluster_density: d.intra_cluster_density,
            silhouette_approx: d.silhouette_approx,
            density_k: d.density_k,
        }
    }

    /// The float-valued metrics in report order (`density_k` excluded).
    pub fn metrics(&self) -> [(&'static str, &Metric); 8] {
        [
            ("st_var_ratio", &self.st_var_ratio),
            ("seasonal_corr", &self.seasonal_corr),
            ("psi_trigger_rate", &self.psi_trigger_rate),
            ("sk_k_score", &self.sk_k_score),
            ("outlier_ratio", &self.outlier_ratio),
            ("dip_stat", &self.dip_stat),
            ("intra_cluster_density", &self.intra_cluster_density),
            ("silhouette_approx", &self.silhouette_approx),
        ]
    }

    pub fn available_count(&self) -> usize {
        self.metrics().iter().filter(|(_, m)| m.is_available()).count()
    }
}

/// The columns an axes run actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumns {
    pub time_column: String,
    /// Name of the column the target values came from. Differs from the
    /// requested target when a text target fell back to a numeric column.
    pub target_column: String,
    pub target_encoded: bool,
    pub density_columns: Vec<String>,
}

/// Computes axes vectors under one engine configuration.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: EngineConfig,
}

impl FeatureBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the axes vector. `time_col` defaults to the first column and
    /// `target_col` to the last.
    pub fn build(
        &self,
        data: &Dataset,
        time_col: Option<&str>,
        target_col: Option<&str>,
    ) -> Result<AxesVector, AxesError> {
        self.build_resolved(data, time_col, target_col).map(|(axes, _)| axes)
    }

    /// Like [`build`](Self::build), also reporting the resolved columns.
    pub fn build_resolved(
        &self,
        data: &Dataset,
        time_col: Option<&str>,
        target_col: Option<&str>,
    ) -> Result<(AxesVector, ResolvedColumns), AxesError> {
        let (resolved, target) = self.resolve(data, time_col, target_col)?;
        debug!(
            time = %resolved.time_column,
            target = %resolved.target_column,
            encoded = resolved.target_encoded,
            density_columns = resolved.density_columns.len(),
            "axes: resolved columns"
        );

        let order = data.time_order(&resolved.time_column)?;
        let ordered: Vec<f64> = order
            .iter()
            .filter_map(|&row| target[row])
            .filter(|v| v.is_finite())
            .collect();

        let temporal = compute_temporal_metrics(&ordered, &self.config.temporal, &self.config.psi);
        let shape = compute_shape_metrics(&ordered, &self.config.shape, &self.config.dip);

        let density = if resolved.density_columns.is_empty() {
            compute_density_metrics(None, &self.config.density)
        } else {
            let names: Vec<&str> = resolved.density_columns.iter().map(String::as_str).collect();
            let matrix = data.numeric_matrix(&names)?;
            compute_density_metrics(Some(&matrix), &self.config.density)
        };

        Ok((AxesVector::from_parts(temporal, shape, density), resolved))
    }

    /// Resolve time, target and density columns, returning the target
    /// values in table row order.
    pub fn resolve(
        &self,
        data: &Dataset,
        time_col: Option<&str>,
        target_col: Option<&str>,
    ) -> Result<(ResolvedColumns, Vec<Option<f64>>), AxesError> {
        let (first, last) = match (data.first_column(), data.last_column()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(AxesError::EmptyDataset),
        };

        let time = match time_col {
            Some(name) => data.column(name)?,
            None => first,
        };
        let requested = match target_col {
            Some(name) => data.column(name)?,
            None => last,
        };

        let (target_column, target_encoded, values) = self.target_values(data, requested)?;

        let density_columns = data
            .numeric_column_names()
            .into_iter()
            .filter(|name| *name != target_column && is_density_feature(name))
            .map(str::to_string)
            .collect();

        Ok((
            ResolvedColumns {
                time_column: time.name.clone(),
                target_column,
                target_encoded,
                density_columns,
            },
            values,
        ))
    }

    fn target_values(
        &self,
        data: &Dataset,
        requested: &Column,
    ) -> Result<(String, bool, Vec<Option<f64>>), AxesError> {
        if let Some(values) = requested.as_numeric() {
            return Ok((requested.name.clone(), false, values.to_vec()));
        }
        if let Some(codes) = requested.category_codes(self.config.composer.max_category_codes) {
            return Ok((requested.name.clone(), true, codes));
        }
        let fallback = data
            .columns()
            .iter()
            .rev()
            .find(|c| c.is_numeric())
            .ok_or_else(|| AxesError::NoNumericTarget(requested.name.clone()))?;
        warn!(
            requested = %requested.name,
            fallback = %fallback.name,
            "text target has too many categories; using last numeric column"
        );
        let values = data.numeric_values(&fallback.name)?.to_vec();
        Ok((fallback.name.clone(), false, values))
    }
}

/// Time-like and literal `target` columns never enter the density matrix.
fn is_density_feature(name: &str) -> bool {
    let lower = name.to_lowercase();
    !(lower == "target" || lower.starts_with("time") || lower.ends_with("stamp"))
}

/// Compute an axes vector with the default engine configuration.
pub fn compute_axes(
    data: &Dataset,
    time_col: Option<&str>,
    target_col: Option<&str>,
) -> Result<AxesVector, AxesError> {
    FeatureBuilder::default().build(data, time_col, target_col)
}
