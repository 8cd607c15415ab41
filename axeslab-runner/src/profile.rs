//! Dataset profile: shape, missingness and per-column summary statistics.

use axeslab_core::{sample, ColumnKind, Dataset};
use serde::Serialize;

/// Rows hashed into the fingerprint.
pub const FINGERPRINT_ROWS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

impl NumericSummary {
    /// `None` for a column without finite values.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let sorted = sample::sorted(values);
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let std = if sorted.len() > 1 {
            sample::sample_variance(&sorted).sqrt()
        } else {
            0.0
        };
        Some(Self {
            count: sorted.len(),
            mean: sample::mean(&sorted),
            std,
            min,
            p25: sample::quantile_sorted(&sorted, 0.25)?,
            p50: sample::quantile_sorted(&sorted, 0.5)?,
            p75: sample::quantile_sorted(&sorted, 0.75)?,
            max,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// Share of missing cells, rounded to 4 decimals.
    pub null_fraction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<NumericSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: usize,
    pub fingerprint: String,
    pub column_profiles: Vec<ColumnProfile>,
}

impl DatasetProfile {
    pub fn compute(data: &Dataset) -> Self {
        let rows = data.n_rows();
        let column_profiles = data
            .columns()
            .iter()
            .map(|col| {
                let null_fraction = if rows == 0 {
                    0.0
                } else {
                    round4(col.null_count() as f64 / rows as f64)
                };
                ColumnProfile {
                    name: col.name.clone(),
                    kind: col.kind(),
                    null_fraction,
                    summary: col
                        .as_numeric()
                        .and_then(|v| NumericSummary::compute(&sample::clean_optional(v))),
                }
            })
            .collect();

        Self {
            rows,
            columns: data.n_columns(),
            fingerprint: dataset_fingerprint(data),
            column_profiles,
        }
    }
}

fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

/// BLAKE3 hex digest of the header and the first [`FINGERPRINT_ROWS`] rows.
pub fn dataset_fingerprint(data: &Dataset) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data.column_names().join(",").as_bytes());
    hasher.update(b"\n");
    for row in 0..data.n_rows().min(FINGERPRINT_ROWS) {
        let cells: Vec<String> = data.columns().iter().map(|c| c.cell_string(row)).collect();
        hasher.update(cells.join(",").as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}
