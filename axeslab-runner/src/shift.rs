//! Deterministic synthetic shift of a table's numeric features.
//!
//! Feature columns are numeric columns other than the last column (the
//! class target) and columns named `target`, `time`, `timestamp` or
//! `datetime`. They are transformed in rotation:
//! - feature 0, 3, 6, ...: `x + mean_shift`
//! - feature 1, 4, 7, ...: `x * scale`
//! - feature 2, 5, 8, ...: `x + N(0, (noise_fraction * std)²)`
//!
//! Missing cells stay missing. Noise draws come from a per-column seed, so
//! the output depends only on the input and `seed`.

use axeslab_core::{sample, standard_normal, Column, ColumnData, Dataset, SeedHierarchy, TableError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const RESERVED_NAMES: [&str; 4] = ["target", "time", "timestamp", "datetime"];

#[derive(Debug, Error, PartialEq)]
pub enum ShiftError {
    #[error("no numeric feature columns to shift")]
    NoFeatures,

    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    /// Added to mean-shifted features (default 0.8).
    pub mean_shift: f64,
    /// Multiplies scaled features (default 1.15).
    pub scale: f64,
    /// Noise std as a fraction of the column's sample std (default 0.2).
    pub noise_fraction: f64,
    pub seed: u64,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            mean_shift: 0.8,
            scale: 1.15,
            noise_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Names of the columns [`shift_dataset`] transforms, in table order.
pub fn shift_features(data: &Dataset) -> Vec<&str> {
    let target = data.last_column().map(|c| c.name.as_str());
    data.numeric_column_names()
        .into_iter()
        .filter(|name| Some(*name) != target)
        .filter(|name| !RESERVED_NAMES.contains(&name.to_lowercase().as_str()))
        .collect()
}

/// A copy of `data` with its feature columns shifted.
pub fn shift_dataset(data: &Dataset, config: &ShiftConfig) -> Result<Dataset, ShiftError> {
    let features = shift_features(data);
    if features.is_empty() {
        return Err(ShiftError::NoFeatures);
    }
    let seeds = SeedHierarchy::new(config.seed);

    let columns = data
        .columns()
        .iter()
        .map(|col| {
            let (Some(index), ColumnData::Numeric(values)) =
                (features.iter().position(|f| *f == col.name), &col.data)
            else {
                return col.clone();
            };
            let shifted: Vec<Option<f64>> = match index % 3 {
                0 => values.iter().map(|v| v.map(|x| x + config.mean_shift)).collect(),
                1 => values.iter().map(|v| v.map(|x| x * config.scale)).collect(),
                _ => {
                    let std = sample::sample_variance(&sample::clean_optional(values)).sqrt();
                    let sigma = if std.is_finite() { std * config.noise_fraction } else { 0.0 };
                    let mut rng = seeds.rng_for("shift", index as u64, 0);
                    // One draw per row, missing or not, so later rows do not
                    // depend on where earlier cells are missing.
                    values
                        .iter()
                        .map(|v| {
                            let noise = sigma * standard_normal(&mut rng);
                            v.map(|x| x + noise)
                        })
                        .collect()
                }
            };
            debug!(column = %col.name, rule = index % 3, "shift: transformed");
            Column::numeric(col.name.clone(), shifted)
        })
        .collect();
    Ok(Dataset::new(columns)?)
}
