//! Distributional shape of a single numeric sequence.

use serde::{Deserialize, Serialize};

use crate::dip::{approximate_dip, DipConfig, MIN_DIP_SAMPLES};
use crate::metric::Metric;
use crate::sample::{clean, excess_kurtosis, quantile_sorted, skewness, sorted};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Tukey fence multiplier (default 1.5).
    pub iqr_multiplier: f64,
    /// Minimum finite values for skew/kurtosis/outliers (default 4).
    pub min_values: usize,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
            min_values: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMetrics {
    /// `|skewness| + |excess kurtosis - 3|`.
    pub sk_k_score: Metric,
    /// Share of values outside the IQR fences.
    pub outlier_ratio: Metric,
    pub dip_stat: Metric,
}

pub fn compute_shape_metrics(values: &[f64], config: &ShapeConfig, dip: &DipConfig) -> ShapeMetrics {
    let x = clean(values);
    let required = config.min_values.max(4);

    let dip_stat = match approximate_dip(&x, dip.grid_size) {
        Some(d) => Metric::from_f64(d),
        None => Metric::insufficient(MIN_DIP_SAMPLES, x.len()),
    };

    if x.len() < required {
        return ShapeMetrics {
            sk_k_score: Metric::insufficient(required, x.len()),
            outlier_ratio: Metric::insufficient(required, x.len()),
            dip_stat,
        };
    }

    let sk_k_score = match (skewness(&x), excess_kurtosis(&x)) {
        (Some(s), Some(k)) => Metric::from_f64(s.abs() + (k - 3.0).abs()),
        _ => Metric::insufficient(required, x.len()),
    };

    ShapeMetrics {
        sk_k_score,
        outlier_ratio: outlier_ratio(&x, config.iqr_multiplier),
        dip_stat,
    }
}

fn outlier_ratio(x: &[f64], multiplier: f64) -> Metric {
    let s = sorted(x);
    let (Some(q1), Some(q3)) = (quantile_sorted(&s, 0.25), quantile_sorted(&s, 0.75)) else {
        return Metric::insufficient(1, 0);
    };
    let iqr = (q3 - q1) + 1e-9;
    let lo = q1 - multiplier * iqr;
    let hi = q3 + multiplier * iqr;
    let outside = x.iter().filter(|&&v| v < lo || v > hi).count();
    Metric::from_f64(outside as f64 / x.len() as f64)
}
