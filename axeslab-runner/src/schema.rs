//! Shape check for axes reports written by `run-axes` and `run-full`.

use std::fmt;

use serde_json::Value;

use crate::axes::AxesVector;

/// One way a report departs from the axes schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    NotAnObject,
    MissingKey(&'static str),
    /// A float metric holding something other than a number or `null`.
    NotNumeric(&'static str),
    /// `density_k` holding something other than a non-negative integer or `null`.
    NotAnInteger(&'static str),
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::NotAnObject => write!(f, "axes metrics must be a JSON object"),
            SchemaViolation::MissingKey(key) => write!(f, "missing key '{key}'"),
            SchemaViolation::NotNumeric(key) => write!(f, "'{key}' must be a number or null"),
            SchemaViolation::NotAnInteger(key) => {
                write!(f, "'{key}' must be a non-negative integer or null")
            }
        }
    }
}

/// Validate an axes report. A `run-full` document is checked through its
/// `axes_metrics` object; extra keys are allowed.
pub fn validate_axes_report(report: &Value) -> Vec<SchemaViolation> {
    let axes = report.get("axes_metrics").unwrap_or(report);
    let Some(obj) = axes.as_object() else {
        return vec![SchemaViolation::NotAnObject];
    };

    let mut violations = Vec::new();
    for key in AxesVector::KEYS {
        let Some(value) = obj.get(key) else {
            violations.push(SchemaViolation::MissingKey(key));
            continue;
        };
        if key == "density_k" {
            if !(value.is_null() || value.is_u64()) {
                violations.push(SchemaViolation::NotAnInteger(key));
            }
        } else if !(value.is_null() || value.is_number()) {
            violations.push(SchemaViolation::NotNumeric(key));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axes::compute_axes;
    use axeslab_core::{Column, Dataset};
    use serde_json::json;

    #[test]
    fn serialized_axes_vector_is_valid() {
        let n = 60;
        let t = Dataset::new(vec![
            Column::numeric("t", (0..n).map(|i| Some(i as f64)).collect()),
            Column::numeric("y", (0..n).map(|i| Some((i as f64).sqrt())).collect()),
        ])
        .unwrap();
        let axes = compute_axes(&t, None, None).unwrap();
        let report = serde_json::to_value(&axes).unwrap();
        assert_eq!(validate_axes_report(&report), vec![]);
        assert_eq!(validate_axes_report(&json!({ "axes_metrics": report })), vec![]);
    }

    #[test]
    fn reports_each_bad_key() {
        let report = json!({
            "st_var_ratio": 0.4,
            "seasonal_corr": "n/a",
            "psi_trigger_rate": 0.0,
            "sk_k_score": 3.1,
            "outlier_ratio": null,
            "dip_stat": 0.0,
            "intra_cluster_density": 0.2,
            "density_k": 2.5
        });
        assert_eq!(
            validate_axes_report(&report),
            vec![
                SchemaViolation::NotNumeric("seasonal_corr"),
                SchemaViolation::MissingKey("silhouette_approx"),
                SchemaViolation::NotAnInteger("density_k"),
            ]
        );
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(validate_axes_report(&json!([1, 2])), vec![SchemaViolation::NotAnObject]);
    }
}
