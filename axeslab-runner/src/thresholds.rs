//! Threshold profiles: assert report metrics against per-metric bounds.
//!
//! A profile maps metric keys to bounds. Keys may be dotted paths into a
//! nested report, so the same profile format covers a flat `run-axes`
//! report (`dip_stat`) and a `run-full` report (`axes_metrics.dip_stat`).
//!
//! ```toml
//! [metrics.dip_stat]
//! max = 0.3
//! warn_above = 0.02
//! allow_none = true
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse profile TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("profile has no metrics")]
    EmptyProfile,

    #[error("metric {metric}: min {min} is above max {max}")]
    InvertedBounds { metric: String, min: f64, max: f64 },
}

/// Bounds for one metric. All bounds are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Values above this are warnings, or failures under `fail_on_warn`.
    pub warn_above: Option<f64>,
    /// A missing or `null` metric passes instead of failing.
    pub allow_none: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricBounds>,
}

impl ThresholdProfile {
    /// Load a profile; `.toml` files are TOML, anything else JSON.
    pub fn from_file(path: &Path) -> Result<Self, ThresholdError> {
        let content = std::fs::read_to_string(path).map_err(|source| ThresholdError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ThresholdError> {
        let profile: Self = toml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json(content: &str) -> Result<Self, ThresholdError> {
        let profile: Self = serde_json::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.metrics.is_empty() {
            return Err(ThresholdError::EmptyProfile);
        }
        for (metric, bounds) in &self.metrics {
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return Err(ThresholdError::InvertedBounds {
                        metric: metric.clone(),
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Fail => write!(f, "FAIL"),
        }
    }
}

/// One observation about one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub metric: String,
    pub severity: Severity,
    pub message: String,
}

/// Result of checking one report against one profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdOutcome {
    pub findings: Vec<Finding>,
}

impl ThresholdOutcome {
    pub fn passed(&self) -> bool {
        self.findings.iter().all(|f| f.severity < Severity::Fail)
    }

    pub fn warnings(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warn)
            .count()
    }

    /// Process exit code: `0` passed, `1` a threshold failed.
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    fn push(&mut self, metric: &str, severity: Severity, message: String) {
        self.findings.push(Finding {
            metric: metric.to_string(),
            severity,
            message,
        });
    }
}

/// Follow a dotted key through nested JSON objects.
fn lookup<'a>(report: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(report, |node, part| node.get(part))
}

/// Check every profile metric against `report`.
///
/// With `fail_on_warn`, values above `warn_above` fail instead of warning.
pub fn assert_thresholds(
    report: &Value,
    profile: &ThresholdProfile,
    fail_on_warn: bool,
) -> ThresholdOutcome {
    let mut outcome = ThresholdOutcome::default();
    for (key, bounds) in &profile.metrics {
        let value = match lookup(report, key) {
            None | Some(Value::Null) => {
                if bounds.allow_none {
                    outcome.push(key, Severity::Info, format!("metric '{key}' is null (allowed)"));
                } else {
                    outcome.push(key, Severity::Fail, format!("metric '{key}' is null but allow_none is false"));
                }
                continue;
            }
            Some(value) => value,
        };
        let Some(x) = value.as_f64() else {
            outcome.push(key, Severity::Fail, format!("metric '{key}' is not numeric: {value}"));
            continue;
        };

        if let Some(min) = bounds.min.filter(|&min| x < min) {
            outcome.push(key, Severity::Fail, format!("metric '{key}' value {x} < min {min}"));
        }
        if let Some(max) = bounds.max.filter(|&max| x > max) {
            outcome.push(key, Severity::Fail, format!("metric '{key}' value {x} > max {max}"));
        }
        if let Some(warn) = bounds.warn_above.filter(|&warn| x > warn) {
            let severity = if fail_on_warn {
                Severity::Fail
            } else {
                Severity::Warn
            };
            outcome.push(key, severity, format!("metric '{key}' value {x} > warn_above {warn}"));
        }
    }
    debug!(
        findings = outcome.findings.len(),
        passed = outcome.passed(),
        "thresholds: checked"
    );
    outcome
}
