//! Engine configuration loaded from TOML.
//!
//! Every section has defaults and is `#[serde(default)]`, so a file only
//! needs the keys it overrides:
//!
//! ```toml
//! [psi]
//! bins = 12
//!
//! [density]
//! k_max = 6
//! ```

use std::path::Path;

use axeslab_core::{DensityConfig, DipConfig, PsiConfig, ShapeConfig, TemporalConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::axes::ComposerConfig;
use crate::retention::RetentionConfig;
use crate::shift::ShiftConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [{section}] {field}: {reason}")]
    Invalid {
        section: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// All tunables of the metrics engine, passed explicitly into every job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub psi: PsiConfig,
    pub dip: DipConfig,
    pub density: DensityConfig,
    pub temporal: TemporalConfig,
    pub shape: ShapeConfig,
    pub composer: ComposerConfig,
    pub retention: RetentionConfig,
    pub shift: ShiftConfig,
}

impl EngineConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(section: &'static str, field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                section,
                field,
                reason: reason.into(),
            }
        }

        if self.psi.bins < 2 {
            return Err(invalid("psi", "bins", "must be at least 2"));
        }
        if self.psi.threshold.is_nan() || self.psi.threshold < 0.0 {
            return Err(invalid("psi", "threshold", "must be a non-negative number"));
        }
        if self.dip.grid_size < 3 {
            return Err(invalid("dip", "grid_size", "must be at least 3"));
        }
        if self.density.k_min < 2 {
            return Err(invalid("density", "k_min", "must be at least 2"));
        }
        if self.density.k_max < self.density.k_min {
            return Err(invalid(
                "density",
                "k_max",
                format!("{} is below k_min {}", self.density.k_max, self.density.k_min),
            ));
        }
        if self.density.n_init == 0 {
            return Err(invalid("density", "n_init", "must be at least 1"));
        }
        if self.density.min_samples == 0 {
            return Err(invalid("density", "min_samples", "must be at least 1"));
        }
        if self.temporal.min_window < 2 || self.temporal.max_window < self.temporal.min_window {
            return Err(invalid(
                "temporal",
                "min_window",
                "need 2 <= min_window <= max_window",
            ));
        }
        if self.temporal.min_lag == 0 || self.temporal.max_lag < self.temporal.min_lag {
            return Err(invalid("temporal", "min_lag", "need 1 <= min_lag <= max_lag"));
        }
        if self.temporal.psi_window == 0 {
            return Err(invalid("temporal", "psi_window", "must be at least 1"));
        }
        if self.shape.iqr_multiplier.is_nan() || self.shape.iqr_multiplier <= 0.0 {
            return Err(invalid("shape", "iqr_multiplier", "must be positive"));
        }
        let fraction = self.retention.test_fraction;
        if fraction.is_nan() || fraction <= 0.0 || fraction >= 1.0 {
            return Err(invalid(
                "retention",
                "test_fraction",
                format!("{fraction} is outside (0, 1)"),
            ));
        }
        if self.retention.n_trees == 0 {
            return Err(invalid("retention", "n_trees", "must be at least 1"));
        }
        if self.retention.min_samples_split < 2 {
            return Err(invalid("retention", "min_samples_split", "must be at least 2"));
        }
        if !self.shift.mean_shift.is_finite() {
            return Err(invalid("shift", "mean_shift", "must be finite"));
        }
        if !self.shift.scale.is_finite() {
            return Err(invalid("shift", "scale", "must be finite"));
        }
        if self.shift.noise_fraction.is_nan() || self.shift.noise_fraction < 0.0 {
            return Err(invalid("shift", "noise_fraction", "must be non-negative"));
        }
        Ok(())
    }
}
