//! Temporal stability of a time-ordered numeric sequence.
//!
//! Three indicators:
//! - `st_var_ratio`: mean rolling variance relative to the global variance
//! - `seasonal_corr`: lagged autocorrelation
//! - `psi_trigger_rate`: PSI of the second half against the first half, or
//!   the share of rolling windows that drift from the whole sequence

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metric::Metric;
use crate::psi::{population_stability_index, windowed_trigger_rate, PsiConfig};
use crate::sample::{clean, mean, pearson, sample_variance};

/// How `psi_trigger_rate` is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsiMode {
    /// PSI of the second half against the first half.
    #[default]
    HalfSplit,
    /// Fraction of rolling windows of `psi_window` values whose PSI against
    /// the whole sequence exceeds the PSI threshold.
    Rolling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Below this many finite values every temporal metric is unavailable.
    pub min_len: usize,
    pub min_window: usize,
    pub max_window: usize,
    /// Minimum points inside a rolling window for it to produce a variance.
    pub min_periods: usize,
    pub min_lag: usize,
    pub max_lag: usize,
    /// Below this length the half-split PSI is reported as `0.0`.
    pub psi_min_len: usize,
    pub psi_mode: PsiMode,
    /// Rolling window length for [`PsiMode::Rolling`] (default 100).
    pub psi_window: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            min_len: 30,
            min_window: 5,
            max_window: 24,
            min_periods: 5,
            min_lag: 2,
            max_lag: 24,
            psi_min_len: 120,
            psi_mode: PsiMode::HalfSplit,
            psi_window: 100,
        }
    }
}

impl TemporalConfig {
    /// `min(max_window, max(min_window, n / 10))`
    pub fn window_for(&self, n: usize) -> usize {
        (n / 10).max(self.min_window).min(self.max_window)
    }

    /// `min(max_lag, max(min_lag, n / 12))`
    pub fn lag_for(&self, n: usize) -> usize {
        (n / 12).max(self.min_lag).min(self.max_lag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalMetrics {
    pub st_var_ratio: Metric,
    pub seasonal_corr: Metric,
    pub psi_trigger_rate: Metric,
}

/// Temporal metrics of `series`, which must already be in time order.
pub fn compute_temporal_metrics(
    series: &[f64],
    config: &TemporalConfig,
    psi: &PsiConfig,
) -> TemporalMetrics {
    let s = clean(series);
    let n = s.len();
    if n < config.min_len {
        let missing = Metric::insufficient(config.min_len, n);
        return TemporalMetrics {
            st_var_ratio: missing.clone(),
            seasonal_corr: missing.clone(),
            psi_trigger_rate: missing,
        };
    }

    let window = config.window_for(n);
    let lag = config.lag_for(n);
    debug!(n, window, lag, "temporal: computing");

    let global_var = sample_variance(&s);
    let rolling = rolling_variances(&s, window, config.min_periods);
    let st_var_ratio = if rolling.is_empty() {
        Metric::degenerate("no rolling window reached min_periods")
    } else {
        Metric::from_f64(mean(&rolling) / (global_var + 1e-9))
    };

    let seasonal_corr = match autocorrelation(&s, lag) {
        Some(r) => Metric::from_f64(r),
        None => Metric::degenerate("constant sequence at seasonal lag"),
    };

    // Short sequences report an explicit zero rather than "missing".
    let psi_trigger_rate = match config.psi_mode {
        PsiMode::HalfSplit if n >= config.psi_min_len => {
            let mid = n / 2;
            Metric::from_f64(population_stability_index(&s[..mid], &s[mid..], psi))
        }
        PsiMode::HalfSplit => Metric::Available(0.0),
        PsiMode::Rolling => Metric::from_f64(windowed_trigger_rate(&s, config.psi_window, psi)),
    };

    TemporalMetrics {
        st_var_ratio,
        seasonal_corr,
        psi_trigger_rate,
    }
}

/// Trailing-window sample variances.
///
/// Position `i` covers `s[i + 1 - window ..= i]`, truncated at the start;
/// positions with fewer than `min_periods` points are skipped.
pub fn rolling_variances(s: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let window = window.max(1);
    let min_periods = min_periods.max(2);
    (0..s.len())
        .filter_map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &s[start..=i];
            (slice.len() >= min_periods).then(|| sample_variance(slice))
        })
        .collect()
}

/// Pearson correlation between the sequence and itself shifted by `lag`.
pub fn autocorrelation(s: &[f64], lag: usize) -> Option<f64> {
    if lag == 0 || lag >= s.len() {
        return None;
    }
    pearson(&s[..s.len() - lag], &s[lag..])
}
