//! Population stability index: binned drift score between two samples.
//!
//! Both samples are histogrammed over the same equal-width bins spanning
//! their union range. Every bin gets a tiny additive constant before
//! normalization so the log-ratio stays finite.
//!
//! Degenerate input never fails: too few samples, identical samples, or a
//! collapsed range all score `0.0` ("no detectable drift"), so a pipeline
//! scanning sparse columns keeps going.

use serde::{Deserialize, Serialize};

use crate::sample::{clean, sample_variance};

/// Additive smoothing applied to every bin before normalization.
pub const BIN_SMOOTHING: f64 = 1e-10;

/// Relative padding applied to each end of the union range.
const RANGE_PADDING: f64 = 1e-9;

/// Configuration for the drift detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsiConfig {
    /// Number of equal-width bins (default 10).
    pub bins: usize,
    /// Minimum cleaned values required on each side (default 50).
    pub min_samples: usize,
    /// PSI above this value counts as triggered drift (default 0.1).
    pub threshold: f64,
}

impl Default for PsiConfig {
    fn default() -> Self {
        Self {
            bins: 10,
            min_samples: 50,
            threshold: 0.1,
        }
    }
}

impl PsiConfig {
    pub fn is_triggered(&self, psi: f64) -> bool {
        psi > self.threshold
    }
}

/// Equal-width histogram: `edges.len() == counts.len() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinHistogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl BinHistogram {
    /// Histogram `values` into `bins` equal-width buckets over `[lo, hi]`.
    ///
    /// Values outside the range are clamped into the first or last bucket.
    pub fn build(values: &[f64], lo: f64, hi: f64, bins: usize) -> Self {
        let bins = bins.max(1);
        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = if width > 0.0 {
                ((v - lo) / width).floor()
            } else {
                0.0
            };
            let idx = if idx < 0.0 {
                0
            } else {
                (idx as usize).min(bins - 1)
            };
            counts[idx] += 1;
        }
        Self { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Smoothed probability mass per bin. Never zero.
    pub fn probabilities(&self) -> Vec<f64> {
        let smoothed: Vec<f64> = self
            .counts
            .iter()
            .map(|&c| c as f64 + BIN_SMOOTHING)
            .collect();
        let total: f64 = smoothed.iter().sum();
        smoothed.into_iter().map(|c| c / total).collect()
    }

    /// `(lower, upper, count)` per bin.
    pub fn bounds(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(w, &c)| (w[0], w[1], c))
    }
}

/// PSI between two histograms built over the same edges.
///
/// Accumulates `(a - e) * ln(a / e)` over bins where both probabilities
/// are strictly positive.
pub fn psi_from_histograms(expected: &BinHistogram, actual: &BinHistogram) -> f64 {
    debug_assert_eq!(expected.edges.len(), actual.edges.len());
    let e = expected.probabilities();
    let a = actual.probabilities();
    e.iter()
        .zip(&a)
        .filter(|&(&ep, &ap)| ep > 0.0 && ap > 0.0)
        .map(|(&ep, &ap)| (ap - ep) * (ap / ep).ln())
        .sum::<f64>()
        .max(0.0)
}

/// Population stability index of `actual` against `expected`.
///
/// Returns `0.0` when either cleaned sample is shorter than
/// `config.min_samples`, when the samples are identical, or when their
/// combined range is a single point.
pub fn population_stability_index(expected: &[f64], actual: &[f64], config: &PsiConfig) -> f64 {
    let expected = clean(expected);
    let actual = clean(actual);

    if expected.len() < config.min_samples || actual.len() < config.min_samples {
        return 0.0;
    }
    if expected.is_empty() || actual.is_empty() || expected == actual {
        return 0.0;
    }

    let Some((lo, hi)) = padded_range(expected.iter().chain(actual.iter()).copied()) else {
        return 0.0;
    };

    let e = BinHistogram::build(&expected, lo, hi, config.bins);
    let a = BinHistogram::build(&actual, lo, hi, config.bins);
    psi_from_histograms(&e, &a)
}

/// Fraction of rolling windows whose PSI against the whole series exceeds
/// `config.threshold`.
///
/// The whole cleaned series is the expected distribution. Returns `0.0` when
/// the series has fewer than `config.min_samples` values, no variance, or no
/// complete window.
pub fn windowed_trigger_rate(series: &[f64], window: usize, config: &PsiConfig) -> f64 {
    let series = clean(series);
    if series.len() < config.min_samples || window == 0 || window > series.len() {
        return 0.0;
    }
    if sample_variance(&series) == 0.0 {
        return 0.0;
    }
    let Some((lo, hi)) = padded_range(series.iter().copied()) else {
        return 0.0;
    };

    let baseline = BinHistogram::build(&series, lo, hi, config.bins);
    let mut triggered = 0usize;
    let mut total = 0usize;
    for chunk in series.windows(window) {
        let current = BinHistogram::build(chunk, lo, hi, config.bins);
        let psi = psi_from_histograms(&baseline, &current);
        if psi.is_finite() {
            total += 1;
            if config.is_triggered(psi) {
                triggered += 1;
            }
        }
    }
    if total == 0 {
        return 0.0;
    }
    triggered as f64 / total as f64
}

/// Union range padded on both ends; `None` if it collapses to a point.
fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() || hi <= lo {
        return None;
    }
    let pad = RANGE_PADDING * (hi - lo).abs().max(1.0);
    Some((lo - pad, hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gaussian(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                let u2: f64 = rng.gen();
                (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
            })
            .collect()
    }

    // ── Degeneracy ──

    #[test]
    fn identical_samples_score_zero() {
        let x = gaussian(500, 1);
        assert_eq!(population_stability_index(&x, &x, &PsiConfig::default()), 0.0);
    }

    #[test]
    fn constant_samples_score_zero() {
        let a = vec![1.0; 120];
        let b = vec![1.0; 150];
        assert_eq!(population_stability_index(&a, &b, &PsiConfig::default()), 0.0);
    }

    #[test]
    fn small_samples_score_zero_even_when_disjoint() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [100.0, 200.0, 300.0, 400.0, 500.0, 600.0];
        assert_eq!(population_stability_index(&a, &b, &PsiConfig::default()), 0.0);
    }

    #[test]
    fn non_finite_values_are_dropped_first() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..30 {
            a.extend([1.0, 2.0, f64::NAN, 3.0, f64::INFINITY, 4.0]);
            b.extend([1.2, 2.1, f64::NAN, 3.2, f64::NEG_INFINITY, 3.9]);
        }
        let psi = population_stability_index(&a, &b, &PsiConfig::default());
        assert!(psi >= 0.0 && psi.is_finite());
    }

    // ── Sensitivity ──

    #[test]
    fn larger_shift_scores_higher() {
        let config = PsiConfig::default();
        let base = gaussian(600, 0);
        let same: Vec<f64> = base.iter().map(|x| x + 0.0).collect();
        let shifted: Vec<f64> = base.iter().map(|x| x + 2.0).collect();
        let psi_zero = population_stability_index(&base, &same, &config);
        let psi_two = population_stability_index(&base, &shifted, &config);
        assert!(psi_two > psi_zero, "psi(+2)={psi_two} psi(+0)={psi_zero}");
        assert!(config.is_triggered(psi_two));
    }

    #[test]
    fn independent_draws_stay_below_threshold() {
        let config = PsiConfig::default();
        let a = gaussian(2000, 11);
        let b = gaussian(2000, 12);
        let psi = population_stability_index(&a, &b, &config);
        assert!(psi < config.threshold, "psi={psi}");
    }

    // ── Histogram ──

    #[test]
    fn histogram_edges_and_counts() {
        let h = BinHistogram::build(&[0.0, 0.5, 1.0, 9.99, 10.0], 0.0, 10.0, 10);
        assert_eq!(h.edges.len(), 11);
        assert_eq!(h.counts[0], 2);
        assert_eq!(h.counts[1], 1);
        assert_eq!(h.counts[9], 2);
        assert_eq!(h.total(), 5);
        let (lo, hi, c) = h.bounds().next().unwrap();
        assert_eq!((lo, hi, c), (0.0, 1.0, 2));
    }

    #[test]
    fn probabilities_never_zero_and_sum_to_one() {
        let h = BinHistogram::build(&[0.1, 0.2], 0.0, 1.0, 5);
        let p = h.probabilities();
        assert!(p.iter().all(|&x| x > 0.0));
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    // ── Windowed trigger rate ──

    #[test]
    fn drifting_series_triggers_windows() {
        let series: Vec<f64> = (0..400).map(|i| i as f64 * 0.05).collect();
        let rate = windowed_trigger_rate(&series, 50, &PsiConfig::default());
        assert!(rate > 0.5, "rate={rate}");
    }

    #[test]
    fn short_or_constant_series_rate_is_zero() {
        let config = PsiConfig::default();
        assert_eq!(windowed_trigger_rate(&[1.0; 30], 10, &config), 0.0);
        assert_eq!(windowed_trigger_rate(&[3.0; 200], 50, &config), 0.0);
        let series: Vec<f64> = (0..100).map(f64::from).collect();
        assert_eq!(windowed_trigger_rate(&series, 0, &config), 0.0);
        assert_eq!(windowed_trigger_rate(&series, 101, &config), 0.0);
    }
}
