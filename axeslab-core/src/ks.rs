//! Two-sample Kolmogorov–Smirnov statistic.

use crate::sample::{clean, sorted};

/// Supremum distance between the empirical CDFs of `a` and `b`.
///
/// Non-finite values are dropped; `None` if either side is then empty.
/// Ties are stepped over together so equal samples score exactly `0.0`.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> Option<f64> {
    let a = sorted(&clean(a));
    let b = sorted(&clean(b));
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d_max = 0.0f64;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d_max = d_max.max((i as f64 / n - j as f64 / m).abs());
    }
    Some(d_max)
}

/// Asymptotic p-value of a KS statistic for sample sizes `n` and `m`.
///
/// Uses the Kolmogorov series with the Stephens small-sample correction.
/// A series that has not converged after 100 terms means a statistic too
/// small to reject anything, reported as `1.0`.
pub fn ks_p_value(statistic: f64, n: usize, m: usize) -> f64 {
    if n == 0 || m == 0 || statistic.is_nan() {
        return 1.0;
    }
    let en = (n as f64 * m as f64 / (n + m) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * statistic;
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut p = 0.0;
    for k in 1..=100 {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let term = sign * (-2.0 * f64::from(k).powi(2) * lambda.powi(2)).exp();
        p += term;
        if term.abs() < 1e-10 {
            return (2.0 * p).clamp(0.0, 1.0);
        }
    }
    1.0
}
