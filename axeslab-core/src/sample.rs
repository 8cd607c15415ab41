//! Numeric sample helpers: cleaning, moments, quantiles.
//!
//! All functions take plain slices and are total: empty or too-short input
//! yields `0.0` or `None` rather than a panic. Callers decide how a short
//! sample maps onto a `Metric`.

use std::cmp::Ordering;

/// Drop NaN and infinite values, keeping order.
pub fn clean(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Convert optional cells to a cleaned sample.
pub fn clean_optional(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| v.is_finite())
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator). Zero for fewer than 2 values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sort a copy ascending with NaN-safe ordering.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Linear-interpolation quantile of an already sorted slice, `q` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Number of distinct values (exact float equality).
pub fn distinct_count(values: &[f64]) -> usize {
    let s = sorted(values);
    let mut count = 0;
    let mut prev: Option<f64> = None;
    for v in s {
        if prev != Some(v) {
            count += 1;
            prev = Some(v);
        }
    }
    count
}

/// Bias-corrected sample skewness (adjusted Fisher–Pearson G1).
///
/// `None` for fewer than 3 values; `0.0` when the sample has no spread.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    if m2 < 1e-14 {
        return Some(0.0);
    }
    let g1 = m3 / m2.powf(1.5);
    Some((nf * (nf - 1.0)).sqrt() / (nf - 2.0) * g1)
}

/// Bias-corrected sample excess kurtosis (G2; 0 for a normal distribution).
///
/// `None` for fewer than 4 values; `0.0` when the sample has no spread.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }
    let nf = n as f64;
    let m = mean(values);
    let s2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    let s4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>();
    if s2 < 1e-14 {
        return Some(0.0);
    }
    let numerator = nf * (nf + 1.0) * (nf - 1.0) * s4;
    let denominator = (nf - 2.0) * (nf - 3.0) * s2 * s2;
    let adjustment = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    Some(numerator / denominator - adjustment)
}

/// Pearson correlation of two equal-length slices.
///
/// `None` when lengths differ, fewer than 2 pairs, or either side is constant.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    if va < 1e-300 || vb < 1e-300 {
        return None;
    }
    Some(cov / (va.sqrt() * vb.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_drops_non_finite() {
        let v = clean(&[1.0, f64::NAN, 2.0, f64::INFINITY, f64::NEG_INFINITY, 3.0]);
        assert_eq!(v, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn clean_optional_drops_missing() {
        let v = clean_optional(&[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(v, vec![1.0, 4.0]);
    }

    #[test]
    fn variance_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&v) - 2.0).abs() < 1e-12);
        assert!((sample_variance(&v) - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), 0.0);
    }

    #[test]
    fn quantile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&s, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&s, 1.0), Some(4.0));
        assert!((quantile_sorted(&s, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn distinct_counts_exact_values() {
        assert_eq!(distinct_count(&[1.0, 1.0, 2.0, 3.0, 3.0]), 3);
        assert_eq!(distinct_count(&[]), 0);
    }

    #[test]
    fn symmetric_sample_has_zero_skew() {
        let v = [-3.0, -1.0, 0.0, 1.0, 3.0];
        assert!(skewness(&v).unwrap().abs() < 1e-12);
    }

    #[test]
    fn right_tail_has_positive_skew() {
        let v = [1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 10.0];
        assert!(skewness(&v).unwrap() > 1.0);
    }

    #[test]
    fn kurtosis_matches_reference_value() {
        // Uniform 1..=10: bias-corrected excess kurtosis is -1.2.
        let v: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((excess_kurtosis(&v).unwrap() - (-1.2)).abs() < 1e-9);
        assert_eq!(excess_kurtosis(&[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn constant_sample_moments_are_zero() {
        let v = [5.0; 10];
        assert_eq!(skewness(&v), Some(0.0));
        assert_eq!(excess_kurtosis(&v), Some(0.0));
    }

    #[test]
    fn pearson_perfect_and_constant() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(pearson(&a, &[1.0; 4]), None);
        assert_eq!(pearson(&a, &b[..3]), None);
    }
}
