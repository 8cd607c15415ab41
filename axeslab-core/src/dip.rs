//! Approximate dip statistic: kernel-density valley depth as a unimodality score.
//!
//! This is a heuristic surrogate for Hartigan's dip test, not the classical
//! statistic: a Gaussian KDE is evaluated on a grid, peaks are read off sign
//! changes of its discrete derivative, and the average relative valley depth
//! between neighbouring peaks is scaled by the number of extra peaks.
//!
//! Peaks below [`PEAK_FLOOR`] of the highest density are dropped, and two
//! neighbouring peaks whose valley is shallower than [`MIN_PROMINENCE`] are
//! merged into the higher one. KDE ripples in the tails of a Gaussian or on
//! the plateau of a uniform sample therefore do not count as modes.
//!
//! `0.0` means unimodal; larger values mean stronger multimodal structure.
//! `None` means the sample is too small to say anything.

use serde::{Deserialize, Serialize};

use crate::sample::{clean, distinct_count, population_std};

/// Minimum number of finite values for a dip estimate.
pub const MIN_DIP_SAMPLES: usize = 40;

/// Peaks lower than this fraction of the highest density are noise.
pub const PEAK_FLOOR: f64 = 0.1;

/// Relative depth a valley needs below the lower of its two peaks to
/// separate them.
pub const MIN_PROMINENCE: f64 = 0.3;

/// Configuration for the dip approximation and its unimodality verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DipConfig {
    /// KDE evaluation grid size (default 256).
    pub grid_size: usize,
    /// Dip values at or below this are unimodal (default 0.02).
    pub threshold: f64,
}

impl Default for DipConfig {
    fn default() -> Self {
        Self {
            grid_size: 256,
            threshold: 0.02,
        }
    }
}

/// Approximate dip statistic of `values`.
///
/// - `None` when fewer than [`MIN_DIP_SAMPLES`] finite values remain.
/// - `Some(0.0)` for fewer than 3 distinct values, a zero range, or a single
///   density peak.
pub fn approximate_dip(values: &[f64], grid_size: usize) -> Option<f64> {
    let x = clean(values);
    if x.len() < MIN_DIP_SAMPLES {
        return None;
    }
    if distinct_count(&x) < 3 {
        return Some(0.0);
    }

    let (min, max) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max <= min {
        return Some(0.0);
    }

    let bandwidth = population_std(&x) * (x.len() as f64).powf(-0.2);
    if bandwidth.is_nan() || bandwidth <= 0.0 {
        return Some(0.0);
    }

    let grid_size = grid_size.max(3);
    let step = (max - min) / (grid_size - 1) as f64;
    let density: Vec<f64> = (0..grid_size)
        .map(|i| kde_at(&x, min + step * i as f64, bandwidth))
        .collect();

    let peaks = significant_peaks(&density, peak_indices(&density));
    if peaks.len() <= 1 {
        return Some(0.0);
    }

    let depths: Vec<f64> = peaks
        .windows(2)
        .filter_map(|pair| {
            let (l, r) = (pair[0], pair[1]);
            let avg_peak = (density[l] + density[r]) / 2.0;
            (avg_peak > 0.0).then(|| (avg_peak - valley_between(&density, l, r)) / avg_peak)
        })
        .collect();
    if depths.is_empty() {
        return Some(0.0);
    }

    let avg_depth = (depths.iter().sum::<f64>() / depths.len() as f64).clamp(0.0, 1.0);
    Some(avg_depth * 0.5 * (peaks.len() - 1) as f64)
}

/// Unimodality verdict. Insufficient data counts as unimodal so that
/// downstream processing is never blocked.
pub fn is_unimodal(values: &[f64], config: &DipConfig) -> bool {
    match approximate_dip(values, config.grid_size) {
        None => true,
        Some(dip) => dip <= config.threshold,
    }
}

/// Gaussian kernel density estimate at `point`.
fn kde_at(x: &[f64], point: f64, bandwidth: f64) -> f64 {
    let sum: f64 = x
        .iter()
        .map(|&v| {
            let z = (v - point) / bandwidth;
            (-0.5 * z * z).exp()
        })
        .sum();
    sum / x.len() as f64 / bandwidth
}

/// Grid indices of local maxima.
///
/// Flat stretches inherit the previous slope sign, so a plateau between two
/// rising segments is not mistaken for a turning point.
fn peak_indices(density: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut prev_sign = 0i8;
    for i in 0..density.len().saturating_sub(1) {
        let d = density[i + 1] - density[i];
        let sign = if d > 0.0 {
            1
        } else if d < 0.0 {
            -1
        } else {
            prev_sign
        };
        if prev_sign > 0 && sign < 0 {
            peaks.push(i);
        }
        if sign != 0 {
            prev_sign = sign;
        }
    }
    peaks
}

/// Drop peaks under the noise floor, then repeatedly merge the first
/// neighbouring pair whose valley is too shallow, keeping the higher peak.
fn significant_peaks(density: &[f64], peaks: Vec<usize>) -> Vec<usize> {
    let global_max = density.iter().copied().fold(0.0, f64::max);
    let mut kept: Vec<usize> = peaks
        .into_iter()
        .filter(|&p| density[p] >= PEAK_FLOOR * global_max)
        .collect();
    while let Some(i) = (1..kept.len())
        .map(|j| j - 1)
        .find(|&i| prominence(density, kept[i], kept[i + 1]) < MIN_PROMINENCE)
    {
        let lower = if density[kept[i]] < density[kept[i + 1]] { i } else { i + 1 };
        kept.remove(lower);
    }
    kept
}

/// Lowest density on the closed grid interval `[l, r]`.
fn valley_between(density: &[f64], l: usize, r: usize) -> f64 {
    density[l..=r].iter().copied().fold(f64::INFINITY, f64::min)
}

/// Depth of the valley between `l` and `r` relative to the lower peak.
fn prominence(density: &[f64], l: usize, r: usize) -> f64 {
    let lower = density[l].min(density[r]);
    if lower <= 0.0 {
        return 0.0;
    }
    (lower - valley_between(density, l, r)) / lower
}
