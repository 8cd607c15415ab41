//! Seeded k-means (Lloyd's algorithm with k-means++ seeding and restarts).
//!
//! Each restart draws its own RNG from the [`SeedHierarchy`], so a fit is
//! fully determined by `(seed, k, n_init)` and the input points.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::SeedHierarchy;

/// Errors from a single k-means fit.
#[derive(Debug, Error, PartialEq)]
pub enum KMeansError {
    #[error("k must be at least 1")]
    ZeroClusters,
    #[error("need at least {k} points for k={k}, got {points}")]
    TooFewPoints { k: usize, points: usize },
    #[error("points must have at least one dimension and equal width")]
    BadShape,
    #[error("non-finite coordinate in row {row}")]
    NonFinite { row: usize },
}

/// Parameters for one k-means fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    pub k: usize,
    /// Independent restarts; the lowest-inertia fit wins (default 10).
    pub n_init: usize,
    /// Lloyd iterations per restart (default 300).
    pub max_iter: usize,
    /// Stop when the summed squared center shift falls below this.
    pub tol: f64,
    pub seed: u64,
}

impl KMeansConfig {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            tol: 1e-10,
            seed,
        }
    }
}

/// A cluster assignment: one label per point plus `k` centers.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centers: Vec<Vec<f64>>,
    /// Sum of squared distances from each point to its center.
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeansFit {
    pub fn k(&self) -> usize {
        self.centers.len()
    }
}

/// Fit k-means to `points` (rows of equal width).
pub fn fit(points: &[Vec<f64>], config: &KMeansConfig) -> Result<KMeansFit, KMeansError> {
    let k = config.k;
    if k == 0 {
        return Err(KMeansError::ZeroClusters);
    }
    if points.len() < k {
        return Err(KMeansError::TooFewPoints {
            k,
            points: points.len(),
        });
    }
    let dim = points[0].len();
    if dim == 0 || points.iter().any(|p| p.len() != dim) {
        return Err(KMeansError::BadShape);
    }
    if let Some(row) = points.iter().position(|p| p.iter().any(|v| !v.is_finite())) {
        return Err(KMeansError::NonFinite { row });
    }

    let seeds = SeedHierarchy::new(config.seed);
    let mut best: Option<KMeansFit> = None;
    for restart in 0..config.n_init.max(1) {
        let mut rng = seeds.rng_for("kmeans", k as u64, restart as u64);
        let initial = plus_plus_init(points, k, &mut rng);
        let candidate = lloyd(points, initial, config.max_iter, config.tol);
        let better = match &best {
            None => true,
            Some(b) => candidate.inertia < b.inertia,
        };
        if better {
            best = Some(candidate);
        }
    }
    // n_init >= 1 guarantees at least one candidate.
    best.ok_or(KMeansError::ZeroClusters)
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// k-means++ seeding: each new center is drawn with probability
/// proportional to its squared distance from the nearest chosen center.
fn plus_plus_init<R: Rng>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..n)].clone());

    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = nearest.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in nearest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All remaining points coincide with existing centers.
            rng.gen_range(0..n)
        };
        let center = points[idx].clone();
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &center));
        }
        centers.push(center);
    }
    centers
}

fn assign(points: &[Vec<f64>], centers: &[Vec<f64>]) -> (Vec<usize>, Vec<f64>) {
    let mut labels = Vec::with_capacity(points.len());
    let mut dists = Vec::with_capacity(points.len());
    for p in points {
        let (label, dist) = centers
            .iter()
            .enumerate()
            .map(|(c, center)| (c, squared_distance(p, center)))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        labels.push(label);
        dists.push(dist);
    }
    (labels, dists)
}

fn lloyd(points: &[Vec<f64>], mut centers: Vec<Vec<f64>>, max_iter: usize, tol: f64) -> KMeansFit {
    let k = centers.len();
    let dim = points[0].len();
    let mut iterations = 0;
    let (mut labels, mut dists) = assign(points, &centers);

    for _ in 0..max_iter.max(1) {
        iterations += 1;

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &l) in points.iter().zip(&labels) {
            counts[l] += 1;
            for (s, v) in sums[l].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut new_centers = Vec::with_capacity(k);
        let mut taken = vec![false; points.len()];
        for c in 0..k {
            if counts[c] > 0 {
                new_centers.push(sums[c].iter().map(|s| s / counts[c] as f64).collect());
            } else {
                // Empty cluster: move it onto the point farthest from its center.
                let far = dists
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !taken[*i])
                    .fold((0, f64::NEG_INFINITY), |best, (i, &d)| {
                        if d > best.1 {
                            (i, d)
                        } else {
                            best
                        }
                    })
                    .0;
                taken[far] = true;
                new_centers.push(points[far].clone());
            }
        }

        let shift: f64 = centers
            .iter()
            .zip(&new_centers)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centers = new_centers;
        let (l, d) = assign(points, &centers);
        labels = l;
        dists = d;
        if shift <= tol {
            break;
        }
    }

    KMeansFit {
        labels,
        inertia: dists.iter().sum(),
        centers,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        let mut pts = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            pts.push(vec![0.0 + jitter, 0.0 - jitter]);
            pts.push(vec![10.0 - jitter, 10.0 + jitter]);
        }
        pts
    }

    #[test]
    fn separates_two_blobs() {
        let fit = fit(&two_blobs(), &KMeansConfig::new(2, 42)).unwrap();
        assert_eq!(fit.k(), 2);
        // Alternating rows belong to different blobs.
        for pair in fit.labels.chunks(2) {
            assert_ne!(pair[0], pair[1]);
        }
        let mut xs: Vec<f64> = fit.centers.iter().map(|c| c[0]).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 0.2).abs() < 1e-9);
        assert!((xs[1] - 9.8).abs() < 1e-9);
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let pts = two_blobs();
        let a = fit(&pts, &KMeansConfig::new(3, 7)).unwrap();
        let b = fit(&pts, &KMeansConfig::new(3, 7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn inertia_decreases_with_more_clusters() {
        let pts = two_blobs();
        let one = fit(&pts, &KMeansConfig::new(1, 1)).unwrap();
        let two = fit(&pts, &KMeansConfig::new(2, 1)).unwrap();
        assert!(two.inertia < one.inertia);
    }

    #[test]
    fn duplicate_points_do_not_panic() {
        let pts = vec![vec![1.0, 1.0]; 10];
        let fit = fit(&pts, &KMeansConfig::new(3, 0)).unwrap();
        assert_eq!(fit.labels.len(), 10);
        assert!(fit.inertia.abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            fit(&[vec![1.0]], &KMeansConfig::new(2, 0)),
            Err(KMeansError::TooFewPoints { k: 2, points: 1 })
        );
        assert_eq!(
            fit(&[vec![1.0], vec![1.0, 2.0]], &KMeansConfig::new(1, 0)),
            Err(KMeansError::BadShape)
        );
        assert_eq!(
            fit(&[vec![1.0], vec![f64::NAN]], &KMeansConfig::new(1, 0)),
            Err(KMeansError::NonFinite { row: 1 })
        );
        assert_eq!(fit(&[vec![1.0]], &KMeansConfig::new(0, 0)), Err(KMeansError::ZeroClusters));
    }
}
