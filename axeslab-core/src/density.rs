//! Semantic density: how tightly rows cluster in standardized feature space.
//!
//! For every candidate `k` a seeded k-means is fitted and scored by a cheap
//! silhouette surrogate: `(inter - intra) / inter`, where `intra` is twice the
//! mean distance from a point to its own center and `inter` the mean pairwise
//! distance between centers. The best `k` also yields a normalized
//! intra-cluster density.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kmeans::{self, distance, KMeansConfig};
use crate::metric::Metric;

/// Separation threshold below which inter-center distance counts as zero.
const MIN_INTER: f64 = 1e-9;

/// Configuration for the density scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    pub k_min: usize,
    pub k_max: usize,
    /// Minimum complete rows required (default 40).
    pub min_samples: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 5,
            min_samples: 40,
            n_init: 10,
            max_iter: 300,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityMetrics {
    pub intra_cluster_density: Metric,
    pub silhouette_approx: Metric,
    /// The `k` that maximized the silhouette surrogate.
    pub density_k: Option<usize>,
}

impl DensityMetrics {
    fn unavailable(metric: Metric) -> Self {
        Self {
            intra_cluster_density: metric.clone(),
            silhouette_approx: metric,
            density_k: None,
        }
    }
}

/// One scored k-means candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    k: usize,
    intra: f64,
    score: f64,
}

/// Score the cluster structure of a row-major feature matrix.
///
/// All metrics are unavailable when the matrix is missing, empty, ragged,
/// narrower than 2 columns, or has fewer than `config.min_samples` rows
/// (and never zero) once rows holding any non-finite value are dropped.
pub fn compute_density_metrics(
    matrix: Option<&[Vec<f64>]>,
    config: &DensityConfig,
) -> DensityMetrics {
    let Some(matrix) = matrix.filter(|m| !m.is_empty()) else {
        return DensityMetrics::unavailable(Metric::insufficient(config.min_samples, 0));
    };
    let width = matrix[0].len();
    if matrix.iter().any(|row| row.len() != width) {
        return DensityMetrics::unavailable(Metric::degenerate("feature matrix is ragged"));
    }
    if width < 2 {
        return DensityMetrics::unavailable(Metric::degenerate(
            "fewer than two feature columns",
        ));
    }

    let rows: Vec<Vec<f64>> = matrix
        .iter()
        .filter(|row| row.iter().all(|v| v.is_finite()))
        .cloned()
        .collect();
    let required = config.min_samples.max(1);
    if rows.len() < required {
        debug!(
            rows = rows.len(),
            required,
            "density: not enough complete rows"
        );
        return DensityMetrics::unavailable(Metric::insufficient(required, rows.len()));
    }

    let points = standardize(&rows);

    let candidates: Vec<Option<Candidate>> = (config.k_min..=config.k_max)
        .into_par_iter()
        .map(|k| score_candidate(&points, k, config))
        .collect();

    // First maximum in k order wins, independent of scheduling.
    let best = candidates
        .into_iter()
        .flatten()
        .fold(None::<Candidate>, |best, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        });

    let Some(best) = best else {
        return DensityMetrics::unavailable(Metric::degenerate("no k-means candidate converged"));
    };

    let global_ref = 2.0 * mean_distance_to_centroid(&points);
    debug!(k = best.k, score = best.score, "density: selected candidate");

    DensityMetrics {
        intra_cluster_density: Metric::from_f64(best.intra / (global_ref + 1e-9)),
        silhouette_approx: Metric::from_f64(best.score),
        density_k: Some(best.k),
    }
}

fn score_candidate(points: &[Vec<f64>], k: usize, config: &DensityConfig) -> Option<Candidate> {
    let km = KMeansConfig {
        n_init: config.n_init,
        max_iter: config.max_iter,
        ..KMeansConfig::new(k, config.seed)
    };
    let fit = match kmeans::fit(points, &km) {
        Ok(fit) => fit,
        Err(e) => {
            debug!(k, error = %e, "density: skipping candidate");
            return None;
        }
    };

    let intra = 2.0
        * points
            .iter()
            .zip(&fit.labels)
            .map(|(p, &l)| distance(p, &fit.centers[l]))
            .sum::<f64>()
        / points.len() as f64;

    let mut pair_sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..fit.centers.len() {
        for j in (i + 1)..fit.centers.len() {
            pair_sum += distance(&fit.centers[i], &fit.centers[j]);
            pairs += 1;
        }
    }

    let score = if pairs > 0 {
        let inter = pair_sum / pairs as f64;
        if inter > MIN_INTER && inter > intra {
            (inter - intra) / inter
        } else {
            0.0
        }
    } else {
        0.0
    };

    debug!(k, intra, score, inertia = fit.inertia, "density: scored candidate");
    Some(Candidate { k, intra, score })
}

/// Z-score each column (population std); zero-variance columns become 0.
fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let width = rows.first().map_or(0, Vec::len);
    let stats: Vec<(f64, f64)> = (0..width)
        .map(|j| {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        })
        .collect();
    rows.iter()
        .map(|r| {
            r.iter()
                .zip(&stats)
                .map(|(&v, &(mean, std))| if std > 0.0 { (v - mean) / std } else { 0.0 })
                .collect()
        })
        .collect()
}

fn mean_distance_to_centroid(points: &[Vec<f64>]) -> f64 {
    let n = points.len() as f64;
    let width = points.first().map_or(0, Vec::len);
    let centroid: Vec<f64> = (0..width)
        .map(|j| points.iter().map(|p| p[j]).sum::<f64>() / n)
        .collect();
    points.iter().map(|p| distance(p, &centroid)).sum::<f64>() / n
}
