//! Random-forest classifier used by the retention evaluator.
//!
//! CART trees on Gini impurity, each fitted on a bootstrap resample with
//! `sqrt(d)` candidate features per split. Trees are fitted in parallel;
//! each draws its randomness from a sub-seed of the forest seed, so the
//! fitted forest does not depend on the thread count.

use std::cmp::Ordering;

use axeslab_core::SeedHierarchy;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ForestError {
    #[error("training set is empty")]
    Empty,

    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("feature rows must share one non-zero width")]
    BadShape,

    #[error("label {label} is out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        probs: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// One CART classification tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Node,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl DecisionTree {
    /// Class probabilities at the leaf `row` falls into.
    pub fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { probs } => return probs,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let counts = self.class_counts(indices);
        let impurity = gini(&counts, indices.len());

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if impurity <= 0.0 || depth_reached || indices.len() < self.min_samples_split {
            return self.leaf(&counts, indices.len());
        }

        let Some((feature, threshold)) = self.best_split(indices, &counts, rng) else {
            return self.leaf(&counts, indices.len());
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[i][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(&left, depth + 1, rng)),
            right: Box::new(self.build(&right, depth + 1, rng)),
        }
    }

    fn leaf(&self, counts: &[usize], n: usize) -> Node {
        let n = n.max(1) as f64;
        Node::Leaf {
            probs: counts.iter().map(|&c| c as f64 / n).collect(),
        }
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Lowest weighted child impurity over a random feature subset.
    fn best_split(
        &self,
        indices: &[usize],
        totals: &[usize],
        rng: &mut StdRng,
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let width = self.x[0].len();
        let features = sample(rng, width, self.max_features.min(width));

        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted = indices.to_vec();
        for feature in features.iter() {
            sorted.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left = vec![0usize; self.n_classes];
            for pos in 0..n - 1 {
                left[self.y[sorted[pos]]] += 1;
                let here = self.x[sorted[pos]][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if next <= here {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                let right: Vec<usize> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
                let score = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                if best.map_or(true, |(_, _, s)| score < s - 1e-12) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some((feature, threshold, score));
                }
            }
        }
        best.map(|(f, t, _)| (f, t))
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

/// A bagged ensemble of [`DecisionTree`]s.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    /// Fit on rows `x` with class ids `y` in `0..n_classes`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        if x.is_empty() {
            return Err(ForestError::Empty);
        }
        if x.len() != y.len() {
            return Err(ForestError::LengthMismatch {
                rows: x.len(),
                labels: y.len(),
            });
        }
        let width = x[0].len();
        if width == 0 || x.iter().any(|r| r.len() != width) {
            return Err(ForestError::BadShape);
        }
        if let Some(&label) = y.iter().find(|&&l| l >= n_classes) {
            return Err(ForestError::LabelOutOfRange { label, n_classes });
        }

        let builder = TreeBuilder {
            x,
            y,
            n_classes,
            max_features: ((width as f64).sqrt() as usize).max(1),
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
        };
        let seeds = SeedHierarchy::new(config.seed);
        let n = x.len();

        let trees = (0..config.n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = seeds.rng_for("tree", t as u64, 0);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree {
                    root: builder.build(&bootstrap, 0, &mut rng),
                }
            })
            .collect();

        Ok(Self { trees, n_classes })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the trees' leaf probabilities.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.predict_proba(row)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }

    /// Most probable class; ties go to the lowest class id.
    pub fn predict_one(&self, row: &[f64]) -> usize {
        let probs = self.predict_proba(row);
        let mut best = 0;
        for (class, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = class;
            }
        }
        best
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<usize> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let class = i % 3;
            let jitter = ((i * 37) % 11) as f64 / 11.0;
            x.push(vec![class as f64 * 3.0 + jitter, jitter * 2.0]);
            y.push(class);
        }
        (x, y)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 25,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn learns_separable_classes() {
        let (x, y) = separable(150);
        let forest = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        assert_eq!(forest.n_trees(), 25);
        let pred = forest.predict(&x);
        let correct = pred.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct >= 145, "correct={correct}");
        assert_eq!(forest.predict_one(&[6.5, 0.5]), 2);
        assert_eq!(forest.predict_one(&[0.2, 1.0]), 0);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = separable(60);
        let forest = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let p = forest.predict_proba(&[3.1, 0.2]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fit_is_deterministic() {
        let (x, y) = separable(90);
        let queries: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 * 0.45, 1.0]).collect();
        let a = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        let b = RandomForest::fit(&x, &y, 3, &small_config()).unwrap();
        for row in &queries {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }

    #[test]
    fn max_depth_limits_trees() {
        let (x, y) = separable(90);
        let config = ForestConfig {
            n_trees: 5,
            max_depth: Some(1),
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, 3, &config).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn ties_go_to_lowest_class() {
        let forest = RandomForest {
            trees: vec![DecisionTree {
                root: Node::Leaf {
                    probs: vec![0.0, 0.5, 0.5],
                },
            }],
            n_classes: 3,
        };
        assert_eq!(forest.predict_one(&[0.0]), 1);
    }

    #[test]
    fn rejects_bad_training_sets() {
        let config = small_config();
        assert_eq!(RandomForest::fit(&[], &[], 2, &config).unwrap_err(), ForestError::Empty);
        assert_eq!(
            RandomForest::fit(&[vec![1.0]], &[0, 1], 2, &config).unwrap_err(),
            ForestError::LengthMismatch { rows: 1, labels: 2 }
        );
        assert_eq!(
            RandomForest::fit(&[vec![1.0]], &[5], 2, &config).unwrap_err(),
            ForestError::LabelOutOfRange {
                label: 5,
                n_classes: 2
            }
        );
    }

    #[test]
    fn gini_of_pure_and_mixed_nodes() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
    }
}
