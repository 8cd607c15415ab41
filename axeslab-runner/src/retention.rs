//! Retention evaluation: how much classifier quality survives a shift.
//!
//! A forest trained on the base table is scored on a holdout of the base
//! table and, zero-shot, on a holdout of the shifted table; a fresh forest
//! retrained on the shifted table gives the recovery reference. Alongside,
//! common numeric features are ranked by two-sample KS distance.
//!
//! Pipeline:
//! 1. Row gate on both tables (too few rows → every metric unavailable)
//! 2. Resolve target (last column) and shared numeric features
//! 3. Stratified holdout split, forest fit, macro-F1
//! 4. Shift-intensity ranking

use std::collections::{BTreeSet, HashMap};

use axeslab_core::{ks_p_value, ks_statistic, sample, Column, Dataset, Metric, SeedHierarchy};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::forest::{ForestConfig, ForestError, RandomForest};

/// Added to the base macro-F1 before dividing.
const RATIO_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Minimum rows in each table (default 200).
    pub min_rows: usize,
    /// Holdout share (default 0.25).
    pub test_fraction: f64,
    pub seed: u64,
    pub n_trees: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// A feature needs more than this many finite values on both sides to
    /// be ranked (default 30).
    pub shift_min_values: usize,
    pub top_k: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            min_rows: 200,
            test_fraction: 0.25,
            seed: 42,
            n_trees: 200,
            max_depth: None,
            min_samples_split: 2,
            shift_min_values: 30,
            top_k: 5,
        }
    }
}

impl RetentionConfig {
    pub fn forest(&self) -> ForestConfig {
        ForestConfig {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("{0} table has no columns")]
    EmptyTable(&'static str),

    #[error("classifier training failed: {0}")]
    Forest(#[from] ForestError),
}

/// One entry of the shift ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftIntensity {
    pub feature: String,
    pub ks_stat: f64,
    /// Asymptotic two-sample KS p-value of `ks_stat`.
    pub ks_p_value: f64,
    /// `mean(shifted) - mean(base)`.
    pub mean_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub macro_f1_base: Metric,
    pub macro_f1_shifted_zero_shot: Metric,
    pub macro_f1_shifted_retrained: Metric,
    pub retention_zero_shot: Metric,
    pub retention_retrained: Metric,
    pub shift_intensity_features: Option<Vec<ShiftIntensity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RetentionReport {
    fn unavailable(reason: Metric, note: impl Into<String>) -> Self {
        Self {
            macro_f1_base: reason.clone(),
            macro_f1_shifted_zero_shot: reason.clone(),
            macro_f1_shifted_retrained: reason.clone(),
            retention_zero_shot: reason.clone(),
            retention_retrained: reason,
            shift_intensity_features: None,
            note: Some(note.into()),
        }
    }

    pub fn metrics(&self) -> [(&'static str, &Metric); 5] {
        [
            ("macro_f1_base", &self.macro_f1_base),
            ("macro_f1_shifted_zero_shot", &self.macro_f1_shifted_zero_shot),
            ("macro_f1_shifted_retrained", &self.macro_f1_shifted_retrained),
            ("retention_zero_shot", &self.retention_zero_shot),
            ("retention_retrained", &self.retention_retrained),
        ]
    }
}

/// Model-ready view of one table: complete rows only.
struct Prepared {
    x: Vec<Vec<f64>>,
    y: Vec<usize>,
}

impl Prepared {
    fn n_classes_present(&self) -> usize {
        self.y.iter().collect::<BTreeSet<_>>().len()
    }

    fn rows(&self, idx: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
        (
            idx.iter().map(|&i| self.x[i].clone()).collect(),
            idx.iter().map(|&i| self.y[i]).collect(),
        )
    }
}

/// Evaluate classifier retention from `base` to `shifted`.
pub fn evaluate_retention(
    base: &Dataset,
    shifted: &Dataset,
    config: &RetentionConfig,
) -> Result<RetentionReport, RetentionError> {
    let base_target = base.last_column().ok_or(RetentionError::EmptyTable("base"))?;
    let shifted_target = shifted
        .last_column()
        .ok_or(RetentionError::EmptyTable("shifted"))?;

    if base.n_rows() < config.min_rows || shifted.n_rows() < config.min_rows {
        let actual = base.n_rows().min(shifted.n_rows());
        debug!(actual, required = config.min_rows, "retention: row gate");
        return Ok(RetentionReport::unavailable(
            Metric::insufficient(config.min_rows, actual),
            "insufficient samples",
        ));
    }
    if base_target.name != shifted_target.name {
        warn!(
            base = %base_target.name,
            shifted = %shifted_target.name,
            "target columns differ by name; using the last column of each table"
        );
    }

    let features = common_features(base, shifted, &base_target.name, &shifted_target.name);
    if features.is_empty() {
        return Ok(RetentionReport::unavailable(
            Metric::degenerate("no common numeric features"),
            "no common numeric features",
        ));
    }
    let shift_ranking = rank_shifted_features(base, shifted, &features, config);

    let class_ids = class_index(base_target, shifted_target);
    let n_classes = class_ids.len();
    let base_data = prepare(base, base_target, &features, &class_ids);
    let shifted_data = prepare(shifted, shifted_target, &features, &class_ids);
    info!(
        features = features.len(),
        classes = n_classes,
        base_rows = base_data.y.len(),
        shifted_rows = shifted_data.y.len(),
        "retention: evaluating"
    );

    let single_class = Metric::degenerate("single-class target");
    let mut notes = Vec::new();

    // Base model
    let (base_model, macro_f1_base) = if base_data.n_classes_present() < 2 {
        notes.push("base target has a single class; modelling skipped");
        (None, single_class.clone())
    } else {
        let (train, test) = holdout_split(&base_data.y, config.test_fraction, config.seed);
        let (x_train, y_train) = base_data.rows(&train);
        let (x_test, y_test) = base_data.rows(&test);
        let model = RandomForest::fit(&x_train, &y_train, n_classes, &config.forest())?;
        let f1 = macro_f1(&y_test, &model.predict(&x_test));
        (Some(model), Metric::from_f64(f1))
    };

    // Shifted holdout: zero-shot and retrained
    let (zero_shot, retrained) = if shifted_data.n_classes_present() < 2 {
        notes.push("shifted target has a single class; shifted evaluation skipped");
        (single_class.clone(), single_class)
    } else {
        let (train, test) = holdout_split(&shifted_data.y, config.test_fraction, config.seed);
        let (x_train, y_train) = shifted_data.rows(&train);
        let (x_test, y_test) = shifted_data.rows(&test);

        let zero_shot = match &base_model {
            Some(model) => Metric::from_f64(macro_f1(&y_test, &model.predict(&x_test))),
            None => single_class.clone(),
        };
        let model = RandomForest::fit(&x_train, &y_train, n_classes, &config.forest())?;
        let retrained = Metric::from_f64(macro_f1(&y_test, &model.predict(&x_test)));
        (zero_shot, retrained)
    };

    let report = RetentionReport {
        retention_zero_shot: ratio(&zero_shot, &macro_f1_base),
        retention_retrained: ratio(&retrained, &macro_f1_base),
        macro_f1_base,
        macro_f1_shifted_zero_shot: zero_shot,
        macro_f1_shifted_retrained: retrained,
        shift_intensity_features: Some(shift_ranking),
        note: (!notes.is_empty()).then(|| notes.join("; ")),
    };
    debug!(?report, "retention: done");
    Ok(report)
}

/// `numerator / (base + ε)`, or the first missing operand's reason.
fn ratio(numerator: &Metric, base: &Metric) -> Metric {
    match (numerator.value(), base.value()) {
        (Some(n), Some(b)) => Metric::from_f64(n / (b + RATIO_EPSILON)),
        (None, _) => numerator.clone(),
        (_, None) => base.clone(),
    }
}

/// Numeric non-target columns of `base` that are also numeric in `shifted`,
/// in base order.
fn common_features(
    base: &Dataset,
    shifted: &Dataset,
    base_target: &str,
    shifted_target: &str,
) -> Vec<String> {
    let mut features = Vec::new();
    for name in base.numeric_column_names() {
        if name == base_target || name == shifted_target {
            continue;
        }
        match shifted.column(name) {
            Ok(col) if col.is_numeric() => features.push(name.to_string()),
            Ok(_) => warn!(column = name, "column is numeric in base but not in shifted table"),
            Err(_) => warn!(column = name, "column missing from shifted table"),
        }
    }
    features
}

/// Class label → id over the sorted union of both tables' labels.
fn class_index(base: &Column, shifted: &Column) -> HashMap<String, usize> {
    let labels: BTreeSet<String> = base
        .labels()
        .into_iter()
        .chain(shifted.labels())
        .flatten()
        .collect();
    labels.into_iter().enumerate().map(|(i, l)| (l, i)).collect()
}

/// Keep rows with a target label and finite values in every feature.
fn prepare(
    data: &Dataset,
    target: &Column,
    features: &[String],
    class_ids: &HashMap<String, usize>,
) -> Prepared {
    let columns: Vec<&[Option<f64>]> = features
        .iter()
        .filter_map(|f| data.numeric_values(f).ok())
        .collect();
    let labels = target.labels();

    let mut x = Vec::new();
    let mut y = Vec::new();
    for (row, label) in labels.iter().enumerate() {
        let Some(id) = label.as_ref().and_then(|l| class_ids.get(l)) else {
            continue;
        };
        let values: Option<Vec<f64>> = columns
            .iter()
            .map(|c| c[row].filter(|v| v.is_finite()))
            .collect();
        if let Some(values) = values {
            x.push(values);
            y.push(*id);
        }
    }
    Prepared { x, y }
}

/// Shuffled holdout split of row indices, stratified by class.
///
/// Each class contributes `round(n_c * test_fraction)` test rows, at least
/// one when the class has two or more rows and never all of them.
pub fn holdout_split(labels: &[usize], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = SeedHierarchy::new(seed).rng_for("holdout", 0, 0);
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.shuffle(&mut rng);

    let mut per_class: HashMap<usize, Vec<usize>> = HashMap::new();
    for &i in &order {
        per_class.entry(labels[i]).or_default().push(i);
    }
    let stratified = per_class.len() > 1;

    let mut test = Vec::new();
    let mut train = Vec::new();
    if stratified {
        let mut classes: Vec<usize> = per_class.keys().copied().collect();
        classes.sort_unstable();
        for class in classes {
            let rows = &per_class[&class];
            let n_c = rows.len();
            let n_test = if n_c >= 2 {
                ((n_c as f64 * test_fraction).round() as usize).clamp(1, n_c - 1)
            } else {
                0
            };
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }
    } else {
        let n_test = ((order.len() as f64 * test_fraction).round() as usize)
            .min(order.len().saturating_sub(1));
        test.extend_from_slice(&order[..n_test]);
        train.extend_from_slice(&order[n_test..]);
    }
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

/// Unweighted mean of per-class F1 over classes present in either
/// `truth` or `pred`. Zero for empty input.
pub fn macro_f1(truth: &[usize], pred: &[usize]) -> f64 {
    let classes: BTreeSet<usize> = truth.iter().chain(pred).copied().collect();
    if classes.is_empty() {
        return 0.0;
    }
    let total: f64 = classes
        .iter()
        .map(|&c| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fneg = 0usize;
            for (&t, &p) in truth.iter().zip(pred) {
                match (t == c, p == c) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fneg += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fneg;
            if denom == 0 {
                0.0
            } else {
                2.0 * tp as f64 / denom as f64
            }
        })
        .sum();
    total / classes.len() as f64
}

/// Rank common features by KS distance between base and shifted values.
fn rank_shifted_features(
    base: &Dataset,
    shifted: &Dataset,
    features: &[String],
    config: &RetentionConfig,
) -> Vec<ShiftIntensity> {
    let mut ranked: Vec<ShiftIntensity> = features
        .iter()
        .filter_map(|name| {
            let a = sample::clean_optional(base.numeric_values(name).ok()?);
            let b = sample::clean_optional(shifted.numeric_values(name).ok()?);
            if a.len() <= config.shift_min_values || b.len() <= config.shift_min_values {
                debug!(feature = %name, "retention: too few values to rank");
                return None;
            }
            let ks_stat = ks_statistic(&a, &b)?;
            Some(ShiftIntensity {
                feature: name.clone(),
                ks_stat,
                ks_p_value: ks_p_value(ks_stat, a.len(), b.len()),
                mean_diff: sample::mean(&b) - sample::mean(&a),
            })
        })
        .collect();
    ranked.sort_by(|x, y| {
        y.ks_stat
            .partial_cmp(&x.ks_stat)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(config.top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use axeslab_core::Unavailable;

    fn dataset(n: usize, offset: f64, classes: usize) -> Dataset {
        let label: Vec<Option<f64>> = (0..n).map(|i| Some((i % classes) as f64)).collect();
        let f1: Vec<Option<f64>> = (0..n)
            .map(|i| Some((i % classes) as f64 * 2.0 + ((i * 13) % 7) as f64 * 0.1 + offset))
            .collect();
        let f2: Vec<Option<f64>> = (0..n).map(|i| Some(((i * 7) % 11) as f64)).collect();
        Dataset::new(vec![
            Column::numeric("f1", f1),
            Column::numeric("f2", f2),
            Column::numeric("label", label),
        ])
        .unwrap()
    }

    fn fast() -> RetentionConfig {
        RetentionConfig {
            n_trees: 15,
            ..RetentionConfig::default()
        }
    }

    #[test]
    fn too_few_rows_gates_everything() {
        let report = evaluate_retention(&dataset(100, 0.0, 2), &dataset(300, 0.0, 2), &fast()).unwrap();
        assert_eq!(
            report.macro_f1_base.reason(),
            Some(&Unavailable::InsufficientData {
                required: 200,
                actual: 100
            })
        );
        assert!(report.shift_intensity_features.is_none());
        assert_eq!(report.note.as_deref(), Some("insufficient samples"));
    }

    #[test]
    fn identical_tables_retain_fully() {
        let base = dataset(300, 0.0, 3);
        let report = evaluate_retention(&base, &base, &fast()).unwrap();
        let f1 = report.macro_f1_base.value().unwrap();
        assert!(f1 > 0.95, "f1={f1}");
        let zero = report.retention_zero_shot.value().unwrap();
        assert!((zero - 1.0).abs() < 1e-6, "zero={zero}");
        let ranking = report.shift_intensity_features.unwrap();
        assert!(ranking.iter().all(|s| s.ks_stat == 0.0 && s.mean_diff == 0.0));
        assert!(ranking.iter().all(|s| s.ks_p_value == 1.0));
        assert!(report.note.is_none());
    }

    #[test]
    fn shifted_feature_ranks_first() {
        let base = dataset(300, 0.0, 3);
        let shifted = dataset(300, 3.0, 3);
        let report = evaluate_retention(&base, &shifted, &fast()).unwrap();
        let ranking = report.shift_intensity_features.unwrap();
        assert_eq!(ranking[0].feature, "f1");
        assert!((ranking[0].mean_diff - 3.0).abs() < 1e-9);
        assert!(ranking[0].ks_stat > 0.3);
        assert!(ranking[0].ks_p_value < 1e-6, "{:?}", ranking[0]);
        assert!(ranking.iter().all(|s| (0.0..=1.0).contains(&s.ks_p_value)));
    }

    #[test]
    fn single_class_target_skips_modelling() {
        let base = dataset(250, 0.0, 1);
        let report = evaluate_retention(&base, &base, &fast()).unwrap();
        assert!(!report.macro_f1_base.is_available());
        assert!(!report.retention_retrained.is_available());
        assert!(report.note.unwrap().contains("single class"));
        assert!(report.shift_intensity_features.is_some());
    }

    #[test]
    fn no_common_features_is_noted() {
        let base = dataset(250, 0.0, 2);
        let other = Dataset::new(vec![
            Column::numeric("g", (0..250).map(|i| Some(i as f64)).collect()),
            Column::numeric("label", (0..250).map(|i| Some((i % 2) as f64)).collect()),
        ])
        .unwrap();
        let report = evaluate_retention(&base, &other, &fast()).unwrap();
        assert!(!report.macro_f1_base.is_available());
        assert!(report.note.is_some());
    }

    #[test]
    fn split_is_stratified_and_deterministic() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let (train, test) = holdout_split(&labels, 0.25, 42);
        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 0).count(), 20);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 5);
        assert_eq!(holdout_split(&labels, 0.25, 42), (train, test));
    }

    #[test]
    fn tiny_class_keeps_a_training_row() {
        let labels = vec![0, 0, 0, 0, 1, 1];
        let (train, test) = holdout_split(&labels, 0.25, 1);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 1);
        assert_eq!(train.iter().filter(|&&i| labels[i] == 1).count(), 1);
    }

    #[test]
    fn macro_f1_values() {
        assert_eq!(macro_f1(&[0, 1, 2], &[0, 1, 2]), 1.0);
        // class 0: tp=1 fp=1 fn=0 → 2/3; class 1: tp=0 fn=1 → 0
        let f1 = macro_f1(&[0, 1], &[0, 0]);
        assert!((f1 - 1.0 / 3.0).abs() < 1e-12);
        // A predicted-only class counts toward the average.
        let f1 = macro_f1(&[0, 0], &[0, 2]);
        assert!((f1 - (2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert_eq!(macro_f1(&[], &[]), 0.0);
    }

    #[test]
    fn ratio_propagates_missing_operand() {
        let missing = Metric::degenerate("x");
        assert_eq!(ratio(&missing, &Metric::Available(0.5)), missing);
        assert_eq!(ratio(&Metric::Available(0.5), &missing), missing);
        let r = ratio(&Metric::Available(0.5), &Metric::Available(1.0)).value().unwrap();
        assert!((r - 0.5).abs() < 1e-8);
    }
}
