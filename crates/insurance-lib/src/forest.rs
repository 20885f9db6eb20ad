//! Random forest regression
//!
//! CART regression trees with variance-reduction splits, bagged into a
//! forest. Each tree trains on a bootstrap sample drawn from a seeded
//! RNG so forests are reproducible given the same seed. Predictions are
//! the mean over all trees.

use crate::error::ModelError;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// A node in a fitted regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node predicting the mean of the training targets that
    /// reached it.
    Leaf { value: f64, n_samples: usize },
    /// Split on `feature_idx <= threshold` (left) vs `>` (right).
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Decision tree regressor using the CART algorithm with MSE splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    root: Option<TreeNode>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Fit the tree to the rows selected by `indices`.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Result<(), ModelError> {
        if x.len() != y.len() {
            return Err(ModelError::TrainingFailed(
                "feature and target sample counts differ".to_string(),
            ));
        }
        if indices.is_empty() {
            return Err(ModelError::TrainingFailed(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }
        self.root = Some(build_tree(
            x,
            y,
            indices,
            0,
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
        ));
        Ok(())
    }

    /// Predict a single sample.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        self.root
            .as_ref()
            .map(|root| root.predict(row))
            .ok_or_else(|| ModelError::corrupted("regression tree has no fitted nodes"))
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Random forest regressor: bootstrap-bagged CART trees averaged at
/// prediction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    n_estimators: usize,
    max_depth: Option<usize>,
    seed: u64,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            seed,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(DecisionTreeRegressor::is_fitted)
    }

    /// Reported model type for the info endpoint and diagnostics.
    pub fn model_type(&self) -> &'static str {
        "RandomForestRegressor"
    }

    /// Fit the forest. Tree `i` draws its bootstrap sample from
    /// `StdRng::seed_from_u64(seed + i)`, so the fit is deterministic for
    /// a fixed seed.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        if x.len() != y.len() {
            return Err(ModelError::TrainingFailed(
                "feature and target sample counts differ".to_string(),
            ));
        }
        if x.is_empty() {
            return Err(ModelError::TrainingFailed(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }

        self.trees = Vec::with_capacity(self.n_estimators);
        for i in 0..self.n_estimators {
            let indices = bootstrap_sample(x.len(), self.seed + i as u64);
            let mut tree = match self.max_depth {
                Some(depth) => DecisionTreeRegressor::new().with_max_depth(depth),
                None => DecisionTreeRegressor::new(),
            };
            tree.fit(x, y, &indices)?;
            self.trees.push(tree);
        }
        Ok(())
    }

    /// Predict a single sample by averaging over all trees.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::corrupted("regressor has no fitted trees"));
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict_row(row)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict a batch of samples.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }

    /// R² coefficient of determination against `y`.
    pub fn score(&self, x: &[Vec<f64>], y: &[f64]) -> Result<f64, ModelError> {
        let predictions = self.predict(x)?;
        Ok(r_squared(y, &predictions))
    }
}

/// R² coefficient of determination.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Draw a bootstrap sample (with replacement) of `n_samples` indices.
fn bootstrap_sample(n_samples: usize, seed: u64) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

/// Population variance of the targets selected by `indices`.
fn variance(y: &[f64], indices: &[usize]) -> f64 {
    if indices.len() <= 1 {
        return 0.0;
    }
    let m = mean(indices.iter().map(|&i| y[i]), indices.len());
    indices.iter().map(|&i| (y[i] - m).powi(2)).sum::<f64>() / indices.len() as f64
}

/// Weighted child variance for a candidate split.
fn split_mse(y: &[f64], left: &[usize], right: &[usize]) -> f64 {
    let n = (left.len() + right.len()) as f64;
    if n == 0.0 {
        return 0.0;
    }
    (left.len() as f64 / n) * variance(y, left) + (right.len() as f64 / n) * variance(y, right)
}

/// Find the best (feature, threshold) split over the subset, if any
/// split reduces variance. Thresholds are midpoints between consecutive
/// unique feature values.
fn find_best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n_features = x[indices[0]].len();
    let current_variance = variance(y, indices);
    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = 0.0;

    for feature_idx in 0..n_features {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[i][feature_idx]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[i][feature_idx] <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }
            let gain = current_variance - split_mse(y, &left, &right);
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature_idx, threshold));
            }
        }
    }

    best
}

fn make_leaf(y: &[f64], indices: &[usize]) -> TreeNode {
    TreeNode::Leaf {
        value: mean(indices.iter().map(|&i| y[i]), indices.len()),
        n_samples: indices.len(),
    }
}

fn build_tree(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    depth: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
) -> TreeNode {
    let at_max_depth = max_depth.is_some_and(|max| depth >= max);
    if indices.len() < min_samples_split || at_max_depth || variance(y, indices) < 1e-10 {
        return make_leaf(y, indices);
    }

    let Some((feature_idx, threshold)) = find_best_split(x, y, indices) else {
        return make_leaf(y, indices);
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| x[i][feature_idx] <= threshold);
    if left.len() < min_samples_leaf || right.len() < min_samples_leaf {
        return make_leaf(y, indices);
    }

    TreeNode::Split {
        feature_idx,
        threshold,
        left: Box::new(build_tree(
            x,
            y,
            &left,
            depth + 1,
            max_depth,
            min_samples_split,
            min_samples_leaf,
        )),
        right: Box::new(build_tree(
            x,
            y,
            &right,
            depth + 1,
            max_depth,
            min_samples_split,
            min_samples_leaf,
        )),
    }
}
