//! Synthetic-data training for the insurance cost model
//!
//! The trainer has no external data dependency: it synthesizes a labeled
//! dataset from a fixed statistical rule, fits one codec per categorical
//! column and a random forest over the six numeric features, and packages
//! everything into a [`ModelBundle`]. All randomness flows from a single
//! seed, so equal configurations produce bit-identical datasets and
//! numerically identical scores.

use crate::bundle::{BundleMetadata, ModelBundle};
use crate::codec::{assemble_features, LabelCodec, FEATURE_NAMES, NUM_FEATURES};
use crate::error::ModelError;
use crate::forest::RandomForestRegressor;
use crate::models::{REGION_VALUES, SEX_VALUES, SMOKER_VALUES};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Normal, Poisson};
use serde::Deserialize;
use tracing::info;

/// Version stamped into every bundle this trainer produces.
pub const BUNDLE_VERSION: &str = "2.0";
/// Fixed creation date stamped into every bundle.
pub const BUNDLE_CREATED_DATE: &str = "2025-09-24";

/// Trainer configuration. Defaults reproduce the reference model.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    pub n_samples: usize,
    pub n_trees: usize,
    pub seed: u64,
    pub test_fraction: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            n_trees: 100,
            seed: 42,
            test_fraction: 0.2,
        }
    }
}

/// One synthesized dataset: raw categorical columns plus the numeric
/// feature rows and charge labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub ages: Vec<u32>,
    pub sexes: Vec<String>,
    pub bmis: Vec<f64>,
    pub children: Vec<u32>,
    pub smokers: Vec<String>,
    pub regions: Vec<String>,
    pub charges: Vec<f64>,
}

impl SyntheticDataset {
    pub fn len(&self) -> usize {
        self.charges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charges.is_empty()
    }
}

/// Produces fitted model bundles from synthetic data.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Synthesize the labeled dataset from the fixed generative rule.
    ///
    /// Sampling, per column:
    /// - age: uniform integer in `[18, 65)`
    /// - sex: uniform over {male, female}
    /// - bmi: Normal(25, 5) clamped to `[15, 50]`
    /// - children: Poisson(1) clamped to `[0, 5]`
    /// - smoker: yes with probability 0.2
    /// - region: uniform over the four regions
    ///
    /// charges = 1000 + age*50 + bmi factor (bmi*100 above 30, else
    /// bmi*20) + 20000 for smokers + children*500, plus Normal(0, 1000)
    /// noise, clamped to `[1000, 50000]`.
    pub fn synthesize(&self) -> Result<SyntheticDataset, ModelError> {
        let n = self.config.n_samples;
        if n == 0 {
            return Err(ModelError::TrainingFailed(
                "sample count must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let age_dist = Uniform::from(18u32..65);
        let bmi_dist: Normal<f64> = Normal::new(25.0, 5.0)
            .map_err(|e| ModelError::TrainingFailed(format!("bmi distribution: {e}")))?;
        let children_dist = Poisson::new(1.0)
            .map_err(|e| ModelError::TrainingFailed(format!("children distribution: {e}")))?;
        let noise_dist = Normal::new(0.0, 1000.0)
            .map_err(|e| ModelError::TrainingFailed(format!("noise distribution: {e}")))?;

        let ages: Vec<u32> = (0..n).map(|_| age_dist.sample(&mut rng)).collect();
        let sexes: Vec<String> = (0..n)
            .map(|_| SEX_VALUES[rng.gen_range(0..SEX_VALUES.len())].to_string())
            .collect();
        let bmis: Vec<f64> = (0..n)
            .map(|_| bmi_dist.sample(&mut rng).clamp(15.0, 50.0))
            .collect();
        let children: Vec<u32> = (0..n)
            .map(|_| (children_dist.sample(&mut rng) as u32).min(5))
            .collect();
        let smokers: Vec<String> = (0..n)
            .map(|_| {
                let smokes = rng.gen_bool(0.2);
                SMOKER_VALUES[if smokes { 0 } else { 1 }].to_string()
            })
            .collect();
        let regions: Vec<String> = (0..n)
            .map(|_| REGION_VALUES[rng.gen_range(0..REGION_VALUES.len())].to_string())
            .collect();

        let charges: Vec<f64> = (0..n)
            .map(|i| {
                let base = 1000.0 + ages[i] as f64 * 50.0;
                let bmi_factor = if bmis[i] > 30.0 {
                    bmis[i] * 100.0
                } else {
                    bmis[i] * 20.0
                };
                let smoker_factor = if smokers[i] == "yes" { 20_000.0 } else { 0.0 };
                let children_factor = children[i] as f64 * 500.0;
                let noisy =
                    base + bmi_factor + smoker_factor + children_factor + noise_dist.sample(&mut rng);
                noisy.clamp(1000.0, 50_000.0)
            })
            .collect();

        Ok(SyntheticDataset {
            ages,
            sexes,
            bmis,
            children,
            smokers,
            regions,
            charges,
        })
    }

    /// Produce a fully fitted bundle: synthesize, fit codecs, split
    /// 80/20, fit the forest, score both splits, package.
    ///
    /// Fitting errors are not handled here; they propagate to the
    /// lifecycle manager as a fatal could-not-create-model condition.
    pub fn train(&self) -> Result<ModelBundle, ModelError> {
        let data = self.synthesize()?;

        let sex_encoder = LabelCodec::fit("sex", &data.sexes);
        let smoker_encoder = LabelCodec::fit("smoker", &data.smokers);
        let region_encoder = LabelCodec::fit("region", &data.regions);

        let mut x: Vec<Vec<f64>> = Vec::with_capacity(data.len());
        for i in 0..data.len() {
            let features = assemble_features(
                data.ages[i],
                sex_encoder.encode(&data.sexes[i])?,
                data.bmis[i],
                data.children[i],
                smoker_encoder.encode(&data.smokers[i])?,
                region_encoder.encode(&data.regions[i])?,
            );
            x.push(features.to_vec());
        }

        let (train_idx, test_idx) = self.split_indices(data.len());
        let subset = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            (
                idx.iter().map(|&i| x[i].clone()).collect(),
                idx.iter().map(|&i| data.charges[i]).collect(),
            )
        };
        let (x_train, y_train) = subset(&train_idx);
        let (x_test, y_test) = subset(&test_idx);

        let mut model = RandomForestRegressor::new(self.config.n_trees, self.config.seed);
        model.fit(&x_train, &y_train)?;

        let training_score = model.score(&x_train, &y_train)?;
        let test_score = model.score(&x_test, &y_test)?;

        info!(
            event = "model_trained",
            n_samples = data.len(),
            n_trees = self.config.n_trees,
            seed = self.config.seed,
            training_score = training_score,
            test_score = test_score,
            "Trained new model bundle"
        );

        Ok(ModelBundle {
            model,
            sex_encoder,
            smoker_encoder,
            region_encoder,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            metadata: BundleMetadata {
                version: BUNDLE_VERSION.to_string(),
                created_date: BUNDLE_CREATED_DATE.to_string(),
                training_score: Some(training_score),
                test_score: Some(test_score),
            },
        })
    }

    /// Deterministic 80/20 split: shuffle indices with the configured
    /// seed, take the tail as the test set.
    fn split_indices(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let n_test = ((n as f64) * self.config.test_fraction).round() as usize;
        let n_test = n_test.clamp(1, n.saturating_sub(1).max(1));
        let split = n - n_test;
        let test = indices.split_off(split);
        (indices, test)
    }
}

/// Guard: the assembled feature width must match the named contract.
const _: () = assert!(FEATURE_NAMES.len() == NUM_FEATURES);
