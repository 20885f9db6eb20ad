//! Server configuration

use anyhow::Result;
use insurance_lib::TrainerConfig;
use serde::Deserialize;

/// Server configuration, loaded from `INSURANCE_*` environment
/// variables with defaults matching the reference deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP port for the prediction API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the persisted model artifact
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Seed for synthetic data generation and forest fitting
    #[serde(default = "default_train_seed")]
    pub train_seed: u64,

    /// Number of synthetic samples per training run
    #[serde(default = "default_train_samples")]
    pub train_samples: usize,

    /// Number of trees in the forest
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
}

fn default_port() -> u16 {
    8000
}

fn default_model_path() -> String {
    "model.bin".to_string()
}

fn default_train_seed() -> u64 {
    42
}

fn default_train_samples() -> usize {
    1000
}

fn default_n_trees() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            model_path: default_model_path(),
            train_seed: default_train_seed(),
            train_samples: default_train_samples(),
            n_trees: default_n_trees(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("INSURANCE"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Trainer settings derived from this configuration.
    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            n_samples: self.train_samples,
            n_trees: self.n_trees,
            seed: self.train_seed,
            ..TrainerConfig::default()
        }
    }
}
