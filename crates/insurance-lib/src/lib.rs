//! Core library for the insurance cost prediction service
//!
//! This crate provides:
//! - Categorical feature encoding with a fixed feature-order contract
//! - A random forest regressor trained on synthetic insurance data
//! - Model bundle persistence and validation
//! - The load/train/reload lifecycle with a single shared model handle
//! - The prediction pipeline and risk tier derivation

pub mod bundle;
pub mod codec;
pub mod error;
pub mod forest;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod service;
pub mod trainer;

pub use bundle::{ArtifactRecord, BundleMetadata, BundleStore, ModelBundle};
pub use codec::{LabelCodec, FEATURE_NAMES, NUM_FEATURES};
pub use error::ModelError;
pub use forest::{DecisionTreeRegressor, RandomForestRegressor};
pub use lifecycle::{ModelManager, ModelState};
pub use models::{InsuranceRequest, Prediction, RiskLevel};
pub use observability::ServiceMetrics;
pub use service::PredictionService;
pub use trainer::{Trainer, TrainerConfig};
