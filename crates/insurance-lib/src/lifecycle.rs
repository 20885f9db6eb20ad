//! Model lifecycle: load, create-on-miss, reload
//!
//! [`ModelManager`] owns the process-wide current bundle behind a
//! `RwLock<Option<Arc<ModelBundle>>>`. Readers clone the `Arc` and work
//! against an immutable bundle; reload publishes a replacement in one
//! write, so a concurrent prediction sees either the whole old bundle or
//! the whole new one, never a mix.

use crate::bundle::{BundleStore, ModelBundle};
use crate::error::ModelError;
use crate::observability::ServiceMetrics;
use crate::trainer::Trainer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Lifecycle state of the current bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    /// No load has been attempted yet.
    Unloaded,
    /// A validated bundle is available for inference.
    Loaded,
    /// Load and the retrain-retry both failed; no bundle available.
    Failed,
}

/// Owns the shared current-bundle handle and drives the self-healing
/// load sequence.
pub struct ModelManager {
    store: BundleStore,
    trainer: Trainer,
    metrics: ServiceMetrics,
    current: RwLock<Option<Arc<ModelBundle>>>,
    state: RwLock<ModelState>,
}

impl ModelManager {
    pub fn new(store: BundleStore, trainer: Trainer) -> Self {
        Self {
            store,
            trainer,
            metrics: ServiceMetrics::new(),
            current: RwLock::new(None),
            state: RwLock::new(ModelState::Unloaded),
        }
    }

    /// The currently published bundle, if one is loaded.
    pub async fn current(&self) -> Option<Arc<ModelBundle>> {
        self.current.read().await.clone()
    }

    pub async fn state(&self) -> ModelState {
        *self.state.read().await
    }

    pub async fn is_loaded(&self) -> bool {
        self.state().await == ModelState::Loaded
    }

    /// Version of the loaded bundle, if any.
    pub async fn version(&self) -> Option<String> {
        self.current()
            .await
            .map(|bundle| bundle.metadata.version.clone())
    }

    /// Load the persisted bundle, creating one if necessary.
    ///
    /// An explicit bounded sequence, not recursion: attempt the load; if
    /// the artifact is missing or corrupted, train a fresh bundle,
    /// persist it, and retry the load exactly once. Any other failure
    /// path transitions to `Failed` and leaves the current bundle empty;
    /// the hosting service keeps answering in that state.
    pub async fn load(&self) -> bool {
        let outcome = match self.store.load() {
            Ok(bundle) => Ok(bundle),
            Err(err) if err.is_recoverable_by_retrain() => {
                warn!(error = %err, "No usable artifact, training a new model");
                self.train_and_reload(err)
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(bundle) => {
                self.publish(Some(Arc::new(bundle)), ModelState::Loaded).await;
                true
            }
            Err(err) => {
                error!(error = %err, "Model load failed; service degraded");
                self.publish(None, ModelState::Failed).await;
                false
            }
        }
    }

    /// Reload on demand. Same sequence as `load`; the swap is atomic
    /// from the caller's point of view.
    pub async fn reload(&self) -> bool {
        info!(event = "model_reload_requested", "Reloading model bundle");
        self.load().await
    }

    fn train_and_reload(&self, cause: ModelError) -> Result<ModelBundle, ModelError> {
        let bundle = self.trainer.train().map_err(|train_err| {
            error!(
                cause = %cause,
                error = %train_err,
                "Failed to create replacement model"
            );
            train_err
        })?;
        self.metrics.inc_training_runs();
        self.store.save(&bundle)?;
        // One retry against storage, to catch a medium that accepts
        // writes but corrupts reads.
        self.store.load()
    }

    async fn publish(&self, bundle: Option<Arc<ModelBundle>>, state: ModelState) {
        let mut current = self.current.write().await;
        let mut st = self.state.write().await;
        *current = bundle;
        *st = state;
    }
}
