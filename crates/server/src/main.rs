use insurance_api::api::{self, AppState};
use insurance_api::config::ServerConfig;
use insurance_lib::{BundleStore, ModelManager, ServiceMetrics, Trainer};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    info!(
        port = config.port,
        model_path = %config.model_path,
        "Starting insurance prediction service"
    );

    let metrics = ServiceMetrics::new();
    let store = BundleStore::new(&config.model_path);
    let trainer = Trainer::new(config.trainer_config());
    let manager = ModelManager::new(store, trainer);

    // The service stays up even when the model cannot be loaded; every
    // endpoint reports the degraded state and /reload-model can recover.
    if manager.load().await {
        if let Some(version) = manager.version().await {
            metrics.set_model_version(&version);
            info!(model_version = %version, "Model ready");
        }
    } else {
        warn!("Model failed to load at startup, serving in degraded mode");
    }

    let state = Arc::new(AppState::new(manager, metrics));
    api::serve(config.port, state).await
}
