//! HTTP API for insurance cost predictions
//!
//! Routes mirror the service contract: identity, health, model info,
//! prediction, reload, illustrative dashboard stats, and Prometheus
//! metrics. Handlers receive the shared lifecycle manager through
//! application state; none of them can crash the process — degraded
//! states are reported as structured payloads.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use insurance_lib::{
    models::{HealthResponse, HealthStatus},
    InsuranceRequest, ModelError, ModelManager, PredictionService, ServiceMetrics,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const API_VERSION: &str = "2.0.0";

/// Shared application state
pub struct AppState {
    pub manager: ModelManager,
    pub service: PredictionService,
    pub metrics: ServiceMetrics,
}

impl AppState {
    pub fn new(manager: ModelManager, metrics: ServiceMetrics) -> Self {
        Self {
            manager,
            service: PredictionService::new(metrics.clone()),
            metrics,
        }
    }
}

/// Service identity and load state
async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "Medical Insurance Cost Prediction API",
        "status": "active",
        "version": API_VERSION,
        "model_loaded": state.manager.is_loaded().await,
    }))
}

/// Health check - always 200; degraded state is reported, not fatal
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let loaded = state.manager.is_loaded().await;
    Json(HealthResponse {
        status: if loaded {
            HealthStatus::Healthy
        } else {
            HealthStatus::ModelNotLoaded
        },
        model_loaded: loaded,
        model_version: state.manager.version().await,
    })
}

/// Model type, feature names, codec vocabularies, and bundle metadata
async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(bundle) = state.manager.current().await else {
        return Json(json!({
            "error": "Model not loaded",
            "suggestion": "Try POST /reload-model or restart the server",
        }));
    };

    Json(json!({
        "model_type": bundle.model.model_type(),
        "features": ["age", "sex", "bmi", "children", "smoker", "region"],
        "feature_names": bundle.feature_names,
        "sex_categories": bundle.sex_encoder.labels(),
        "smoker_categories": bundle.smoker_encoder.labels(),
        "region_categories": bundle.region_encoder.labels(),
        "n_estimators": bundle.model.n_estimators(),
        "version": bundle.metadata.version,
        "created_date": bundle.metadata.created_date,
        "training_score": bundle.metadata.training_score,
        "test_score": bundle.metadata.test_score,
    }))
}

/// Run a prediction for one validated request
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InsuranceRequest>,
) -> impl IntoResponse {
    if let Err(violations) = request.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "Validation failed",
                "details": violations,
            })),
        );
    }

    match state.service.predict(&state.manager, &request).await {
        Ok(prediction) => (StatusCode::OK, Json(json!(prediction))),
        Err(ModelError::ModelUnavailable) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Model not loaded",
                "message": "The ML model could not be loaded. Please check server logs.",
                "suggestion": "Try POST /reload-model or contact the administrator",
            })),
        ),
        Err(ModelError::PredictionFailed { input, source }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Prediction failed",
                "message": source.to_string(),
                "input_data": input,
            })),
        ),
        Err(other) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Prediction failed",
                "message": other.to_string(),
                "input_data": request,
            })),
        ),
    }
}

/// Re-run the load sequence and report the resulting state
async fn reload_model(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.inc_model_reloads();
    let success = state.manager.reload().await;
    if let Some(version) = state.manager.version().await {
        state.metrics.set_model_version(&version);
    }

    Json(json!({
        "success": success,
        "message": if success {
            "Model reloaded successfully"
        } else {
            "Failed to reload model"
        },
        "model_loaded": state.manager.is_loaded().await,
    }))
}

/// Illustrative dashboard counters - static by design, no aggregation
async fn dashboard_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "total_predictions": 1247,
        "avg_cost": 13270,
        "high_risk_patients": 312,
        "recent_predictions": 47,
        "model_status": if state.manager.is_loaded().await {
            "loaded"
        } else {
            "not_loaded"
        },
    }))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/model-info", get(model_info))
        .route("/predict", post(predict))
        .route("/reload-model", post(reload_model))
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
