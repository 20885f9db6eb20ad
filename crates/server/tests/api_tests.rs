//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use insurance_api::api::{create_router, AppState};
use insurance_lib::{BundleStore, ModelManager, ServiceMetrics, Trainer, TrainerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_trainer() -> Trainer {
    Trainer::new(TrainerConfig {
        n_samples: 80,
        n_trees: 3,
        seed: 42,
        ..TrainerConfig::default()
    })
}

/// App over an empty temp directory; no model loaded yet.
fn setup_app(dir: &TempDir) -> (Router, Arc<AppState>) {
    let store = BundleStore::new(dir.path().join("model.bin"));
    let manager = ModelManager::new(store, test_trainer());
    let state = Arc::new(AppState::new(manager, ServiceMetrics::new()));
    (create_router(state.clone()), state)
}

/// App with a freshly trained model already loaded.
async fn setup_loaded_app(dir: &TempDir) -> (Router, Arc<AppState>) {
    let (app, state) = setup_app(dir);
    assert!(state.manager.load().await);
    (app, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn sample_request() -> Value {
    json!({
        "age": 30,
        "sex": "male",
        "bmi": 25.0,
        "children": 1,
        "smoker": "no",
        "region": "northeast"
    })
}

#[tokio::test]
async fn test_root_reports_identity_and_load_state() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Medical Insurance Cost Prediction API");
    assert_eq!(body["status"], "active");
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_health_when_model_loaded() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_version"], "2.0");
}

#[tokio::test]
async fn test_health_degraded_still_returns_200() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_app(&dir);

    let (status, body) = get(app, "/health").await;

    // Degraded state is reported in the payload, never as an error status
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "model_not_loaded");
    assert_eq!(body["model_loaded"], false);
    assert!(body.get("model_version").is_none());
}

#[tokio::test]
async fn test_predict_returns_cost_and_risk_tier() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let (status, body) = post_json(app, "/predict", sample_request()).await;

    assert_eq!(status, StatusCode::OK);
    let cost = body["predicted_cost"].as_f64().unwrap();
    assert!(cost >= 0.0);
    let risk = body["risk_level"].as_str().unwrap();
    assert!(["Low", "Medium", "High"].contains(&risk));
    assert_eq!(body["input_data"]["age"], 30);
    assert_eq!(body["model_info"]["version"], "2.0");
}

#[tokio::test]
async fn test_predict_smoker_is_high_risk() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let mut request = sample_request();
    request["smoker"] = json!("yes");
    request["age"] = json!(55);

    let (status, body) = post_json(app, "/predict", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_level"], "High");
}

#[tokio::test]
async fn test_predict_without_model_returns_500_with_suggestion() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_app(&dir);

    let (status, body) = post_json(app, "/predict", sample_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model not loaded");
    assert!(body["suggestion"].as_str().unwrap().contains("/reload-model"));
}

#[tokio::test]
async fn test_predict_rejects_out_of_range_input() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let mut request = sample_request();
    request["age"] = json!(150);
    request["bmi"] = json!(9.5);

    let (status, body) = post_json(app, "/predict", request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_predict_rejects_unknown_enum_value() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let mut request = sample_request();
    request["region"] = json!("atlantis");

    let (status, body) = post_json(app, "/predict", request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation failed");
}

#[tokio::test]
async fn test_model_info_when_loaded() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let (status, body) = get(app, "/model-info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "RandomForestRegressor");
    assert_eq!(
        body["features"],
        json!(["age", "sex", "bmi", "children", "smoker", "region"])
    );
    assert_eq!(body["sex_categories"], json!(["female", "male"]));
    assert_eq!(body["smoker_categories"], json!(["no", "yes"]));
    assert_eq!(body["region_categories"].as_array().unwrap().len(), 4);
    assert_eq!(body["n_estimators"], 3);
    assert_eq!(body["version"], "2.0");
    assert!(body["training_score"].as_f64().is_some());
    assert!(body["test_score"].as_f64().is_some());
}

#[tokio::test]
async fn test_model_info_without_model_suggests_reload() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_app(&dir);

    let (status, body) = get(app, "/model-info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "Model not loaded");
    assert!(body["suggestion"].as_str().is_some());
}

#[tokio::test]
async fn test_reload_model_recovers_from_empty_storage() {
    let dir = TempDir::new().unwrap();
    let (app, state) = setup_app(&dir);
    assert!(!state.manager.is_loaded().await);

    let (status, body) = post_json(app, "/reload-model", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Model reloaded successfully");
    assert_eq!(body["model_loaded"], true);
    assert!(dir.path().join("model.bin").exists());
}

#[tokio::test]
async fn test_dashboard_stats_shape() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    let (status, body) = get(app, "/dashboard-stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_predictions"], 1247);
    assert_eq!(body["avg_cost"], 13270);
    assert_eq!(body["high_risk_patients"], 312);
    assert_eq!(body["recent_predictions"], 47);
    assert_eq!(body["model_status"], "loaded");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_loaded_app(&dir).await;

    // Serve one prediction so counters exist in the gather
    let (status, _) = post_json(app.clone(), "/predict", sample_request()).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("insurance_predictions_total"));
}
