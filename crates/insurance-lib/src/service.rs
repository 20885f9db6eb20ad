//! Prediction pipeline: encode, assemble, infer, derive risk
//!
//! Stateless per request. The caller supplies the bundle handle it read
//! from the lifecycle manager, so a prediction runs entirely against one
//! immutable bundle even while a reload is in flight.

use crate::bundle::ModelBundle;
use crate::codec::assemble_features;
use crate::error::ModelError;
use crate::lifecycle::ModelManager;
use crate::models::{InsuranceRequest, Prediction, RiskLevel};
use crate::observability::ServiceMetrics;
use std::time::Instant;
use tracing::{info, warn};

/// Runs predictions against the manager's current bundle.
pub struct PredictionService {
    metrics: ServiceMetrics,
}

impl PredictionService {
    pub fn new(metrics: ServiceMetrics) -> Self {
        Self { metrics }
    }

    /// Predict the insurance cost for one request.
    ///
    /// Fails with `ModelUnavailable` when no bundle is loaded; any
    /// failure inside the pipeline is wrapped as `PredictionFailed`
    /// carrying the original input.
    pub async fn predict(
        &self,
        manager: &ModelManager,
        request: &InsuranceRequest,
    ) -> Result<Prediction, ModelError> {
        let Some(bundle) = manager.current().await else {
            warn!(event = "prediction_rejected", "Prediction attempted with no model loaded");
            self.metrics.inc_prediction_errors();
            return Err(ModelError::ModelUnavailable);
        };

        let start = Instant::now();
        match run_pipeline(&bundle, request) {
            Ok(prediction) => {
                self.metrics.inc_predictions();
                self.metrics
                    .observe_prediction_latency(start.elapsed().as_secs_f64());
                info!(
                    event = "prediction_served",
                    predicted_cost = prediction.predicted_cost,
                    risk_level = ?prediction.risk_level,
                    model_version = %bundle.metadata.version,
                    "Prediction successful"
                );
                Ok(prediction)
            }
            Err(source) => {
                self.metrics.inc_prediction_errors();
                warn!(event = "prediction_failed", error = %source, "Prediction failed");
                Err(ModelError::PredictionFailed {
                    input: request.clone(),
                    source: Box::new(source),
                })
            }
        }
    }
}

/// The encode → assemble → infer → clamp → round pipeline against a
/// single bundle.
fn run_pipeline(bundle: &ModelBundle, request: &InsuranceRequest) -> Result<Prediction, ModelError> {
    let sex_code = bundle.sex_encoder.encode(&request.sex.to_lowercase())?;
    let smoker_code = bundle.smoker_encoder.encode(&request.smoker.to_lowercase())?;
    let region_code = bundle.region_encoder.encode(&request.region.to_lowercase())?;

    let features = assemble_features(
        request.age,
        sex_code,
        request.bmi,
        request.children,
        smoker_code,
        region_code,
    );

    let raw = bundle.model.predict_row(&features)?;
    let predicted_cost = round2(raw.max(0.0));

    Ok(Prediction {
        predicted_cost,
        input_data: request.clone(),
        model_info: bundle.metadata.clone(),
        risk_level: RiskLevel::from_cost(predicted_cost),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
