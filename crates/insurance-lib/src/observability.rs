//! Prometheus metrics for the prediction service

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram, IntCounter,
};
use std::sync::OnceLock;

/// Histogram buckets for prediction latency (in seconds). Tree traversal
/// is sub-millisecond; the tail buckets catch degraded behavior.
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    prediction_latency_seconds: Histogram,
    model_reloads_total: IntCounter,
    training_runs_total: IntCounter,
    model_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            predictions_total: register_int_counter!(
                "insurance_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "insurance_prediction_errors_total",
                "Total number of failed prediction attempts"
            )
            .expect("Failed to register prediction_errors_total"),

            prediction_latency_seconds: register_histogram!(
                "insurance_prediction_latency_seconds",
                "Time spent running the prediction pipeline",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            model_reloads_total: register_int_counter!(
                "insurance_model_reloads_total",
                "Total number of model reload requests"
            )
            .expect("Failed to register model_reloads_total"),

            training_runs_total: register_int_counter!(
                "insurance_training_runs_total",
                "Total number of model training runs"
            )
            .expect("Failed to register training_runs_total"),

            model_version_info: register_gauge_vec!(
                "insurance_model_version_info",
                "Information about the currently loaded model bundle",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Lightweight handle to the global metrics instance. Clones share the
/// same underlying registry.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a metrics handle, initializing the global registry on
    /// first use.
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_model_reloads(&self) {
        self.inner().model_reloads_total.inc();
    }

    pub fn inc_training_runs(&self) {
        self.inner().training_runs_total.inc();
    }

    /// Record the loaded model version, clearing any previous one.
    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }
}
