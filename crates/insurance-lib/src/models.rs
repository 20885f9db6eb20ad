//! Core data models for the prediction service

use serde::{Deserialize, Serialize};

/// Valid age range for a prediction request (inclusive).
pub const AGE_RANGE: (u32, u32) = (18, 100);
/// Valid BMI range for a prediction request (inclusive).
pub const BMI_RANGE: (f64, f64) = (15.0, 50.0);
/// Valid children count range for a prediction request (inclusive).
pub const CHILDREN_RANGE: (u32, u32) = (0, 10);

/// Accepted labels for the sex field.
pub const SEX_VALUES: [&str; 2] = ["male", "female"];
/// Accepted labels for the smoker field.
pub const SMOKER_VALUES: [&str; 2] = ["yes", "no"];
/// Accepted labels for the region field.
pub const REGION_VALUES: [&str; 4] = ["northeast", "northwest", "southeast", "southwest"];

/// A single insurance cost prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRequest {
    pub age: u32,
    pub sex: String,
    pub bmi: f64,
    pub children: u32,
    pub smoker: String,
    pub region: String,
}

impl InsuranceRequest {
    /// Check field ranges and enums, returning one message per violation.
    ///
    /// Runs ahead of the prediction service so out-of-range values never
    /// reach the codec or the model.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        if self.age < AGE_RANGE.0 || self.age > AGE_RANGE.1 {
            violations.push(format!(
                "age must be between {} and {}, got {}",
                AGE_RANGE.0, AGE_RANGE.1, self.age
            ));
        }
        if !SEX_VALUES.contains(&self.sex.to_lowercase().as_str()) {
            violations.push(format!("sex must be one of {:?}, got {:?}", SEX_VALUES, self.sex));
        }
        if !(BMI_RANGE.0..=BMI_RANGE.1).contains(&self.bmi) {
            violations.push(format!(
                "bmi must be between {} and {}, got {}",
                BMI_RANGE.0, BMI_RANGE.1, self.bmi
            ));
        }
        if self.children > CHILDREN_RANGE.1 {
            violations.push(format!(
                "children must be between {} and {}, got {}",
                CHILDREN_RANGE.0, CHILDREN_RANGE.1, self.children
            ));
        }
        if !SMOKER_VALUES.contains(&self.smoker.to_lowercase().as_str()) {
            violations.push(format!(
                "smoker must be one of {:?}, got {:?}",
                SMOKER_VALUES, self.smoker
            ));
        }
        if !REGION_VALUES.contains(&self.region.to_lowercase().as_str()) {
            violations.push(format!(
                "region must be one of {:?}, got {:?}",
                REGION_VALUES, self.region
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Coarse risk bucket derived from predicted cost via fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Risk tier threshold between Low and Medium.
pub const RISK_MEDIUM_THRESHOLD: f64 = 5_000.0;
/// Risk tier threshold between Medium and High.
pub const RISK_HIGH_THRESHOLD: f64 = 15_000.0;

impl RiskLevel {
    /// Derive the tier from a predicted cost.
    pub fn from_cost(cost: f64) -> Self {
        if cost < RISK_MEDIUM_THRESHOLD {
            RiskLevel::Low
        } else if cost < RISK_HIGH_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Result of a successful prediction. Created fresh per request, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_cost: f64,
    pub input_data: InsuranceRequest,
    pub model_info: crate::bundle::BundleMetadata,
    pub risk_level: RiskLevel,
}

/// Payload for the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// Health status of the serving process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    ModelNotLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> InsuranceRequest {
        InsuranceRequest {
            age: 30,
            sex: "male".to_string(),
            bmi: 25.0,
            children: 1,
            smoker: "no".to_string(),
            region: "northeast".to_string(),
        }
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        let mut req = valid_request();
        req.age = 17;
        assert!(req.validate().is_err());
        req.age = 101;
        assert!(req.validate().is_err());
    }

    #[test]
    fn boundary_values_are_accepted() {
        let mut req = valid_request();
        req.age = 18;
        req.bmi = 15.0;
        req.children = 0;
        assert!(req.validate().is_ok());
        req.age = 100;
        req.bmi = 50.0;
        req.children = 10;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn unknown_enum_values_collect_messages() {
        let mut req = valid_request();
        req.sex = "other".to_string();
        req.smoker = "sometimes".to_string();
        req.region = "midwest".to_string();
        let violations = req.validate().unwrap_err();
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn mixed_case_enum_values_are_accepted() {
        let mut req = valid_request();
        req.sex = "Male".to_string();
        req.smoker = "NO".to_string();
        req.region = "NorthEast".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn risk_tier_thresholds() {
        assert_eq!(RiskLevel::from_cost(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_cost(4999.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_cost(5000.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_cost(14999.99), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_cost(15000.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_cost(50000.0), RiskLevel::High);
    }

    #[test]
    fn risk_level_serializes_capitalized() {
        let json = serde_json::to_string(&RiskLevel::Medium).unwrap();
        assert_eq!(json, "\"Medium\"");
    }

    #[test]
    fn health_status_serializes_snake_case() {
        let json = serde_json::to_string(&HealthStatus::ModelNotLoaded).unwrap();
        assert_eq!(json, "\"model_not_loaded\"");
    }
}
