//! Categorical feature encoding and feature vector assembly
//!
//! A [`LabelCodec`] maps the string labels of one categorical column to
//! stable integer codes (the label's rank in sorted order). Codecs are
//! fitted once during training and are immutable afterward; encoding a
//! label outside the fitted vocabulary is an error, never a default.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Number of features consumed by the regressor.
pub const NUM_FEATURES: usize = 6;

/// Ordered feature column names shared by the trainer and the prediction
/// service. The regressor is fitted against columns in exactly this
/// order, so any consumer assembling a feature vector must go through
/// [`assemble_features`] rather than writing its own literal list.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "age",
    "sex_encoded",
    "bmi",
    "children",
    "smoker_encoded",
    "region_encoded",
];

/// Fitted label-to-code mapping for one categorical feature.
///
/// Codes are contiguous in `[0, N)` for the N distinct labels observed at
/// fit time, assigned by sorted rank so they are stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCodec {
    field: String,
    labels: Vec<String>,
}

impl LabelCodec {
    /// Fit a codec from the labels observed in one training column.
    ///
    /// Duplicates are collapsed; the surviving labels are sorted and their
    /// rank becomes the code.
    pub fn fit(field: &str, observed: &[String]) -> Self {
        let mut labels: Vec<String> = observed.to_vec();
        labels.sort();
        labels.dedup();
        Self {
            field: field.to_string(),
            labels,
        }
    }

    /// Name of the field this codec was fitted for.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The fitted vocabulary in code order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Encode a label to its integer code, case-folding to lowercase
    /// before lookup.
    pub fn encode(&self, label: &str) -> Result<u32, ModelError> {
        let folded = label.to_lowercase();
        self.labels
            .binary_search(&folded)
            .map(|idx| idx as u32)
            .map_err(|_| ModelError::UnknownCategory {
                field: self.field.clone(),
                value: label.to_string(),
            })
    }

    /// Decode an integer code back to its label.
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(String::as_str)
    }
}

/// Assemble the six-element feature vector in [`FEATURE_NAMES`] order.
pub fn assemble_features(
    age: u32,
    sex_code: u32,
    bmi: f64,
    children: u32,
    smoker_code: u32,
    region_code: u32,
) -> [f64; NUM_FEATURES] {
    [
        age as f64,
        sex_code as f64,
        bmi,
        children as f64,
        smoker_code as f64,
        region_code as f64,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_codec() -> LabelCodec {
        let observed: Vec<String> = ["southeast", "northeast", "southwest", "northwest", "northeast"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        LabelCodec::fit("region", &observed)
    }

    #[test]
    fn codes_are_sorted_rank() {
        let codec = region_codec();
        assert_eq!(codec.labels(), ["northeast", "northwest", "southeast", "southwest"]);
        assert_eq!(codec.encode("northeast").unwrap(), 0);
        assert_eq!(codec.encode("southwest").unwrap(), 3);
    }

    #[test]
    fn codes_are_contiguous() {
        let codec = region_codec();
        for (expected, label) in codec.labels().to_vec().iter().enumerate() {
            assert_eq!(codec.encode(label).unwrap(), expected as u32);
        }
    }

    #[test]
    fn round_trip_every_fitted_label() {
        let codec = region_codec();
        for label in codec.labels().to_vec() {
            let code = codec.encode(&label).unwrap();
            assert_eq!(codec.decode(code), Some(label.as_str()));
        }
    }

    #[test]
    fn encode_is_case_insensitive() {
        let codec = region_codec();
        assert_eq!(codec.encode("NorthEast").unwrap(), 0);
        assert_eq!(codec.encode("SOUTHWEST").unwrap(), 3);
    }

    #[test]
    fn unseen_label_fails_instead_of_defaulting() {
        let codec = region_codec();
        let err = codec.encode("midwest").unwrap_err();
        match err {
            ModelError::UnknownCategory { field, value } => {
                assert_eq!(field, "region");
                assert_eq!(value, "midwest");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn decode_out_of_range_is_none() {
        let codec = region_codec();
        assert_eq!(codec.decode(4), None);
    }

    #[test]
    fn feature_order_is_the_contract() {
        // The trainer fits against columns in this exact order; a drift
        // here silently corrupts every prediction.
        assert_eq!(
            FEATURE_NAMES,
            ["age", "sex_encoded", "bmi", "children", "smoker_encoded", "region_encoded"]
        );
        let features = assemble_features(30, 1, 25.0, 1, 0, 2);
        assert_eq!(features, [30.0, 1.0, 25.0, 1.0, 0.0, 2.0]);
    }
}
