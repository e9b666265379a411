//! Feature extraction for stroke-risk model inference.
//!
//! Builds the seven-element input vector the models were trained on,
//! standardizing the continuous measurements with the fitted scaling
//! parameters.

use crate::models::scaling::ScalingParams;
use crate::types::patient::PatientRecord;
use anyhow::Result;

/// Number of features the models expect
pub const FEATURE_COUNT: usize = 7;

/// Feature extractor that transforms patient records into model input features.
///
/// Features are produced in the exact column order used during training.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    scaling: ScalingParams,
}

impl FeatureExtractor {
    /// Create a new feature extractor from fitted scaling parameters.
    pub fn new(scaling: ScalingParams) -> Self {
        Self { scaling }
    }

    /// Extract features from a patient record.
    ///
    /// Fails if any feature is not finite, which only happens when an input
    /// is large enough to overflow `f32`.
    pub fn extract(&self, record: &PatientRecord) -> Result<Vec<f32>> {
        let s = &self.scaling;

        let features = vec![
            ((record.age - s.age_mean) / s.age_std) as f32,
            record.hypertension as f32,
            record.heart_disease as f32,
            ((record.avg_glucose_level - s.glucose_mean) / s.glucose_std) as f32,
            ((record.bmi - s.bmi_mean) / s.bmi_std) as f32,
            if record.work_children { 1.0 } else { 0.0 },
            if record.smoke_smokes { 1.0 } else { 0.0 },
        ];

        if let Some(idx) = features.iter().position(|f| !f.is_finite()) {
            anyhow::bail!(
                "Feature `{}` is not finite ({})",
                self.feature_names()[idx],
                features[idx]
            );
        }

        Ok(features)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (matching training column order).
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        [
            "age",
            "hypertension",
            "heart_disease",
            "avg_glucose_level",
            "bmi",
            "work_type_children",
            "smoking_status_smokes",
        ]
    }
}
