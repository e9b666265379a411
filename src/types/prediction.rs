//! Risk tiers and prediction payloads

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stroke risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// All tiers, lowest first
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Moderate, RiskLevel::High];

    /// Determine risk level from an averaged score and thresholds
    pub fn from_score(score: f64, thresholds: &RiskThresholds) -> Self {
        if score < thresholds.low {
            RiskLevel::Low
        } else if score < thresholds.moderate {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (exclusive) of the `Low` and `Moderate` tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: f64,
    pub moderate: f64,
}

impl RiskThresholds {
    /// Check that `0 <= low <= moderate <= 1`
    pub fn validate(&self) -> anyhow::Result<()> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(self.low) || !in_range(self.moderate) {
            anyhow::bail!(
                "risk thresholds must lie in [0, 1] (low={}, moderate={})",
                self.low,
                self.moderate
            );
        }
        if self.low > self.moderate {
            anyhow::bail!(
                "low threshold {} exceeds moderate threshold {}",
                self.low,
                self.moderate
            );
        }
        Ok(())
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.2,
            moderate: 0.5,
        }
    }
}

/// Outcome of running both classifiers on one patient
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePrediction {
    /// Random forest probability of the stroke class
    pub rf_prediction: f64,
    /// SVM predicted class label
    pub svm_prediction: i64,
    /// Aggregated score the tier was derived from
    pub average: f64,
    /// Risk tier
    pub stroke_risk: RiskLevel,
}

impl StrokePrediction {
    /// Agreement between the two models (1.0 = identical outputs)
    pub fn model_agreement(&self) -> f64 {
        1.0 - (self.rf_prediction - self.svm_prediction as f64).abs().min(1.0)
    }
}

/// JSON body returned by `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub rf_prediction: f64,
    pub svm_prediction: i64,
    pub stroke_risk: RiskLevel,
}

impl From<StrokePrediction> for PredictionResponse {
    fn from(prediction: StrokePrediction) -> Self {
        Self {
            rf_prediction: prediction.rf_prediction,
            svm_prediction: prediction.svm_prediction,
            stroke_risk: prediction.stroke_risk,
        }
    }
}
