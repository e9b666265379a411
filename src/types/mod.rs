//! Type definitions for the stroke risk API

pub mod patient;
pub mod prediction;

pub use patient::PatientRecord;
pub use prediction::{PredictionResponse, RiskLevel, RiskThresholds, StrokePrediction};
