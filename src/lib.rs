//! Stroke Risk API Library
//!
//! Serves stroke-risk predictions from a random forest and an SVM,
//! averaging their outputs into a Low / Moderate / High tier.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod types;

pub use api::{router, AppState, SharedState};
pub use config::AppConfig;
pub use error::ApiError;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::{InferenceEngine, StrokeModel};
pub use types::{PatientRecord, PredictionResponse, RiskLevel};
