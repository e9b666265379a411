//! Endpoint handlers

use crate::api::state::SharedState;
use crate::config::Deployment;
use crate::error::ApiError;
use crate::metrics::MetricsSnapshot;
use crate::models::scaling::REQUIRED_KEYS;
use crate::types::patient::PatientRecord;
use crate::types::prediction::PredictionResponse;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// JSON body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub models_loaded: bool,
    pub model_directory_used: String,
    pub deployment: Deployment,
    pub expected_scaling_param_keys: Vec<String>,
    /// `None` until a scaling params artifact has been read
    pub loaded_scaling_param_keys: Option<Vec<String>>,
}

/// JSON body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    pub models_loaded_flag: bool,
    pub rf_model_ok: bool,
    pub svm_model_ok: bool,
    pub scaling_params_ok: bool,
    pub load_error: Option<String>,
    pub timestamp: String,
}

/// Score one patient record
pub async fn predict(
    State(state): State<SharedState>,
    payload: Result<Json<PatientRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(record) = payload.map_err(|rejection| {
        warn!(status = rejection.status().as_u16(), error = %rejection.body_text(), "Rejected /predict body");
        ApiError::InvalidRequest(rejection.body_text())
    })?;
    debug!(request = ?record, "Request to /predict");

    let Some(engine) = state.engine.clone() else {
        warn!("Prediction requested but models are not loaded");
        state.metrics.record_unavailable();
        return Err(ApiError::ModelsUnavailable);
    };

    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || engine.predict(&record))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|prediction| prediction);

    match result {
        Ok(prediction) => {
            state.metrics.record_prediction(started.elapsed(), &prediction);
            Ok(Json(prediction.into()))
        }
        Err(e) => {
            state.metrics.record_failure();
            Err(ApiError::PredictionFailed(e))
        }
    }
}

/// Service description and model loading details
pub async fn root(State(state): State<SharedState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Stroke Prediction API is running. Use POST /predict to get predictions.".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models_loaded: state.models_loaded(),
        model_directory_used: state.report.models_dir.display().to_string(),
        deployment: state.deployment,
        expected_scaling_param_keys: REQUIRED_KEYS.iter().map(|k| k.to_string()).collect(),
        loaded_scaling_param_keys: state.report.scaling_keys.clone(),
    })
}

/// Liveness plus per-artifact status; always 200
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let report = &state.report;
    let healthy = state.models_loaded() && report.scaling_params_ok;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        models_loaded_flag: state.models_loaded(),
        rf_model_ok: report.rf_model_ok,
        svm_model_ok: report.svm_model_ok,
        scaling_params_ok: report.scaling_params_ok,
        load_error: report.error.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
