//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Detail returned while the model artifacts are missing
pub const MODELS_UNAVAILABLE_DETAIL: &str = "Machine learning models are currently unavailable.";

/// Detail returned for any failure during prediction
pub const PREDICTION_FAILED_DETAIL: &str = "Prediction failed due to an internal error.";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body missing, malformed, or of the wrong shape
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Artifacts failed to load at startup
    #[error("Models not loaded")]
    ModelsUnavailable,

    /// Anything that went wrong while scoring
    #[error("Prediction failed: {0:#}")]
    PredictionFailed(anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ModelsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::PredictionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal failure causes stay in the logs
    pub fn detail(&self) -> String {
        match self {
            ApiError::InvalidRequest(reason) => reason.clone(),
            ApiError::ModelsUnavailable => MODELS_UNAVAILABLE_DETAIL.to_string(),
            ApiError::PredictionFailed(_) => PREDICTION_FAILED_DETAIL.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
