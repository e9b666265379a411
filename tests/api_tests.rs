//! HTTP tests for the stroke risk API.
//!
//! The router runs in-process with stand-in models, so no ONNX artifacts
//! are needed.

use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use stroke_risk_api::{
    api::handlers::{HealthResponse, ServiceInfo},
    api::{router, AppState},
    config::{CorsConfig, Deployment},
    metrics::MetricsSnapshot,
    models::{
        loader::{LoadReport, ModelArtifacts},
        scaling::LoadedScaling,
        InferenceEngine, ScalingParams, ScoreAggregator, StrokeModel, RANDOM_FOREST, SVM,
    },
    types::{PredictionResponse, RiskLevel, RiskThresholds},
};

// =============================================================================
// HELPERS
// =============================================================================

struct StubModel {
    name: &'static str,
    proba: f64,
    class: i64,
}

impl StrokeModel for StubModel {
    fn name(&self) -> &str {
        self.name
    }

    fn predict_proba(&self, _features: &[f32]) -> anyhow::Result<f64> {
        Ok(self.proba)
    }

    fn predict_class(&self, _features: &[f32]) -> anyhow::Result<i64> {
        Ok(self.class)
    }
}

struct FailingModel;

impl StrokeModel for FailingModel {
    fn name(&self) -> &str {
        SVM
    }

    fn predict_proba(&self, _features: &[f32]) -> anyhow::Result<f64> {
        anyhow::bail!("inference session unavailable")
    }

    fn predict_class(&self, _features: &[f32]) -> anyhow::Result<i64> {
        anyhow::bail!("inference session unavailable")
    }
}

fn scaling() -> LoadedScaling {
    LoadedScaling {
        params: ScalingParams {
            age_mean: 43.2,
            age_std: 22.6,
            glucose_mean: 106.1,
            glucose_std: 45.3,
            bmi_mean: 28.9,
            bmi_std: 7.8,
        },
        keys: vec![
            "age_mean".to_string(),
            "age_std".to_string(),
            "glucose_mean".to_string(),
            "glucose_std".to_string(),
            "bmi_mean".to_string(),
            "bmi_std".to_string(),
        ],
    }
}

fn server_from_artifacts(artifacts: ModelArtifacts) -> TestServer {
    let (engine, report) = InferenceEngine::from_artifacts(
        artifacts,
        ScoreAggregator::equal_weights(),
        RiskThresholds::default(),
    );
    let state = AppState::new(engine, report, Deployment::Local).shared();
    TestServer::new(router(state, &CorsConfig::default())).unwrap()
}

/// Server with both models returning fixed outputs
fn server_with(rf: f64, svm: i64) -> TestServer {
    let mut artifacts = ModelArtifacts::empty("/srv/stroke/models");
    artifacts.random_forest = Some(Box::new(StubModel {
        name: RANDOM_FOREST,
        proba: rf,
        class: 0,
    }));
    artifacts.svm = Some(Box::new(StubModel {
        name: SVM,
        proba: 0.0,
        class: svm,
    }));
    artifacts.scaling = Some(scaling());
    server_from_artifacts(artifacts)
}

/// Server whose artifacts failed to load after the random forest
fn degraded_server() -> TestServer {
    let mut artifacts = ModelArtifacts::empty("/srv/stroke/models");
    artifacts.random_forest = Some(Box::new(StubModel {
        name: RANDOM_FOREST,
        proba: 0.1,
        class: 0,
    }));
    artifacts.error = Some("svm model not found at /srv/stroke/models/stroke_svm.onnx".to_string());
    server_from_artifacts(artifacts)
}

fn patient() -> Value {
    json!({
        "age": 67.0,
        "hypertension": 0,
        "heart_disease": 1,
        "avg_glucose_level": 228.69,
        "bmi": 36.6,
        "work_children": false,
        "smoke_smokes": true
    })
}

// =============================================================================
// PREDICT
// =============================================================================

#[tokio::test]
async fn test_predict_low_risk() {
    let server = server_with(0.12, 0);

    let response = server.post("/predict").json(&patient()).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: PredictionResponse = response.json();
    assert_eq!(body.rf_prediction, 0.12);
    assert_eq!(body.svm_prediction, 0);
    assert_eq!(body.stroke_risk, RiskLevel::Low);
}

#[tokio::test]
async fn test_predict_moderate_risk() {
    let server = server_with(0.7, 0);

    let body: Value = server.post("/predict").json(&patient()).await.json();

    assert_eq!(body["stroke_risk"], "Moderate");
}

#[tokio::test]
async fn test_predict_high_risk() {
    let server = server_with(0.4, 1);

    let body: Value = server.post("/api/predict").json(&patient()).await.json();

    assert_eq!(body["rf_prediction"], 0.4);
    assert_eq!(body["svm_prediction"], 1);
    assert_eq!(body["stroke_risk"], "High");
}

#[tokio::test]
async fn test_predict_threshold_boundary() {
    // (0.4 + 0) / 2 = 0.2 is not below the Low threshold
    let server = server_with(0.4, 0);

    let body: Value = server.post("/predict").json(&patient()).await.json();

    assert_eq!(body["stroke_risk"], "Moderate");
}

#[tokio::test]
async fn test_predict_missing_field() {
    let server = server_with(0.1, 0);
    let mut body = patient();
    body.as_object_mut().unwrap().remove("bmi");

    let response = server.post("/predict").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let detail: Value = response.json();
    assert!(detail["detail"].as_str().unwrap().contains("bmi"));
}

#[tokio::test]
async fn test_predict_wrong_type() {
    let server = server_with(0.1, 0);
    let mut body = patient();
    body["smoke_smokes"] = json!("sometimes");

    let response = server.post("/predict").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_lenient_flags() {
    let server = server_with(0.1, 0);
    let mut body = patient();
    body["hypertension"] = json!(1.0);
    body["work_children"] = json!(1);
    body["smoke_smokes"] = json!("false");

    let response = server.post("/predict").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_predict_fractional_flag_rejected() {
    let server = server_with(0.1, 0);
    let mut body = patient();
    body["heart_disease"] = json!(0.5);

    let response = server.post("/predict").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_non_json_body() {
    let server = server_with(0.1, 0);

    let response = server.post("/predict").text("age=67").await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_unavailable_when_degraded() {
    let server = degraded_server();

    let response = server.post("/predict").json(&patient()).await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(
        body["detail"],
        "Machine learning models are currently unavailable."
    );
}

#[tokio::test]
async fn test_validation_precedes_availability() {
    let server = degraded_server();

    let response = server.post("/predict").json(&json!({"age": 50})).await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_model_failure() {
    let mut artifacts = ModelArtifacts::empty("/srv/stroke/models");
    artifacts.random_forest = Some(Box::new(StubModel {
        name: RANDOM_FOREST,
        proba: 0.3,
        class: 0,
    }));
    artifacts.svm = Some(Box::new(FailingModel));
    artifacts.scaling = Some(scaling());
    let server = server_from_artifacts(artifacts);

    let response = server.post("/predict").json(&patient()).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Prediction failed due to an internal error.");
    assert!(!body.to_string().contains("inference session"));
}

#[tokio::test]
async fn test_predict_overflowing_input() {
    let server = server_with(0.1, 0);
    let mut body = patient();
    body["age"] = json!(1e300);

    let response = server.post("/predict").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// STATUS ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_root_reports_loaded_models() {
    let server = server_with(0.1, 0);

    for path in ["/", "/api", "/api/"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK, "GET {path}");

        let info: ServiceInfo = response.json();
        assert!(info.models_loaded);
        assert_eq!(info.model_directory_used, "/srv/stroke/models");
        assert_eq!(info.deployment, Deployment::Local);
        assert_eq!(info.expected_scaling_param_keys.len(), 6);
        assert_eq!(info.loaded_scaling_param_keys.map(|k| k.len()), Some(6));
    }
}

#[tokio::test]
async fn test_root_when_degraded() {
    let server = degraded_server();

    let info: ServiceInfo = server.get("/").await.json();

    assert!(!info.models_loaded);
    assert!(info.loaded_scaling_param_keys.is_none());
}

#[tokio::test]
async fn test_health_healthy() {
    let server = server_with(0.1, 0);

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "healthy");
    assert!(health.models_loaded_flag);
    assert!(health.rf_model_ok && health.svm_model_ok && health.scaling_params_ok);
    assert!(health.load_error.is_none());
}

#[tokio::test]
async fn test_health_degraded() {
    let server = degraded_server();

    let response = server.get("/api/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "degraded");
    assert!(!health.models_loaded_flag);
    assert!(health.rf_model_ok);
    assert!(!health.svm_model_ok);
    assert!(!health.scaling_params_ok);
    assert!(health.load_error.unwrap().contains("stroke_svm.onnx"));
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let server = server_with(0.9, 1);

    server.post("/predict").json(&patient()).await;
    server.post("/predict").json(&patient()).await;

    let snapshot: MetricsSnapshot = server.get("/metrics").await.json();
    assert_eq!(snapshot.predictions_served, 2);
    assert_eq!(snapshot.predictions_failed, 0);
    assert_eq!(snapshot.by_risk_level["High"], 2);
    assert_eq!(snapshot.latency.count, 2);
}

#[tokio::test]
async fn test_metrics_count_unavailable() {
    let server = degraded_server();

    server.post("/predict").json(&patient()).await;

    let snapshot: MetricsSnapshot = server.get("/api/metrics").await.json();
    assert_eq!(snapshot.predictions_served, 0);
    assert_eq!(snapshot.rejected_unavailable, 1);
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

#[tokio::test]
async fn test_request_id_generated() {
    let server = server_with(0.1, 0);

    let response = server.get("/health").await;

    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_request_id_propagated() {
    let server = server_with(0.1, 0);

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .await;

    assert_eq!(
        response.headers().get("x-request-id"),
        Some(&HeaderValue::from_static("req-123"))
    );
}

#[tokio::test]
async fn test_request_id_on_preflight() {
    let server = server_with(0.1, 0);

    let response = server
        .method(Method::OPTIONS, "/predict")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:5173"),
        )
        .add_header(
            HeaderName::from_static("access-control-request-method"),
            HeaderValue::from_static("POST"),
        )
        .await;

    assert!(response.headers().get("access-control-allow-origin").is_some());
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_cors_preflight_allowed_origin() {
    let server = server_with(0.1, 0);

    let response = server
        .method(Method::OPTIONS, "/predict")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:5173"),
        )
        .add_header(
            HeaderName::from_static("access-control-request-method"),
            HeaderValue::from_static("POST"),
        )
        .add_header(
            HeaderName::from_static("access-control-request-headers"),
            HeaderValue::from_static("content-type"),
        )
        .await;

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin"),
        Some(&HeaderValue::from_static("http://localhost:5173"))
    );
    assert_eq!(
        headers.get("access-control-allow-credentials"),
        Some(&HeaderValue::from_static("true"))
    );
}

#[tokio::test]
async fn test_cors_unknown_origin_not_allowed() {
    let server = server_with(0.1, 0);

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://evil.example.com"),
        )
        .await;

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_wildcard_mirrors_origin() {
    let (engine, report): (Option<InferenceEngine>, LoadReport) = InferenceEngine::from_artifacts(
        ModelArtifacts::empty("models"),
        ScoreAggregator::default(),
        RiskThresholds::default(),
    );
    let state = AppState::new(engine, report, Deployment::Vercel).shared();
    let cors = CorsConfig {
        allow_origins: "*".to_string(),
    };
    let server = TestServer::new(router(state, &cors)).unwrap();

    let response = server
        .get("/")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://stroke.example.com"),
        )
        .await;

    assert_eq!(
        response.headers().get("access-control-allow-origin"),
        Some(&HeaderValue::from_static("https://stroke.example.com"))
    );
    let info: ServiceInfo = response.json();
    assert_eq!(info.deployment, Deployment::Vercel);
}
