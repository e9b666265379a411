//! State shared by every request handler

use crate::config::Deployment;
use crate::metrics::PredictionMetrics;
use crate::models::inference::InferenceEngine;
use crate::models::loader::LoadReport;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    /// Present only when every artifact loaded
    pub engine: Option<Arc<InferenceEngine>>,
    pub report: LoadReport,
    pub deployment: Deployment,
    pub metrics: Arc<PredictionMetrics>,
}

impl AppState {
    pub fn new(engine: Option<InferenceEngine>, report: LoadReport, deployment: Deployment) -> Self {
        Self {
            engine: engine.map(Arc::new),
            report,
            deployment,
            metrics: Arc::new(PredictionMetrics::new()),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn models_loaded(&self) -> bool {
        self.engine.is_some()
    }
}
