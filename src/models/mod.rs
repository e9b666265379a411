//! ML model loading and inference components

pub mod aggregator;
pub mod inference;
pub mod loader;
pub mod scaling;

pub use aggregator::ScoreAggregator;
pub use inference::{InferenceEngine, StrokeModel};
pub use loader::{LoadReport, ModelArtifacts, ModelLoader};
pub use scaling::ScalingParams;

/// Name of the random forest classifier
pub const RANDOM_FOREST: &str = "random_forest";

/// Name of the support-vector classifier
pub const SVM: &str = "svm";
