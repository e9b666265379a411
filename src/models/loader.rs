//! Models directory resolution and artifact loading

use crate::config::ModelsConfig;
use crate::models::inference::StrokeModel;
use crate::models::scaling::{LoadedScaling, ScalingParams};
use crate::models::{RANDOM_FOREST, SVM};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session (running requires exclusive access)
    pub session: Mutex<Session>,
    /// Input name for the model
    pub input_name: String,
    /// Output carrying class probabilities, if the graph exports one
    pub probability_output: Option<String>,
    /// Output carrying the predicted class label, if the graph exports one
    pub label_output: Option<String>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("probability_output", &self.probability_output)
            .field("label_output", &self.label_output)
            .finish()
    }
}

/// Everything loaded from the models directory.
///
/// Loading stops at the first failure, so later artifacts stay `None`
/// and `error` explains why.
pub struct ModelArtifacts {
    pub models_dir: PathBuf,
    pub random_forest: Option<Box<dyn StrokeModel>>,
    pub svm: Option<Box<dyn StrokeModel>>,
    pub scaling: Option<LoadedScaling>,
    /// Keys of the scaling artifact, set once it parses as a JSON object
    pub scaling_keys: Option<Vec<String>>,
    pub error: Option<String>,
}

impl ModelArtifacts {
    pub fn empty(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            random_forest: None,
            svm: None,
            scaling: None,
            scaling_keys: None,
            error: None,
        }
    }

    /// Summarize what loaded, without giving up the artifacts
    pub fn report(&self) -> LoadReport {
        LoadReport {
            models_dir: self.models_dir.clone(),
            rf_model_ok: self.random_forest.is_some(),
            svm_model_ok: self.svm.is_some(),
            scaling_params_ok: self.scaling.is_some(),
            scaling_keys: self
                .scaling_keys
                .clone()
                .or_else(|| self.scaling.as_ref().map(|s| s.keys.clone())),
            error: self.error.clone(),
        }
    }
}

/// Outcome of artifact loading, kept for the status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub models_dir: PathBuf,
    pub rf_model_ok: bool,
    pub svm_model_ok: bool,
    pub scaling_params_ok: bool,
    pub scaling_keys: Option<Vec<String>>,
    pub error: Option<String>,
}

impl LoadReport {
    /// All three artifacts are usable
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.rf_model_ok && self.svm_model_ok && self.scaling_params_ok
    }
}

/// Directories searched for a configured models path, most specific first.
///
/// Absolute paths are used as-is. Relative paths are tried against the
/// working directory, then against the executable's directory and each of
/// its ancestors, so a binary under `target/release/` or inside a deployment
/// bundle still finds `<project>/models`.
pub fn candidate_dirs(configured: &Path) -> Vec<PathBuf> {
    if configured.is_absolute() {
        return vec![configured.to_path_buf()];
    }

    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(configured));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        for ancestor in exe_dir.ancestors() {
            let candidate = ancestor.join(configured);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    if candidates.is_empty() {
        candidates.push(configured.to_path_buf());
    }
    candidates
}

/// Pick the first existing candidate directory, or the first candidate if none exist
pub fn resolve_models_dir(configured: &Path) -> PathBuf {
    let candidates = candidate_dirs(configured);
    match candidates.iter().find(|dir| dir.is_dir()) {
        Some(dir) => dir.clone(),
        None => {
            warn!(
                configured = %configured.display(),
                searched = candidates.len(),
                "No existing models directory found"
            );
            candidates
                .into_iter()
                .next()
                .unwrap_or_else(|| configured.to_path_buf())
        }
    }
}

/// Loader for the stroke model artifacts
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    random_forest_file: String,
    svm_file: String,
    scaling_params_file: String,
}

impl ModelLoader {
    /// Create a loader using the configured file names and thread count
    pub fn new(config: &ModelsConfig) -> Self {
        Self {
            onnx_threads: config.onnx_threads,
            random_forest_file: config.random_forest_file.clone(),
            svm_file: config.svm_file.clone(),
            scaling_params_file: config.scaling_params_file.clone(),
        }
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.exists() {
            anyhow::bail!("{} model not found at {}", name, path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load {} model from {}", name, path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| {
                session
                    .outputs
                    .iter()
                    .rev()
                    .find(|o| !o.name.contains("label"))
            })
            .map(|o| o.name.clone());

        info!(
            model = %name,
            input = %input_name,
            probability_output = ?probability_output,
            label_output = ?label_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            probability_output,
            label_output,
        })
    }

    /// Load every artifact from `models_dir`.
    ///
    /// Never fails: problems are recorded in [`ModelArtifacts::error`] and
    /// the service keeps running in degraded mode.
    pub fn load_all<P: AsRef<Path>>(&self, models_dir: P) -> ModelArtifacts {
        let mut artifacts = ModelArtifacts::empty(models_dir.as_ref());

        if let Err(e) = self.load_into(&mut artifacts) {
            let message = format!("{e:#}");
            error!(
                models_dir = %artifacts.models_dir.display(),
                error = %message,
                "Model loading failed, serving in degraded mode"
            );
            artifacts.error = Some(message);
        }

        artifacts
    }

    fn load_into(&self, artifacts: &mut ModelArtifacts) -> Result<()> {
        let models_dir = artifacts.models_dir.clone();
        info!(models_dir = %models_dir.display(), "Loading model artifacts");

        if !models_dir.is_dir() {
            anyhow::bail!("Models directory not found at {}", models_dir.display());
        }

        let rf_path = models_dir.join(&self.random_forest_file);
        artifacts.random_forest = Some(Box::new(self.load_model(&rf_path, RANDOM_FOREST)?));

        let svm_path = models_dir.join(&self.svm_file);
        artifacts.svm = Some(Box::new(self.load_model(&svm_path, SVM)?));

        self.load_scaling(&models_dir.join(&self.scaling_params_file), artifacts)?;

        info!("All models and scaling parameters loaded");
        Ok(())
    }

    /// Keys are recorded before validation so a bad file still shows what it holds
    fn load_scaling(&self, path: &Path, artifacts: &mut ModelArtifacts) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("Scaling params not found at {}", path.display());
        }
        info!(path = %path.display(), "Loading scaling params");

        let map = ScalingParams::read_object(path)?;
        let keys: Vec<String> = map.keys().cloned().collect();
        info!(keys = ?keys, "Scaling params parsed");
        artifacts.scaling_keys = Some(keys);

        artifacts.scaling = Some(ScalingParams::from_map(&map)?);
        Ok(())
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(&ModelsConfig::default())
    }
}
