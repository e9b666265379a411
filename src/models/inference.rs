//! Two-model inference engine for stroke-risk prediction

use crate::feature_extractor::FeatureExtractor;
use crate::models::aggregator::ScoreAggregator;
use crate::models::loader::{LoadReport, LoadedModel, ModelArtifacts};
use crate::models::scaling::ScalingParams;
use crate::models::{RANDOM_FOREST, SVM};
use crate::types::patient::PatientRecord;
use crate::types::prediction::{RiskLevel, RiskThresholds, StrokePrediction};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::collections::HashMap;
use tracing::{debug, info};

/// A trained binary classifier over the stroke feature vector.
///
/// Implementations are opaque: the engine only asks for the positive-class
/// probability or the predicted label.
pub trait StrokeModel: Send + Sync {
    /// Model name used in logs and aggregation weights
    fn name(&self) -> &str;

    /// Probability of the stroke class (class 1)
    fn predict_proba(&self, features: &[f32]) -> Result<f64>;

    /// Predicted class label
    fn predict_class(&self, features: &[f32]) -> Result<i64>;
}

impl StrokeModel for LoadedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f64> {
        let output_name = self
            .probability_output
            .as_deref()
            .with_context(|| format!("{} model exports no probability output", self.name))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor(features)?])?;
        let output = outputs
            .get(output_name)
            .with_context(|| format!("{} model produced no `{}` output", self.name, output_name))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = positive_prob_from_tensor(shape, data)
                .with_context(|| format!("{} model returned an empty probability tensor", self.name))?;
            debug!(model = %self.name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return positive_prob_from_sequence_map(output, &self.name);
        }

        anyhow::bail!(
            "{} model output `{}` has unsupported type {:?}",
            self.name,
            output_name,
            dtype
        )
    }

    fn predict_class(&self, features: &[f32]) -> Result<i64> {
        let output_name = self
            .label_output
            .as_deref()
            .with_context(|| format!("{} model exports no label output", self.name))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor(features)?])?;
        let output = outputs
            .get(output_name)
            .with_context(|| format!("{} model produced no `{}` output", self.name, output_name))?;

        let (_, labels) = output
            .try_extract_tensor::<i64>()
            .with_context(|| format!("{} model label output is not an int64 tensor", self.name))?;

        labels
            .first()
            .copied()
            .with_context(|| format!("{} model returned no label", self.name))
    }
}

/// Prepare input tensor - shape [1, num_features]
fn input_tensor(features: &[f32]) -> Result<ort::value::Tensor<f32>> {
    let shape = vec![1_i64, features.len() as i64];
    ort::value::Tensor::from_array((shape, features.to_vec())).context("Failed to create input tensor")
}

/// Class-1 probability from a `[batch, classes]` or `[classes]` tensor
fn positive_prob_from_tensor(shape: &[i64], data: &[f32]) -> Option<f64> {
    let num_classes = shape.last().copied().unwrap_or(0);
    let idx = if num_classes >= 2 { 1 } else { 0 };
    data.get(idx).map(|&p| p as f64)
}

/// Class-1 probability from a `seq(map(int64, float))` output (skl2onnx ZipMap)
fn positive_prob_from_sequence_map(output: &ort::value::DynValue, model_name: &str) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps
        .first()
        .with_context(|| format!("{} model returned an empty sequence", model_name))?;
    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    let prob = positive_prob_from_pairs(&kv_pairs)
        .with_context(|| format!("{} model returned no class probabilities", model_name))?;
    debug!(model = %model_name, prob = prob, "Extracted from seq(map)");
    Ok(prob)
}

/// Class-1 probability from `(class, probability)` pairs, else `1 - p(class 0)`
fn positive_prob_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    let prob_of = |class: i64| {
        pairs
            .iter()
            .find(|(class_id, _)| *class_id == class)
            .map(|(_, prob)| *prob as f64)
    };
    prob_of(1).or_else(|| prob_of(0).map(|p| 1.0 - p))
}

/// Runs the random forest and SVM and folds their outputs into a risk tier
pub struct InferenceEngine {
    random_forest: Box<dyn StrokeModel>,
    svm: Box<dyn StrokeModel>,
    extractor: FeatureExtractor,
    aggregator: ScoreAggregator,
    thresholds: RiskThresholds,
}

impl InferenceEngine {
    pub fn new(
        random_forest: Box<dyn StrokeModel>,
        svm: Box<dyn StrokeModel>,
        scaling: ScalingParams,
        aggregator: ScoreAggregator,
        thresholds: RiskThresholds,
    ) -> Self {
        Self {
            random_forest,
            svm,
            extractor: FeatureExtractor::new(scaling),
            aggregator,
            thresholds,
        }
    }

    /// Build an engine from loaded artifacts.
    ///
    /// Returns `None` for the engine unless every artifact loaded; the
    /// report is returned either way.
    pub fn from_artifacts(
        artifacts: ModelArtifacts,
        aggregator: ScoreAggregator,
        thresholds: RiskThresholds,
    ) -> (Option<Self>, LoadReport) {
        let report = artifacts.report();
        if !report.is_complete() {
            return (None, report);
        }

        let engine = match (artifacts.random_forest, artifacts.svm, artifacts.scaling) {
            (Some(random_forest), Some(svm), Some(scaling)) => Some(Self::new(
                random_forest,
                svm,
                scaling.params,
                aggregator,
                thresholds,
            )),
            _ => None,
        };

        if engine.is_some() {
            info!(
                models = ?[RANDOM_FOREST, SVM],
                low = thresholds.low,
                moderate = thresholds.moderate,
                "Inference engine initialized"
            );
        }
        (engine, report)
    }

    /// Get loaded model names
    pub fn model_names(&self) -> [&str; 2] {
        [self.random_forest.name(), self.svm.name()]
    }

    /// Score one patient
    pub fn predict(&self, record: &PatientRecord) -> Result<StrokePrediction> {
        let features = self.extractor.extract(record)?;

        let rf_prediction = self
            .random_forest
            .predict_proba(&features)
            .with_context(|| format!("{} inference failed", self.random_forest.name()))?;
        if !(0.0..=1.0).contains(&rf_prediction) {
            anyhow::bail!(
                "{} returned probability {} outside [0, 1]",
                self.random_forest.name(),
                rf_prediction
            );
        }

        let svm_prediction = self
            .svm
            .predict_class(&features)
            .with_context(|| format!("{} inference failed", self.svm.name()))?;

        let mut model_scores = HashMap::with_capacity(2);
        model_scores.insert(self.random_forest.name().to_string(), rf_prediction);
        model_scores.insert(self.svm.name().to_string(), svm_prediction as f64);

        let average = self
            .aggregator
            .aggregate(&model_scores)
            .context("No model scores to aggregate")?;
        let stroke_risk = RiskLevel::from_score(average, &self.thresholds);

        info!(
            rf = format!("{:.4}", rf_prediction),
            svm = svm_prediction,
            avg = format!("{:.4}", average),
            risk = %stroke_risk,
            "Prediction successful"
        );

        Ok(StrokePrediction {
            rf_prediction,
            svm_prediction,
            average,
            stroke_risk,
        })
    }
}
