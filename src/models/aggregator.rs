//! Score aggregation for the two-model ensemble

use std::collections::HashMap;

/// Aggregates per-model scores into the single score a risk tier is derived from.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    /// Model weights for weighted average
    weights: HashMap<String, f64>,
    /// Default weight for models not in the weights map
    default_weight: f64,
}

impl ScoreAggregator {
    /// Create a new score aggregator with model weights.
    ///
    /// Models missing from `weights` count with weight 1.0.
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self {
            weights,
            default_weight: 1.0,
        }
    }

    /// Create aggregator with equal weights for all models (plain average).
    pub fn equal_weights() -> Self {
        Self::new(HashMap::new())
    }

    /// Aggregate model scores into a single score.
    ///
    /// Uses weighted average where weights are normalized to sum to 1.
    /// Returns `None` when there is nothing to average.
    pub fn aggregate(&self, model_scores: &HashMap<String, f64>) -> Option<f64> {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (model_name, &score) in model_scores {
            let weight = self.weight_for(model_name);
            weighted_sum += score * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            Some((weighted_sum / total_weight).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// Weight applied to a model's score.
    pub fn weight_for(&self, model_name: &str) -> f64 {
        self.weights
            .get(model_name)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Set weight for a specific model.
    pub fn set_weight(&mut self, model_name: &str, weight: f64) {
        self.weights.insert(model_name.to_string(), weight);
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::equal_weights()
    }
}
