//! Prediction metrics and statistics tracking.

use crate::types::prediction::{RiskLevel, StrokePrediction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Samples kept for latency and agreement statistics
const SAMPLE_WINDOW: usize = 10_000;

/// Metrics collector for the prediction endpoint
pub struct PredictionMetrics {
    /// Successful predictions
    predictions_served: AtomicU64,
    /// Predictions that failed with an internal error
    predictions_failed: AtomicU64,
    /// Requests rejected because the models were not loaded
    rejected_unavailable: AtomicU64,
    /// Predictions by risk level
    by_level: RwLock<HashMap<RiskLevel, u64>>,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Model agreement per prediction
    agreements: RwLock<Vec<f64>>,
    /// Averaged score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    started_at: DateTime<Utc>,
    start_time: Instant,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            predictions_failed: AtomicU64::new(0),
            rejected_unavailable: AtomicU64::new(0),
            by_level: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            agreements: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, prediction: &StrokePrediction) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_level) = self.by_level.write() {
            *by_level.entry(prediction.stroke_risk).or_insert(0) += 1;
        }

        if let Ok(mut latencies) = self.latencies.write() {
            push_bounded(&mut latencies, latency.as_micros() as u64);
        }

        if let Ok(mut agreements) = self.agreements.write() {
            push_bounded(&mut agreements, prediction.model_agreement());
        }

        let bucket = (prediction.average.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a prediction that failed internally
    pub fn record_failure(&self) {
        self.predictions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request rejected while models are unavailable
    pub fn record_unavailable(&self) {
        self.rejected_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn predictions_served(&self) -> u64 {
        self.predictions_served.load(Ordering::Relaxed)
    }

    /// Get latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(latencies) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if latencies.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = latencies.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Mean agreement between the two models (1.0 = always identical)
    pub fn avg_agreement(&self) -> f64 {
        match self.agreements.read() {
            Ok(agreements) if !agreements.is_empty() => {
                agreements.iter().sum::<f64>() / agreements.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Predictions by risk tier, every tier present
    pub fn by_risk_level(&self) -> BTreeMap<String, u64> {
        let counts = self
            .by_level
            .read()
            .map(|by_level| by_level.clone())
            .unwrap_or_default();

        RiskLevel::ALL
            .iter()
            .map(|level| (level.to_string(), counts.get(level).copied().unwrap_or(0)))
            .collect()
    }

    pub fn score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Point-in-time view of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions_served: self.predictions_served(),
            predictions_failed: self.predictions_failed.load(Ordering::Relaxed),
            rejected_unavailable: self.rejected_unavailable.load(Ordering::Relaxed),
            by_risk_level: self.by_risk_level(),
            latency: self.latency_stats(),
            avg_model_agreement: self.avg_agreement(),
            score_distribution: self.score_distribution(),
        }
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();

        info!(
            served = snapshot.predictions_served,
            failed = snapshot.predictions_failed,
            unavailable = snapshot.rejected_unavailable,
            uptime_secs = snapshot.uptime_secs,
            "Prediction metrics"
        );
        info!(
            mean_us = snapshot.latency.mean_us,
            p50_us = snapshot.latency.p50_us,
            p95_us = snapshot.latency.p95_us,
            p99_us = snapshot.latency.p99_us,
            max_us = snapshot.latency.max_us,
            agreement = format!("{:.1}%", snapshot.avg_model_agreement * 100.0),
            "Prediction latency"
        );
        info!(by_risk_level = ?snapshot.by_risk_level, "Risk tier distribution");
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded<T>(samples: &mut Vec<T>, value: T) {
    samples.push(value);
    if samples.len() > SAMPLE_WINDOW {
        samples.drain(0..SAMPLE_WINDOW / 2);
    }
}

/// Latency statistics in microseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// JSON body of `GET /metrics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub predictions_served: u64,
    pub predictions_failed: u64,
    pub rejected_unavailable: u64,
    pub by_risk_level: BTreeMap<String, u64>,
    pub latency: LatencyStats,
    pub avg_model_agreement: f64,
    /// Averaged scores in buckets of width 0.1
    pub score_distribution: [u64; 10],
}

/// Periodic metrics reporter that logs summaries
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}
