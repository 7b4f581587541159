//! Anomaly checks and the detector that runs them.
//!
//! Provides:
//! - `AnomalyCheck` trait for pluggable checks
//! - `MetricDeviationCheck`: z-score of each queried metric against its running stats
//! - `TickRhythmCheck`: z-score of the newest tick interval against the recent rhythm
//! - `AnomalyDetector` that runs the checks in order and keeps a bounded log

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::history::{MetricHistoryStore, RingBuffer};
use crate::observation::MetricSample;
use crate::stats;

use super::types::{Anomaly, AnomalyDetectorConfig, AnomalySeverity, AnomalyType, SeverityBands};

/// Metric name reported by rhythm anomalies.
pub const TICK_INTERVAL_METRIC: &str = "tick_interval";

// ── Trait ────────────────────────────────────────────────────────────────

/// Pluggable anomaly check.
///
/// A check inspects the queried sample and the stored history and returns
/// zero or more anomalies. Checks never mutate history.
pub trait AnomalyCheck: Send + Sync {
    fn check(
        &self,
        sample: &MetricSample,
        history: &MetricHistoryStore,
        now: DateTime<Utc>,
    ) -> Vec<Anomaly>;

    /// Name of this check (for logging).
    fn name(&self) -> &str;
}

// ── 1. Metric deviation (z-score) ───────────────────────────────────────

/// Flags queried metric values that sit more than `threshold` running
/// standard deviations away from the running mean.
///
/// Only metrics present in the query and with at least `min_samples`
/// recorded values are checked.
pub struct MetricDeviationCheck {
    pub threshold: f64,
    pub min_samples: usize,
    pub bands: SeverityBands,
}

impl MetricDeviationCheck {
    pub fn new(threshold: f64, min_samples: usize, bands: SeverityBands) -> Self {
        Self {
            threshold,
            min_samples,
            bands,
        }
    }
}

impl AnomalyCheck for MetricDeviationCheck {
    fn check(
        &self,
        sample: &MetricSample,
        history: &MetricHistoryStore,
        now: DateTime<Utc>,
    ) -> Vec<Anomaly> {
        let mut found = Vec::new();
        for (metric, value) in sample.numeric_fields() {
            let Some(stats) = history.stats(&metric) else {
                continue;
            };
            if stats.sample_count() < self.min_samples {
                continue;
            }
            let z_score = stats.z_score(value);
            if z_score <= self.threshold {
                continue;
            }
            let anomaly_type = if value > stats.mean() {
                AnomalyType::Spike
            } else {
                AnomalyType::Drop
            };
            found.push(Anomaly {
                timestamp: now,
                description: format!(
                    "{metric} {anomaly_type}: {value:.3} (expected: {:.3}, deviation: {z_score:.2}σ)",
                    stats.mean()
                ),
                metric,
                expected_value: stats.mean(),
                actual_value: value,
                deviation_score: z_score,
                anomaly_type,
                severity: self.bands.classify(z_score),
            });
        }
        found
    }

    fn name(&self) -> &str {
        "metric_deviation"
    }
}

// ── 2. Tick rhythm ──────────────────────────────────────────────────────

/// Flags the newest tick interval when it departs from the mean of the
/// last `window` intervals by more than `threshold` standard deviations.
pub struct TickRhythmCheck {
    pub threshold: f64,
    pub high_threshold: f64,
    pub window: usize,
    pub min_samples: usize,
}

impl TickRhythmCheck {
    pub fn new(threshold: f64, high_threshold: f64, window: usize, min_samples: usize) -> Self {
        Self {
            threshold,
            high_threshold,
            window,
            min_samples,
        }
    }
}

impl AnomalyCheck for TickRhythmCheck {
    fn check(
        &self,
        _sample: &MetricSample,
        history: &MetricHistoryStore,
        now: DateTime<Utc>,
    ) -> Vec<Anomaly> {
        if history.tick_history().len() < self.min_samples {
            return vec![];
        }
        let intervals = history.recent_intervals(self.window);
        let (Some(&current), Ok(mean), Ok(std)) = (
            intervals.last(),
            stats::mean(&intervals),
            stats::std_dev(&intervals),
        ) else {
            return vec![];
        };
        if std <= 0.0 {
            return vec![];
        }

        let z_score = (current - mean).abs() / std;
        if z_score <= self.threshold {
            return vec![];
        }
        let severity = if z_score > self.high_threshold {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        };
        vec![Anomaly {
            timestamp: now,
            metric: TICK_INTERVAL_METRIC.to_string(),
            expected_value: mean,
            actual_value: current,
            deviation_score: z_score,
            anomaly_type: AnomalyType::IrregularTiming,
            severity,
            description: format!(
                "Irregular tick timing: {current:.3}s (expected: {mean:.3}s, deviation: {z_score:.2}σ)"
            ),
        }]
    }

    fn name(&self) -> &str {
        "tick_rhythm"
    }
}

// ── Detector ────────────────────────────────────────────────────────────

/// Runs every check against a query and records what it finds.
///
/// Results are ordered by check, so with the default checks all metric
/// anomalies come before the (at most one) timing anomaly.
pub struct AnomalyDetector {
    checks: Vec<Box<dyn AnomalyCheck>>,
    config: AnomalyDetectorConfig,
    recent: RingBuffer<Anomaly>,
}

impl AnomalyDetector {
    /// Create a detector with the metric-deviation and tick-rhythm checks.
    pub fn new(config: AnomalyDetectorConfig) -> Self {
        let checks: Vec<Box<dyn AnomalyCheck>> = vec![
            Box::new(MetricDeviationCheck::new(
                config.anomaly_threshold,
                config.min_samples,
                config.severity.clone(),
            )),
            Box::new(TickRhythmCheck::new(
                config.timing_threshold,
                config.timing_high_threshold,
                config.timing_window,
                config.timing_min_samples,
            )),
        ];
        Self::with_checks(config, checks)
    }

    /// Create with custom checks.
    pub fn with_checks(config: AnomalyDetectorConfig, checks: Vec<Box<dyn AnomalyCheck>>) -> Self {
        let recent = RingBuffer::new(config.max_recent_anomalies);
        Self {
            checks,
            config,
            recent,
        }
    }

    pub fn config(&self) -> &AnomalyDetectorConfig {
        &self.config
    }

    /// Check `sample` against `history` at `now`.
    ///
    /// History is only read. The returned anomalies are also appended to the
    /// recent log, so repeated queries grow the log but return identical lists.
    pub fn detect(
        &mut self,
        sample: &MetricSample,
        history: &MetricHistoryStore,
        now: DateTime<Utc>,
    ) -> Vec<Anomaly> {
        let mut found = Vec::new();
        for check in &self.checks {
            let hits = check.check(sample, history, now);
            if !hits.is_empty() {
                debug!(check = check.name(), count = hits.len(), "anomaly check fired");
            }
            found.extend(hits);
        }
        for anomaly in &found {
            warn!(
                metric = %anomaly.metric,
                severity = %anomaly.severity,
                "anomaly detected: {}",
                anomaly.description
            );
            self.recent.push(anomaly.clone());
        }
        found
    }

    /// The recent-anomaly log, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Anomaly> {
        self.recent.iter()
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Logged anomalies with `timestamp >= since`.
    pub fn recent_count_since(&self, since: DateTime<Utc>) -> usize {
        self.recent.iter().filter(|a| a.timestamp >= since).count()
    }
}

impl std::fmt::Debug for AnomalyDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyDetector")
            .field(
                "checks",
                &self.checks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .field("recent", &self.recent.len())
            .finish()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyDetectorConfig::default())
    }
}
