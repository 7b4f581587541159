//! The pattern detection engine facade.
//!
//! One engine instance owns the history, the trigger cooldown and the
//! recent-anomaly log. Every time-dependent operation has an `_at` variant
//! that takes the clock reading explicitly; the plain variants use
//! `Utc::now()`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::anomaly::{Anomaly, AnomalyDetector, AnomalyDetectorConfig};
use crate::error::{PatternError, PatternResult};
use crate::history::MetricHistoryStore;
use crate::invariants::{
    InvariantChecker, ANOMALY_SUMMARY_WINDOW_SECS, DEFAULT_MAX_HISTORY, READINESS_THRESHOLD,
    STATS_WINDOW,
};
use crate::observation::{EmotionSample, MetricSample};
use crate::pattern::{
    PatternMatch, PatternMatcher, PatternMatcherConfig, RebloopConfig, RebloopTriggerPolicy,
};
use crate::predict::{PredictorConfig, StatePrediction, StatePredictor};

// ── Configuration ───────────────────────────────────────────────────────

/// Engine configuration. Fixed for the lifetime of an engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each history buffer.
    pub max_history: usize,
    /// Samples retained per metric for running mean / std.
    pub stats_window: usize,
    pub pattern: PatternMatcherConfig,
    pub trigger: RebloopConfig,
    pub anomaly: AnomalyDetectorConfig,
    pub predictor: PredictorConfig,
    /// Points needed before detection reports `active`.
    pub readiness_threshold: usize,
    /// Look-back used to count recent anomalies in the summary.
    pub anomaly_summary_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            stats_window: STATS_WINDOW,
            pattern: PatternMatcherConfig::default(),
            trigger: RebloopConfig::default(),
            anomaly: AnomalyDetectorConfig::default(),
            predictor: PredictorConfig::default(),
            readiness_threshold: READINESS_THRESHOLD,
            anomaly_summary_window_secs: ANOMALY_SUMMARY_WINDOW_SECS,
        }
    }
}

impl EngineConfig {
    /// Defaults with the two construction parameters hosts usually set.
    pub fn new(max_history: usize, min_pattern_length: usize) -> Self {
        let mut config = Self {
            max_history,
            ..Self::default()
        };
        config.pattern.min_pattern_length = min_pattern_length;
        config
    }

    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(raw: &str) -> PatternResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot honour.
    pub fn validate(&self) -> PatternResult<()> {
        InvariantChecker::require_nonzero("max_history", self.max_history)?;
        InvariantChecker::require_nonzero("stats_window", self.stats_window)?;

        let pattern = &self.pattern;
        if pattern.tracked_metrics.is_empty() {
            return Err(PatternError::InvalidConfig(
                "pattern.tracked_metrics must not be empty".into(),
            ));
        }
        if pattern.min_pattern_length < 2 {
            return Err(PatternError::InvalidConfig(format!(
                "pattern.min_pattern_length must be >= 2, got {}",
                pattern.min_pattern_length
            )));
        }
        InvariantChecker::require_nonzero(
            "pattern.max_pattern_length_cap",
            pattern.max_pattern_length_cap,
        )?;
        InvariantChecker::require_nonzero(
            "pattern.search_window_multiple",
            pattern.search_window_multiple,
        )?;
        InvariantChecker::require_unit_interval("pattern.pattern_threshold", pattern.pattern_threshold)?;
        InvariantChecker::require_unit_interval("pattern.weights.correlation", pattern.weights.correlation)?;
        InvariantChecker::require_unit_interval("pattern.weights.distance", pattern.weights.distance)?;
        InvariantChecker::require_unit_interval("pattern.weights.trend", pattern.weights.trend)?;

        InvariantChecker::require_unit_interval("trigger.min_confidence", self.trigger.min_confidence)?;
        InvariantChecker::require_unit_interval("trigger.min_amplitude", self.trigger.min_amplitude)?;

        let anomaly = &self.anomaly;
        InvariantChecker::require_positive("anomaly.anomaly_threshold", anomaly.anomaly_threshold)?;
        InvariantChecker::require_positive("anomaly.timing_threshold", anomaly.timing_threshold)?;
        InvariantChecker::require_nonzero("anomaly.timing_window", anomaly.timing_window)?;
        InvariantChecker::require_nonzero("anomaly.max_recent_anomalies", anomaly.max_recent_anomalies)?;

        let predictor = &self.predictor;
        InvariantChecker::require_nonzero("predictor.trend_window", predictor.trend_window)?;
        InvariantChecker::require_unit_interval("predictor.base_confidence", predictor.base_confidence)?;
        InvariantChecker::require_unit_interval("predictor.min_confidence", predictor.min_confidence)?;
        InvariantChecker::require_unit_interval("predictor.max_confidence", predictor.max_confidence)?;
        Ok(())
    }
}

// ── Reports ─────────────────────────────────────────────────────────────

/// Whether enough history exists for detection to be meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Active,
    InsufficientData,
}

/// Fixed-shape summary of the engine state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    /// Patterns currently present in history (0 or 1).
    pub active_patterns: usize,
    pub rebloop_count: u64,
    pub last_rebloop: Option<DateTime<Utc>>,
    /// Logged anomalies inside the summary window.
    pub recent_anomalies: usize,
    pub data_points: usize,
    pub pattern_detection_status: DetectionStatus,
}

/// Everything derived from one tick by [`PatternDetectionEngine::observe_tick`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub pattern: Option<PatternMatch>,
    pub anomalies: Vec<Anomaly>,
    pub prediction: StatePrediction,
    pub summary: PatternSummary,
}

// ── Engine ──────────────────────────────────────────────────────────────

/// Single entry point combining history, pattern matching, rebloop
/// triggering, anomaly detection and prediction.
///
/// All queries are total: they return a sentinel (`None`, an empty list, a
/// low-confidence prediction) rather than an error.
#[derive(Debug)]
pub struct PatternDetectionEngine {
    config: EngineConfig,
    history: MetricHistoryStore,
    matcher: PatternMatcher,
    trigger: RebloopTriggerPolicy,
    detector: AnomalyDetector,
    predictor: StatePredictor,
}

impl PatternDetectionEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: EngineConfig) -> PatternResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn with_defaults() -> Self {
        Self::build(EngineConfig::default())
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            history: MetricHistoryStore::with_stats_window(config.max_history, config.stats_window),
            matcher: PatternMatcher::new(config.pattern.clone(), config.max_history),
            trigger: RebloopTriggerPolicy::new(config.trigger.clone()),
            detector: AnomalyDetector::new(config.anomaly.clone()),
            predictor: StatePredictor::new(
                config.predictor.clone(),
                config.pattern.tracked_metrics.clone(),
            ),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &MetricHistoryStore {
        &self.history
    }

    pub fn trigger_policy(&self) -> &RebloopTriggerPolicy {
        &self.trigger
    }

    pub fn anomaly_detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    pub fn add_data_point(&mut self, metrics: &MetricSample, emotion: &EmotionSample) {
        self.add_data_point_at(metrics, emotion, Utc::now());
    }

    pub fn add_data_point_at(
        &mut self,
        metrics: &MetricSample,
        emotion: &EmotionSample,
        now: DateTime<Utc>,
    ) {
        self.history.add(metrics, emotion, now);
    }

    /// Ingest loosely-typed JSON observations, skipping malformed fields.
    pub fn add_json_data_point_at(&mut self, metrics: &Value, emotion: &Value, now: DateTime<Utc>) {
        let metrics = MetricSample::from_json_lossy(metrics);
        let emotion = EmotionSample::from_json_lossy(emotion);
        self.add_data_point_at(&metrics, &emotion, now);
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Look for a repeating pattern and let the trigger policy judge it.
    pub fn detect_reloop(&mut self) -> Option<PatternMatch> {
        self.detect_reloop_at(Utc::now())
    }

    pub fn detect_reloop_at(&mut self, now: DateTime<Utc>) -> Option<PatternMatch> {
        let mut pattern = self.matcher.detect(&self.history)?;
        self.trigger.is_trigger(&mut pattern, now);
        Some(pattern)
    }

    /// The pattern currently present in history, without touching the
    /// trigger policy.
    pub fn active_pattern(&self) -> Option<PatternMatch> {
        self.matcher.detect(&self.history)
    }

    pub fn find_anomalies(&mut self, metrics: &MetricSample) -> Vec<Anomaly> {
        self.find_anomalies_at(metrics, Utc::now())
    }

    pub fn find_anomalies_at(&mut self, metrics: &MetricSample, now: DateTime<Utc>) -> Vec<Anomaly> {
        self.detector.detect(metrics, &self.history, now)
    }

    pub fn predict_next_state(&self, metrics: &MetricSample) -> StatePrediction {
        let pattern_active = self.active_pattern().is_some();
        self.predictor.predict(metrics, &self.history, pattern_active)
    }

    pub fn get_pattern_summary(&self) -> PatternSummary {
        self.get_pattern_summary_at(Utc::now())
    }

    pub fn get_pattern_summary_at(&self, now: DateTime<Utc>) -> PatternSummary {
        // A window reaching past the representable range covers the whole log.
        let recent_anomalies = i64::try_from(self.config.anomaly_summary_window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|window| now.checked_sub_signed(window))
            .map_or_else(
                || self.detector.recent_len(),
                |since| self.detector.recent_count_since(since),
            );
        let data_points = self.history.len();
        PatternSummary {
            active_patterns: usize::from(self.active_pattern().is_some()),
            rebloop_count: self.trigger.trigger_count(),
            last_rebloop: self.trigger.last_trigger(),
            recent_anomalies,
            data_points,
            pattern_detection_status: if data_points >= self.config.readiness_threshold {
                DetectionStatus::Active
            } else {
                DetectionStatus::InsufficientData
            },
        }
    }

    /// Ingest one tick and run every query against it.
    pub fn observe_tick(&mut self, metrics: &MetricSample, emotion: &EmotionSample) -> TickReport {
        self.observe_tick_at(metrics, emotion, Utc::now())
    }

    pub fn observe_tick_at(
        &mut self,
        metrics: &MetricSample,
        emotion: &EmotionSample,
        now: DateTime<Utc>,
    ) -> TickReport {
        self.add_data_point_at(metrics, emotion, now);
        let pattern = self.detect_reloop_at(now);
        let anomalies = self.find_anomalies_at(metrics, now);
        let prediction = self.predict_next_state(metrics);
        let summary = self.get_pattern_summary_at(now);
        debug!(
            pattern = pattern.is_some(),
            anomalies = anomalies.len(),
            emotion = %prediction.predicted_emotion,
            "tick observed"
        );
        TickReport {
            pattern,
            anomalies,
            prediction,
            summary,
        }
    }
}

impl Default for PatternDetectionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
