//! Anomaly type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invariants::{
    DEFAULT_ANOMALY_THRESHOLD, DEFAULT_TIMING_THRESHOLD, MAX_RECENT_ANOMALIES,
    MIN_ANOMALY_SAMPLES, MIN_TIMING_SAMPLES, SCORE_TIE_TOLERANCE, TIMING_WINDOW,
};

// ── Anomaly Type ────────────────────────────────────────────────────────

/// Direction or kind of a detected anomaly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// Value above the running mean.
    Spike,
    /// Value at or below the running mean.
    Drop,
    /// Tick interval off the recent rhythm.
    IrregularTiming,
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spike => write!(f, "spike"),
            Self::Drop => write!(f, "drop"),
            Self::IrregularTiming => write!(f, "irregular_timing"),
        }
    }
}

// ── Anomaly Severity ────────────────────────────────────────────────────

/// Severity of a detected anomaly, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Z-score lower edges of the metric severity bands.
///
/// A z-score that reaches an edge (within floating-point tolerance) belongs
/// to that band, so `mean 0.5, std 0.1, value 0.85` is `high`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityBands {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl SeverityBands {
    pub fn classify(&self, z_score: f64) -> AnomalySeverity {
        let reaches = |edge: f64| z_score + SCORE_TIE_TOLERANCE >= edge;
        if reaches(self.critical) {
            AnomalySeverity::Critical
        } else if reaches(self.high) {
            AnomalySeverity::High
        } else if reaches(self.medium) {
            AnomalySeverity::Medium
        } else {
            AnomalySeverity::Low
        }
    }
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            medium: 3.0,
            high: 3.5,
            critical: 4.0,
        }
    }
}

// ── Anomaly ─────────────────────────────────────────────────────────────

/// A metric value or tick interval that departs from recent behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    /// Metric name, or `tick_interval` for rhythm anomalies.
    pub metric: String,
    /// Running mean the value was compared against.
    pub expected_value: f64,
    pub actual_value: f64,
    /// Absolute z-score.
    pub deviation_score: f64,
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub description: String,
}

// ── Configuration ───────────────────────────────────────────────────────

/// Configuration for the anomaly detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyDetectorConfig {
    /// Metric z-score above which an anomaly is emitted.
    pub anomaly_threshold: f64,
    /// Samples a metric needs before it is checked.
    pub min_samples: usize,
    pub severity: SeverityBands,
    /// Tick-interval z-score above which the rhythm is irregular.
    pub timing_threshold: f64,
    /// Interval z-score above which a timing anomaly is `high`.
    pub timing_high_threshold: f64,
    /// Newest intervals considered by the rhythm check.
    pub timing_window: usize,
    pub timing_min_samples: usize,
    /// Bound on the recent-anomaly log.
    pub max_recent_anomalies: usize,
}

impl Default for AnomalyDetectorConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            min_samples: MIN_ANOMALY_SAMPLES,
            severity: SeverityBands::default(),
            timing_threshold: DEFAULT_TIMING_THRESHOLD,
            timing_high_threshold: 3.0,
            timing_window: TIMING_WINDOW,
            timing_min_samples: MIN_TIMING_SAMPLES,
            max_recent_anomalies: MAX_RECENT_ANOMALIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(AnomalySeverity::Low < AnomalySeverity::Medium);
        assert!(AnomalySeverity::High < AnomalySeverity::Critical);
    }

    #[test]
    fn bands_are_inclusive_at_edges() {
        let bands = SeverityBands::default();
        assert_eq!(bands.classify(2.6), AnomalySeverity::Low);
        assert_eq!(bands.classify(3.0), AnomalySeverity::Medium);
        assert_eq!(bands.classify(3.4999999999), AnomalySeverity::High);
        assert_eq!(bands.classify(3.7), AnomalySeverity::High);
        assert_eq!(bands.classify(4.0), AnomalySeverity::Critical);
        assert_eq!(bands.classify(12.0), AnomalySeverity::Critical);
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnomalyType::IrregularTiming).unwrap(),
            "\"irregular_timing\""
        );
        assert_eq!(serde_json::to_string(&AnomalySeverity::High).unwrap(), "\"high\"");
        assert_eq!(AnomalyType::Spike.to_string(), "spike");
        assert_eq!(AnomalySeverity::Critical.to_string(), "critical");
    }

    #[test]
    fn config_defaults() {
        let cfg = AnomalyDetectorConfig::default();
        assert!((cfg.anomaly_threshold - 2.5).abs() < f64::EPSILON);
        assert!((cfg.timing_threshold - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.min_samples, 10);
        assert_eq!(cfg.timing_window, 10);
        assert_eq!(cfg.max_recent_anomalies, 100);
    }
}
