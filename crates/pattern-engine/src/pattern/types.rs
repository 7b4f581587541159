//! Pattern detection type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invariants::{
    DEFAULT_MIN_PATTERN_LENGTH, DEFAULT_PATTERN_THRESHOLD, DEFAULT_REBLOOP_COOLDOWN_SECS,
    DEFAULT_REBLOOP_MIN_AMPLITUDE, DEFAULT_REBLOOP_MIN_CONFIDENCE, DEFAULT_SEARCH_WINDOW_MULTIPLE,
    MAX_PATTERN_LENGTH_CAP,
};
use crate::observation::{METRIC_ENTROPY, METRIC_HEAT, METRIC_SCUP};

/// Kind of pattern reported by the matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// The newest window repeats an earlier window of the same length.
    RepeatingSequence,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RepeatingSequence => write!(f, "repeating_sequence"),
        }
    }
}

/// A repeating window found in a tracked metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern_type: PatternType,
    /// Combined similarity score in `[0, 1]`.
    pub confidence: f64,
    /// Window length in samples.
    pub period: usize,
    /// `max - min` over the newest window, clamped to `[0, 1]`.
    pub amplitude: f64,
    /// `2π · (offset mod period) / period`, in radians.
    pub phase: f64,
    /// First sample of the best-matching earlier window.
    pub start_time: DateTime<Utc>,
    /// Newest sample of the pattern window.
    pub end_time: DateTime<Utc>,
    pub metrics_involved: Vec<String>,
    pub description: String,
    /// Set by the rebloop policy when this match fired a trigger.
    pub rebloop_trigger: bool,
}

/// Weights of the three similarity components. They should sum to 1 so the
/// combined score stays in `[0, 1]` before clamping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    /// Pearson correlation of the z-normalised windows.
    pub correlation: f64,
    /// `1 / (1 + euclidean distance)` of the z-normalised windows.
    pub distance: f64,
    /// Correlation of first differences.
    pub trend: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            correlation: 0.5,
            distance: 0.3,
            trend: 0.2,
        }
    }
}

/// Configuration for the pattern matcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternMatcherConfig {
    /// Metrics searched for repeating windows, in tie-break order.
    pub tracked_metrics: Vec<String>,
    /// Shortest window length considered.
    pub min_pattern_length: usize,
    /// Upper cap on window length (also limited to `max_history / 4`).
    pub max_pattern_length_cap: usize,
    /// A match must score above this to be reported.
    pub pattern_threshold: f64,
    /// The search window covers this many window lengths before the pattern.
    pub search_window_multiple: usize,
    pub weights: SimilarityWeights,
}

impl Default for PatternMatcherConfig {
    fn default() -> Self {
        Self {
            tracked_metrics: vec![
                METRIC_SCUP.to_string(),
                METRIC_ENTROPY.to_string(),
                METRIC_HEAT.to_string(),
            ],
            min_pattern_length: DEFAULT_MIN_PATTERN_LENGTH,
            max_pattern_length_cap: MAX_PATTERN_LENGTH_CAP,
            pattern_threshold: DEFAULT_PATTERN_THRESHOLD,
            search_window_multiple: DEFAULT_SEARCH_WINDOW_MULTIPLE,
            weights: SimilarityWeights::default(),
        }
    }
}

/// Rebloop acceptance rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebloopConfig {
    pub min_confidence: f64,
    pub min_amplitude: f64,
    pub cooldown_seconds: u64,
}

impl Default for RebloopConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_REBLOOP_MIN_CONFIDENCE,
            min_amplitude: DEFAULT_REBLOOP_MIN_AMPLITUDE,
            cooldown_seconds: DEFAULT_REBLOOP_COOLDOWN_SECS,
        }
    }
}
