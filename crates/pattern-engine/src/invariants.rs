//! Engine invariants -- default capacities, thresholds and runtime checks.
//!
//! - History buffers never grow past `max_history` entries.
//! - A running standard deviation is never exactly zero (floored at [`STD_FLOOR`]).
//! - Externally reported confidences and amplitudes lie in `[0, 1]`.
//! - A rebloop trigger cannot fire twice within the cooldown.

use crate::error::{PatternError, PatternResult};

/// Default capacity of each history ring buffer.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Default shortest window considered by the pattern matcher.
pub const DEFAULT_MIN_PATTERN_LENGTH: usize = 3;

/// Hard cap on pattern window length (further limited to `max_history / 4`).
pub const MAX_PATTERN_LENGTH_CAP: usize = 50;

/// Samples retained per metric for running mean / std.
pub const STATS_WINDOW: usize = 100;

/// Lower bound applied to every running standard deviation.
pub const STD_FLOOR: f64 = 0.01;

/// Standard deviation reported while a metric has a single sample.
pub const SINGLE_SAMPLE_STD: f64 = 0.1;

/// Tick interval assumed for the very first ingestion (seconds).
pub const FIRST_TICK_INTERVAL_SECS: f64 = 1.0;

/// Minimum combined similarity for a pattern to be reported.
pub const DEFAULT_PATTERN_THRESHOLD: f64 = 0.85;

/// The search window spans this many pattern lengths before the pattern.
pub const DEFAULT_SEARCH_WINDOW_MULTIPLE: usize = 3;

/// A later candidate must beat the current best by more than this to replace it.
pub const SCORE_TIE_TOLERANCE: f64 = 1e-9;

/// Rebloop acceptance: minimum pattern confidence.
pub const DEFAULT_REBLOOP_MIN_CONFIDENCE: f64 = 0.9;

/// Rebloop acceptance: minimum pattern amplitude.
pub const DEFAULT_REBLOOP_MIN_AMPLITUDE: f64 = 0.1;

/// Minimum seconds between two rebloop triggers.
pub const DEFAULT_REBLOOP_COOLDOWN_SECS: u64 = 30;

/// Z-score above which a metric value is anomalous.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.5;

/// Z-score above which a tick interval is irregular.
pub const DEFAULT_TIMING_THRESHOLD: f64 = 2.0;

/// Samples a metric needs before it is checked for anomalies.
pub const MIN_ANOMALY_SAMPLES: usize = 10;

/// Tick intervals considered by the rhythm check.
pub const TIMING_WINDOW: usize = 10;

/// Tick intervals needed before the rhythm check runs.
pub const MIN_TIMING_SAMPLES: usize = 5;

/// Bound on the recent-anomaly log.
pub const MAX_RECENT_ANOMALIES: usize = 100;

/// Window used to count recent anomalies in the summary (seconds).
pub const ANOMALY_SUMMARY_WINDOW_SECS: u64 = 300;

/// Ingested points needed before detection reports `active`.
pub const READINESS_THRESHOLD: usize = 10;

/// History needed before the predictor extrapolates trends.
pub const PREDICTION_MIN_HISTORY: usize = 5;

/// Samples used by the linear trend fit.
pub const TREND_WINDOW: usize = 10;

/// Prediction horizon (seconds).
pub const PREDICTION_HORIZON_SECS: u64 = 10;

/// Runtime checks used by configuration validation.
pub struct InvariantChecker;

impl InvariantChecker {
    /// Reject a zero capacity or count.
    pub fn require_nonzero(name: &str, value: usize) -> PatternResult<()> {
        if value == 0 {
            return Err(PatternError::InvalidConfig(format!("{name} must be > 0")));
        }
        Ok(())
    }

    /// Reject a value outside `[0, 1]` (or non-finite).
    pub fn require_unit_interval(name: &str, value: f64) -> PatternResult<()> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(PatternError::InvalidConfig(format!(
                "{name} must lie in [0, 1], got {value}"
            )));
        }
        Ok(())
    }

    /// Reject a non-positive or non-finite threshold.
    pub fn require_positive(name: &str, value: f64) -> PatternResult<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PatternError::InvalidConfig(format!(
                "{name} must be a positive number, got {value}"
            )));
        }
        Ok(())
    }

    /// Clamp a reported score into `[0, 1]`, mapping NaN to 0.
    pub fn clamp_unit(value: f64) -> f64 {
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_check() {
        assert!(InvariantChecker::require_nonzero("max_history", 1).is_ok());
        let err = InvariantChecker::require_nonzero("max_history", 0).unwrap_err();
        assert!(err.to_string().contains("max_history"));
    }

    #[test]
    fn unit_interval_check() {
        assert!(InvariantChecker::require_unit_interval("t", 0.0).is_ok());
        assert!(InvariantChecker::require_unit_interval("t", 1.0).is_ok());
        assert!(InvariantChecker::require_unit_interval("t", 1.01).is_err());
        assert!(InvariantChecker::require_unit_interval("t", f64::NAN).is_err());
    }

    #[test]
    fn positive_check() {
        assert!(InvariantChecker::require_positive("z", 2.5).is_ok());
        assert!(InvariantChecker::require_positive("z", 0.0).is_err());
        assert!(InvariantChecker::require_positive("z", f64::INFINITY).is_err());
    }

    #[test]
    fn clamp_unit_handles_edges() {
        assert_eq!(InvariantChecker::clamp_unit(-0.2), 0.0);
        assert_eq!(InvariantChecker::clamp_unit(1.7), 1.0);
        assert_eq!(InvariantChecker::clamp_unit(f64::NAN), 0.0);
        assert_eq!(InvariantChecker::clamp_unit(0.42), 0.42);
    }
}
