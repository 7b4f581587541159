//! Host observations -- the per-tick metric and emotion records fed into the engine.
//!
//! Every field is optional. Absent metrics resolve to neutral defaults when a
//! point is stored; absent fields are simply not checked by anomaly queries.
//! Hosts that hold loosely-typed JSON maps can use the lossy parsers, which
//! skip malformed fields one at a time instead of rejecting the observation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{PatternError, PatternResult};

/// Coherence-like metric.
pub const METRIC_SCUP: &str = "scup";
/// Volatility-like metric.
pub const METRIC_ENTROPY: &str = "entropy";
/// Heat-like metric.
pub const METRIC_HEAT: &str = "heat";
/// Host tick rate.
pub const METRIC_TICK_RATE: &str = "tick_rate";
/// Host tick counter.
pub const METRIC_TICK_COUNT: &str = "tick_count";

/// Default emotion / mood label.
pub const NEUTRAL_LABEL: &str = "neutral";

/// Neutral default for a documented metric, `None` for anything else.
pub fn default_metric_value(metric: &str) -> Option<f64> {
    match metric {
        METRIC_SCUP | METRIC_ENTROPY => Some(0.5),
        METRIC_HEAT => Some(0.3),
        METRIC_TICK_RATE => Some(1.0),
        METRIC_TICK_COUNT => Some(0.0),
        _ => None,
    }
}

// ── Metric sample ───────────────────────────────────────────────────────

/// One tick's worth of metric readings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scup: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_count: Option<u64>,
    /// Any additional numeric readings, keyed by name.
    #[serde(flatten)]
    pub extra: BTreeMap<String, f64>,
}

impl MetricSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scup(mut self, value: f64) -> Self {
        self.scup = Some(value);
        self
    }

    pub fn with_entropy(mut self, value: f64) -> Self {
        self.entropy = Some(value);
        self
    }

    pub fn with_heat(mut self, value: f64) -> Self {
        self.heat = Some(value);
        self
    }

    pub fn with_tick_rate(mut self, value: f64) -> Self {
        self.tick_rate = Some(value);
        self
    }

    pub fn with_tick_count(mut self, value: u64) -> Self {
        self.tick_count = Some(value);
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(&name.into(), value);
        self
    }

    /// Set a reading by name. Documented metrics go to their fields,
    /// everything else lands in `extra`.
    pub fn set(&mut self, name: &str, value: f64) {
        match name {
            METRIC_SCUP => self.scup = Some(value),
            METRIC_ENTROPY => self.entropy = Some(value),
            METRIC_HEAT => self.heat = Some(value),
            METRIC_TICK_RATE => self.tick_rate = Some(value),
            METRIC_TICK_COUNT => {
                if is_tick_counter(value) {
                    self.tick_count = Some(value as u64);
                }
            }
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }

    /// Reading for `name`, if present and finite.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            METRIC_SCUP => self.scup,
            METRIC_ENTROPY => self.entropy,
            METRIC_HEAT => self.heat,
            METRIC_TICK_RATE => self.tick_rate,
            METRIC_TICK_COUNT => self.tick_count.map(|c| c as f64),
            other => self.extra.get(other).copied(),
        };
        value.filter(|v| v.is_finite())
    }

    /// All present, finite readings: documented metrics first, then extras by name.
    pub fn numeric_fields(&self) -> Vec<(String, f64)> {
        let documented = [
            METRIC_SCUP,
            METRIC_ENTROPY,
            METRIC_HEAT,
            METRIC_TICK_RATE,
            METRIC_TICK_COUNT,
        ];
        let mut fields: Vec<(String, f64)> = documented
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.to_string(), v)))
            .collect();
        fields.extend(
            self.extra
                .iter()
                .filter(|(_, v)| v.is_finite())
                .map(|(k, v)| (k.clone(), *v)),
        );
        fields
    }

    /// Build a sample from a JSON object, skipping any field that is not a
    /// finite number. Never fails; a non-object yields an empty sample.
    pub fn from_json_lossy(value: &Value) -> Self {
        let mut sample = Self::default();
        let Some(map) = value.as_object() else {
            debug!("metric observation is not a JSON object, using defaults");
            return sample;
        };
        for (key, raw) in map {
            match numeric_field(key, raw) {
                Ok(v) => sample.set(key, v),
                Err(err) => debug!(field = %key, error = %err, "skipping metric field"),
            }
        }
        sample
    }

    /// Strict variant of [`MetricSample::from_json_lossy`]: the first malformed
    /// field is reported as an error.
    pub fn try_from_json(value: &Value) -> PatternResult<Self> {
        let map = value.as_object().ok_or_else(|| PatternError::MalformedField {
            field: "<root>".into(),
            detail: "expected a JSON object".into(),
        })?;
        let mut sample = Self::default();
        for (key, raw) in map {
            sample.set(key, numeric_field(key, raw)?);
        }
        Ok(sample)
    }
}

fn numeric_field(key: &str, raw: &Value) -> PatternResult<f64> {
    let value = raw
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PatternError::MalformedField {
            field: key.to_string(),
            detail: format!("expected a finite number, got {raw}"),
        })?;
    if key == METRIC_TICK_COUNT && !is_tick_counter(value) {
        return Err(PatternError::MalformedField {
            field: key.to_string(),
            detail: format!("tick counter must be a non-negative integer ({value})"),
        });
    }
    Ok(value)
}

fn is_tick_counter(value: f64) -> bool {
    value.is_finite() && value >= 0.0 && value.fract() == 0.0
}

// ── Emotion sample ──────────────────────────────────────────────────────

/// One tick's coarse emotional state as reported by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionSample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

impl EmotionSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = Some(intensity);
        self
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = Some(momentum);
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Build from a JSON object; wrongly-typed fields are skipped.
    pub fn from_json_lossy(value: &Value) -> Self {
        let mut sample = Self::default();
        let Some(map) = value.as_object() else {
            debug!("emotion observation is not a JSON object, using defaults");
            return sample;
        };
        for (key, raw) in map {
            match key.as_str() {
                "emotion" | "mood" => match raw.as_str() {
                    Some(label) if key == "emotion" => sample.emotion = Some(label.to_string()),
                    Some(label) => sample.mood = Some(label.to_string()),
                    None => debug!(field = %key, "skipping non-string emotion field"),
                },
                "intensity" | "momentum" => match raw.as_f64().filter(|v| v.is_finite()) {
                    Some(v) if key == "intensity" => sample.intensity = Some(v),
                    Some(v) => sample.momentum = Some(v),
                    None => debug!(field = %key, "skipping non-numeric emotion field"),
                },
                _ => debug!(field = %key, "ignoring unknown emotion field"),
            }
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_for_documented_metrics() {
        assert_eq!(default_metric_value(METRIC_SCUP), Some(0.5));
        assert_eq!(default_metric_value(METRIC_HEAT), Some(0.3));
        assert_eq!(default_metric_value(METRIC_TICK_RATE), Some(1.0));
        assert_eq!(default_metric_value(METRIC_TICK_COUNT), Some(0.0));
        assert_eq!(default_metric_value("pressure"), None);
    }

    #[test]
    fn builder_and_lookup() {
        let sample = MetricSample::new()
            .with_scup(0.7)
            .with_tick_count(12)
            .with_extra("pressure", 0.4);
        assert_eq!(sample.get(METRIC_SCUP), Some(0.7));
        assert_eq!(sample.get(METRIC_TICK_COUNT), Some(12.0));
        assert_eq!(sample.get("pressure"), Some(0.4));
        assert_eq!(sample.get(METRIC_ENTROPY), None);
    }

    #[test]
    fn numeric_fields_skip_non_finite() {
        let sample = MetricSample::new()
            .with_scup(f64::NAN)
            .with_heat(0.9)
            .with_extra("momentum", f64::INFINITY)
            .with_extra("pressure", 0.2);
        let fields = sample.numeric_fields();
        assert_eq!(
            fields,
            vec![("heat".to_string(), 0.9), ("pressure".to_string(), 0.2)]
        );
    }

    #[test]
    fn lossy_parse_skips_malformed_fields() {
        let raw = json!({
            "scup": 0.61,
            "entropy": "high",
            "heat": null,
            "tick_count": 42,
            "pressure": 0.3,
            "label": {"nested": true}
        });
        let sample = MetricSample::from_json_lossy(&raw);
        assert_eq!(sample.scup, Some(0.61));
        assert_eq!(sample.entropy, None);
        assert_eq!(sample.heat, None);
        assert_eq!(sample.tick_count, Some(42));
        assert_eq!(sample.extra.get("pressure"), Some(&0.3));
        assert!(!sample.extra.contains_key("label"));
    }

    #[test]
    fn lossy_parse_of_non_object_is_empty() {
        assert_eq!(MetricSample::from_json_lossy(&json!([1, 2])), MetricSample::default());
    }

    #[test]
    fn fractional_tick_count_is_malformed() {
        let sample = MetricSample::from_json_lossy(&json!({"tick_count": 3.7, "scup": 0.4}));
        assert_eq!(sample.tick_count, None);
        assert_eq!(sample.scup, Some(0.4));

        let err = MetricSample::try_from_json(&json!({"tick_count": 3.7})).unwrap_err();
        assert!(matches!(err, PatternError::MalformedField { .. }));

        let mut sample = MetricSample::new();
        sample.set("tick_count", 2.5);
        assert_eq!(sample.tick_count, None);
        sample.set("tick_count", 7.0);
        assert_eq!(sample.tick_count, Some(7));
    }

    #[test]
    fn strict_parse_reports_first_bad_field() {
        let err = MetricSample::try_from_json(&json!({"entropy": "high"})).unwrap_err();
        assert!(matches!(err, PatternError::MalformedField { ref field, .. } if field == "entropy"));

        let err = MetricSample::try_from_json(&json!({"tick_count": -3})).unwrap_err();
        assert!(err.to_string().contains("negative"));

        let ok = MetricSample::try_from_json(&json!({"scup": 0.2, "heat": 0.4})).unwrap();
        assert_eq!(ok.heat, Some(0.4));
    }

    #[test]
    fn serde_roundtrip_keeps_extras_flat() {
        let sample = MetricSample::new().with_entropy(0.4).with_extra("pressure", 0.8);
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json, json!({"entropy": 0.4, "pressure": 0.8}));
        let back: MetricSample = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn emotion_lossy_parse() {
        let raw = json!({
            "emotion": "curious",
            "intensity": "very",
            "momentum": 0.2,
            "mood": 7
        });
        let sample = EmotionSample::from_json_lossy(&raw);
        assert_eq!(sample.emotion.as_deref(), Some("curious"));
        assert_eq!(sample.intensity, None);
        assert_eq!(sample.momentum, Some(0.2));
        assert_eq!(sample.mood, None);
    }
}
