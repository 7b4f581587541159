//! Stored history points and per-metric running statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invariants::{SINGLE_SAMPLE_STD, STD_FLOOR};
use crate::observation::{
    default_metric_value, EmotionSample, MetricSample, METRIC_ENTROPY, METRIC_HEAT, METRIC_SCUP,
    METRIC_TICK_COUNT, METRIC_TICK_RATE, NEUTRAL_LABEL,
};
use crate::stats;

use super::ring::RingBuffer;

/// A stored metric observation with defaults resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub scup: f64,
    pub entropy: f64,
    pub heat: f64,
    pub tick_rate: f64,
    pub tick_count: u64,
    /// Extra numeric readings carried through from the sample.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
}

impl MetricPoint {
    pub fn from_sample(sample: &MetricSample, timestamp: DateTime<Utc>) -> Self {
        let resolve = |name: &str| {
            sample
                .get(name)
                .or_else(|| default_metric_value(name))
                .unwrap_or_default()
        };
        Self {
            timestamp,
            scup: resolve(METRIC_SCUP),
            entropy: resolve(METRIC_ENTROPY),
            heat: resolve(METRIC_HEAT),
            tick_rate: resolve(METRIC_TICK_RATE),
            tick_count: sample.tick_count.unwrap_or_default(),
            extra: sample
                .extra
                .iter()
                .filter(|(_, v)| v.is_finite())
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }

    /// Value of a named metric in this point.
    pub fn value(&self, metric: &str) -> Option<f64> {
        match metric {
            METRIC_SCUP => Some(self.scup),
            METRIC_ENTROPY => Some(self.entropy),
            METRIC_HEAT => Some(self.heat),
            METRIC_TICK_RATE => Some(self.tick_rate),
            METRIC_TICK_COUNT => Some(self.tick_count as f64),
            other => self.extra.get(other).copied(),
        }
    }

    /// Every numeric field, documented metrics first.
    pub fn numeric_fields(&self) -> Vec<(&str, f64)> {
        let mut fields = vec![
            (METRIC_SCUP, self.scup),
            (METRIC_ENTROPY, self.entropy),
            (METRIC_HEAT, self.heat),
            (METRIC_TICK_RATE, self.tick_rate),
            (METRIC_TICK_COUNT, self.tick_count as f64),
        ];
        fields.extend(self.extra.iter().map(|(k, v)| (k.as_str(), *v)));
        fields
    }
}

/// A stored emotional-state observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionPoint {
    pub timestamp: DateTime<Utc>,
    pub emotion: String,
    pub intensity: f64,
    pub momentum: f64,
    pub mood: String,
}

impl EmotionPoint {
    pub fn from_sample(sample: &EmotionSample, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            emotion: sample
                .emotion
                .clone()
                .unwrap_or_else(|| NEUTRAL_LABEL.to_string()),
            intensity: sample.intensity.filter(|v| v.is_finite()).unwrap_or(0.5),
            momentum: sample.momentum.filter(|v| v.is_finite()).unwrap_or(0.0),
            mood: sample
                .mood
                .clone()
                .unwrap_or_else(|| NEUTRAL_LABEL.to_string()),
        }
    }
}

/// Wall-clock spacing between two ingestions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickIntervalPoint {
    pub timestamp: DateTime<Utc>,
    /// Seconds since the previous ingestion.
    pub interval_secs: f64,
    pub tick_count: u64,
}

/// Running mean / standard deviation over the most recent samples of one metric.
///
/// The reported standard deviation is never below [`STD_FLOOR`].
#[derive(Clone, Debug)]
pub struct RunningMetricStats {
    samples: RingBuffer<f64>,
    mean: f64,
    std_dev: f64,
}

impl RunningMetricStats {
    pub fn new(window: usize) -> Self {
        Self {
            samples: RingBuffer::new(window),
            mean: 0.0,
            std_dev: SINGLE_SAMPLE_STD,
        }
    }

    /// Seed statistics from a sequence of samples.
    pub fn from_samples(window: usize, samples: impl IntoIterator<Item = f64>) -> Self {
        let mut stats = Self::new(window);
        for value in samples {
            stats.observe(value);
        }
        stats
    }

    /// Record a sample and recompute mean / std over the retained window.
    pub fn observe(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.samples.push(value);
        let values: Vec<f64> = self.samples.iter().copied().collect();
        self.mean = stats::mean(&values).unwrap_or(value);
        let raw_std = if values.len() > 1 {
            stats::std_dev(&values).unwrap_or(SINGLE_SAMPLE_STD)
        } else {
            SINGLE_SAMPLE_STD
        };
        self.std_dev = raw_std.max(STD_FLOOR);
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Absolute deviation of `value` from the mean, in standard deviations.
    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean).abs() / self.std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn metric_point_resolves_defaults() {
        let point = MetricPoint::from_sample(&MetricSample::new().with_scup(0.9), Utc::now());
        assert_eq!(point.scup, 0.9);
        assert_eq!(point.entropy, 0.5);
        assert_eq!(point.heat, 0.3);
        assert_eq!(point.tick_rate, 1.0);
        assert_eq!(point.tick_count, 0);
    }

    #[test]
    fn metric_point_drops_non_finite_values() {
        let sample = MetricSample::new()
            .with_heat(f64::NAN)
            .with_extra("pressure", f64::NEG_INFINITY);
        let point = MetricPoint::from_sample(&sample, Utc::now());
        assert_eq!(point.heat, 0.3);
        assert!(point.extra.is_empty());
    }

    #[test]
    fn metric_point_lookup_includes_extras() {
        let sample = MetricSample::new().with_extra("pressure", 0.7).with_tick_count(4);
        let point = MetricPoint::from_sample(&sample, Utc::now());
        assert_eq!(point.value("pressure"), Some(0.7));
        assert_eq!(point.value(METRIC_TICK_COUNT), Some(4.0));
        assert_eq!(point.value("missing"), None);
        assert_eq!(point.numeric_fields().len(), 6);
    }

    #[test]
    fn emotion_point_defaults() {
        let point = EmotionPoint::from_sample(&EmotionSample::new(), Utc::now());
        assert_eq!(point.emotion, "neutral");
        assert_eq!(point.mood, "neutral");
        assert_eq!(point.intensity, 0.5);
        assert_eq!(point.momentum, 0.0);
    }

    #[test]
    fn single_sample_reports_default_std() {
        let stats = RunningMetricStats::from_samples(100, [0.7]);
        assert_eq!(stats.mean(), 0.7);
        assert_eq!(stats.std_dev(), SINGLE_SAMPLE_STD);
    }

    #[test]
    fn constant_samples_hit_the_floor() {
        let stats = RunningMetricStats::from_samples(100, std::iter::repeat(0.5).take(20));
        assert_eq!(stats.std_dev(), STD_FLOOR);
        assert!((stats.z_score(0.52) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn window_is_bounded() {
        let stats = RunningMetricStats::from_samples(100, (0..250).map(|i| i as f64));
        assert_eq!(stats.sample_count(), 100);
        // Only 150..250 remain.
        assert!((stats.mean() - 199.5).abs() < 1e-9);
    }

    #[test]
    fn alternating_samples_give_known_moments() {
        let stats =
            RunningMetricStats::from_samples(100, (0..20).map(|i| if i % 2 == 0 { 0.4 } else { 0.6 }));
        assert!((stats.mean() - 0.5).abs() < 1e-9);
        assert!((stats.std_dev() - 0.1).abs() < 1e-9);
        assert!((stats.z_score(0.85) - 3.5).abs() < 1e-6);
        assert!((stats.z_score(0.52) - 0.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn std_is_never_zero(values in proptest::collection::vec(-10.0f64..10.0, 1..200)) {
            let stats = RunningMetricStats::from_samples(100, values);
            prop_assert!(stats.std_dev() >= STD_FLOOR);
            prop_assert!(stats.sample_count() <= 100);
        }
    }
}
