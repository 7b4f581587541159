//! Metric history store -- the single ingestion point for host observations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::invariants::{FIRST_TICK_INTERVAL_SECS, STATS_WINDOW};
use crate::observation::{EmotionSample, MetricSample};

use super::ring::RingBuffer;
use super::types::{EmotionPoint, MetricPoint, RunningMetricStats, TickIntervalPoint};

/// Bounded metric, emotion and tick-interval histories plus running
/// per-metric statistics.
///
/// All three histories share one capacity and are appended together, so they
/// always have the same length.
#[derive(Clone, Debug)]
pub struct MetricHistoryStore {
    metrics: RingBuffer<MetricPoint>,
    emotions: RingBuffer<EmotionPoint>,
    ticks: RingBuffer<TickIntervalPoint>,
    stats: HashMap<String, RunningMetricStats>,
    stats_window: usize,
}

impl MetricHistoryStore {
    pub fn new(max_history: usize) -> Self {
        Self::with_stats_window(max_history, STATS_WINDOW)
    }

    pub fn with_stats_window(max_history: usize, stats_window: usize) -> Self {
        Self {
            metrics: RingBuffer::new(max_history),
            emotions: RingBuffer::new(max_history),
            ticks: RingBuffer::new(max_history),
            stats: HashMap::new(),
            stats_window: stats_window.max(1),
        }
    }

    /// Ingest one observation taken at `now`.
    ///
    /// The tick interval is measured against the previous ingestion; the
    /// first call records [`FIRST_TICK_INTERVAL_SECS`].
    pub fn add(&mut self, metrics: &MetricSample, emotion: &EmotionSample, now: DateTime<Utc>) {
        let point = MetricPoint::from_sample(metrics, now);
        let interval_secs = self
            .ticks
            .last()
            .map(|prev| Self::interval_secs(prev.timestamp, now))
            .unwrap_or(FIRST_TICK_INTERVAL_SECS);

        let window = self.stats_window;
        for (name, value) in point.numeric_fields() {
            self.stats
                .entry(name.to_string())
                .or_insert_with(|| RunningMetricStats::new(window))
                .observe(value);
        }

        let emotion_point = EmotionPoint::from_sample(emotion, now);
        debug!(
            scup = point.scup,
            entropy = point.entropy,
            heat = point.heat,
            emotion = %emotion_point.emotion,
            interval_secs,
            "ingested data point"
        );

        self.ticks.push(TickIntervalPoint {
            timestamp: now,
            interval_secs,
            tick_count: point.tick_count,
        });
        self.emotions.push(emotion_point);
        self.metrics.push(point);
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.metrics.capacity()
    }

    pub fn metric_history(&self) -> &RingBuffer<MetricPoint> {
        &self.metrics
    }

    pub fn emotion_history(&self) -> &RingBuffer<EmotionPoint> {
        &self.emotions
    }

    pub fn tick_history(&self) -> &RingBuffer<TickIntervalPoint> {
        &self.ticks
    }

    pub fn latest(&self) -> Option<&MetricPoint> {
        self.metrics.last()
    }

    /// Running statistics for a metric, if it has been seen.
    pub fn stats(&self, metric: &str) -> Option<&RunningMetricStats> {
        self.stats.get(metric)
    }

    /// `(timestamp, value)` pairs for a metric, oldest first. Points that
    /// lack the metric are skipped.
    pub fn timestamped_series(&self, metric: &str) -> Vec<(DateTime<Utc>, f64)> {
        self.metrics
            .iter()
            .filter_map(|p| p.value(metric).map(|v| (p.timestamp, v)))
            .collect()
    }

    /// The newest `n` values of a metric, oldest first.
    pub fn recent_series(&self, metric: &str, n: usize) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .metrics
            .iter()
            .filter_map(|p| p.value(metric))
            .collect();
        let skip = values.len().saturating_sub(n);
        values.drain(..skip);
        values
    }

    /// The newest `n` tick intervals, oldest first.
    pub fn recent_intervals(&self, n: usize) -> Vec<f64> {
        self.ticks.iter_recent(n).map(|t| t.interval_secs).collect()
    }

    fn interval_secs(previous: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(previous);
        match elapsed.num_microseconds() {
            Some(us) if us >= 0 => us as f64 / 1_000_000.0,
            Some(_) => {
                debug!("clock moved backwards between ingestions, recording zero interval");
                0.0
            }
            None => elapsed.num_seconds().max(0) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn first_interval_is_neutral() {
        let mut store = MetricHistoryStore::new(10);
        store.add(&MetricSample::new(), &EmotionSample::new(), base_time());
        assert_eq!(store.recent_intervals(1), vec![FIRST_TICK_INTERVAL_SECS]);
    }

    #[test]
    fn intervals_follow_timestamps() {
        let mut store = MetricHistoryStore::new(10);
        let t0 = base_time();
        store.add(&MetricSample::new(), &EmotionSample::new(), t0);
        store.add(
            &MetricSample::new(),
            &EmotionSample::new(),
            t0 + Duration::milliseconds(250),
        );
        store.add(
            &MetricSample::new(),
            &EmotionSample::new(),
            t0 + Duration::seconds(2),
        );
        assert_eq!(store.recent_intervals(10), vec![1.0, 0.25, 1.75]);
    }

    #[test]
    fn backwards_clock_records_zero() {
        let mut store = MetricHistoryStore::new(10);
        let t0 = base_time();
        store.add(&MetricSample::new(), &EmotionSample::new(), t0);
        store.add(
            &MetricSample::new(),
            &EmotionSample::new(),
            t0 - Duration::seconds(5),
        );
        assert_eq!(store.recent_intervals(1), vec![0.0]);
    }

    #[test]
    fn stats_cover_defaults_and_extras() {
        let mut store = MetricHistoryStore::new(10);
        let sample = MetricSample::new().with_scup(0.8).with_extra("pressure", 0.4);
        store.add(&sample, &EmotionSample::new(), base_time());

        assert_eq!(store.stats("scup").unwrap().mean(), 0.8);
        assert_eq!(store.stats("heat").unwrap().mean(), 0.3);
        assert_eq!(store.stats("pressure").unwrap().sample_count(), 1);
        assert!(store.stats("momentum").is_none());
    }

    #[test]
    fn series_helpers() {
        let mut store = MetricHistoryStore::new(10);
        let t0 = base_time();
        for i in 0..6 {
            let mut sample = MetricSample::new().with_scup(i as f64 / 10.0);
            if i % 2 == 0 {
                sample = sample.with_extra("pressure", i as f64);
            }
            store.add(&sample, &EmotionSample::new(), t0 + Duration::seconds(i));
        }
        assert_eq!(store.recent_series("scup", 3), vec![0.3, 0.4, 0.5]);
        assert_eq!(store.recent_series("pressure", 10), vec![0.0, 2.0, 4.0]);
        let ts = store.timestamped_series("pressure");
        assert_eq!(ts[1].0, t0 + Duration::seconds(2));
        assert_eq!(store.latest().unwrap().scup, 0.5);
    }

    proptest! {
        #[test]
        fn histories_stay_bounded_and_aligned(cap in 1usize..40, n in 0usize..120) {
            let mut store = MetricHistoryStore::new(cap);
            let t0 = base_time();
            for i in 0..n {
                store.add(
                    &MetricSample::new().with_tick_count(i as u64),
                    &EmotionSample::new(),
                    t0 + Duration::seconds(i as i64),
                );
            }
            prop_assert_eq!(store.len(), n.min(cap));
            prop_assert_eq!(store.emotion_history().len(), store.len());
            prop_assert_eq!(store.tick_history().len(), store.len());
            if n > 0 {
                prop_assert_eq!(store.latest().map(|p| p.tick_count), Some(n as u64 - 1));
            }
        }
    }
}
