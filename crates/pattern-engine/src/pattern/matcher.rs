//! Sliding-window search for repeating sequences in tracked metrics.
//!
//! For each window length `L` the newest `L` samples form the pattern and the
//! preceding `search_window_multiple · L` samples form the search window. Every
//! length-`L` slice of the search window is scored against the pattern; the
//! best score across all metrics and lengths wins.

use std::f64::consts::TAU;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::error::PatternError;
use crate::history::MetricHistoryStore;
use crate::invariants::{InvariantChecker, SCORE_TIE_TOLERANCE};
use crate::stats;

use super::types::{PatternMatch, PatternMatcherConfig, PatternType};

/// Best slice for one (metric, period) pair.
#[derive(Clone, Debug)]
struct WindowScore {
    /// Position inside the search window.
    offset: usize,
    /// Index of the slice start in the full series.
    series_start: usize,
    score: f64,
}

/// Best candidate across the whole search.
#[derive(Clone, Debug)]
struct Candidate<'a> {
    metric: &'a str,
    period: usize,
    window: WindowScore,
}

/// Repeating-window detector over a [`MetricHistoryStore`].
#[derive(Clone, Debug)]
pub struct PatternMatcher {
    config: PatternMatcherConfig,
    max_pattern_length: usize,
}

impl PatternMatcher {
    /// `max_history` bounds the longest window at `max_history / 4`.
    pub fn new(config: PatternMatcherConfig, max_history: usize) -> Self {
        let max_pattern_length = config.max_pattern_length_cap.min(max_history / 4);
        Self {
            config,
            max_pattern_length,
        }
    }

    pub fn config(&self) -> &PatternMatcherConfig {
        &self.config
    }

    pub fn max_pattern_length(&self) -> usize {
        self.max_pattern_length
    }

    /// Search the history for the strongest repeating window.
    ///
    /// Returns `None` when history is shorter than `2 · min_pattern_length`
    /// or when no window scores above the threshold. The returned match never
    /// has `rebloop_trigger` set; that is the trigger policy's decision.
    pub fn detect(&self, history: &MetricHistoryStore) -> Option<PatternMatch> {
        let min_len = self.config.min_pattern_length.max(2);
        let n = history.len();
        if n < min_len * 2 {
            return None;
        }
        let upper = self.max_pattern_length.min(n / 2);

        let series: Vec<(&str, Vec<(DateTime<Utc>, f64)>)> = self
            .config
            .tracked_metrics
            .iter()
            .map(|m| (m.as_str(), history.timestamped_series(m)))
            .collect();
        let values: Vec<Vec<f64>> = series
            .iter()
            .map(|(_, s)| s.iter().map(|(_, v)| *v).collect())
            .collect();

        let mut best: Option<Candidate<'_>> = None;
        for period in min_len..=upper {
            for ((metric, _), samples) in series.iter().zip(&values) {
                let Some(window) = self.best_window(samples, period) else {
                    continue;
                };
                let improves = best
                    .as_ref()
                    .map_or(true, |b| window.score > b.window.score + SCORE_TIE_TOLERANCE);
                if improves {
                    best = Some(Candidate {
                        metric: *metric,
                        period,
                        window,
                    });
                }
            }
        }

        let best = best?;
        trace!(
            metric = best.metric,
            period = best.period,
            score = best.window.score,
            "best repeating window"
        );
        if best.window.score <= self.config.pattern_threshold {
            return None;
        }

        let (_, samples) = series.iter().find(|(m, _)| *m == best.metric)?;
        let pattern: Vec<f64> = samples[samples.len() - best.period..]
            .iter()
            .map(|(_, v)| *v)
            .collect();
        let amplitude = InvariantChecker::clamp_unit(
            pattern.iter().copied().fold(f64::NEG_INFINITY, f64::max)
                - pattern.iter().copied().fold(f64::INFINITY, f64::min),
        );
        let phase = TAU * (best.window.offset % best.period) as f64 / best.period as f64;
        let start_time = samples[best.window.series_start].0;
        let end_time = samples[samples.len() - 1].0;
        let confidence = InvariantChecker::clamp_unit(best.window.score);

        debug!(
            metric = best.metric,
            period = best.period,
            confidence,
            amplitude,
            "repeating pattern detected"
        );

        Some(PatternMatch {
            pattern_type: PatternType::RepeatingSequence,
            confidence,
            period: best.period,
            amplitude,
            phase,
            start_time,
            end_time,
            metrics_involved: vec![best.metric.to_string()],
            description: format!(
                "{} shows {}-step repeating pattern (amplitude: {:.3})",
                best.metric, best.period, amplitude
            ),
            rebloop_trigger: false,
        })
    }

    /// Combined similarity of two equal-length windows, in `[0, 1]`.
    pub fn similarity(&self, pattern: &[f64], candidate: &[f64]) -> f64 {
        if pattern.is_empty() || pattern.len() != candidate.len() {
            return 0.0;
        }
        let w = &self.config.weights;
        let zp = stats::z_normalize(pattern);
        let zc = stats::z_normalize(candidate);

        let correlation = agreement(&zp, &zc);
        let distance = stats::euclidean_distance(&zp, &zc).unwrap_or(f64::INFINITY);
        let trend = agreement(
            &stats::first_differences(pattern),
            &stats::first_differences(candidate),
        );

        let score = w.correlation * correlation.max(0.0)
            + w.distance * (1.0 / (1.0 + distance))
            + w.trend * trend.max(0.0);
        InvariantChecker::clamp_unit(score)
    }

    /// Best-scoring slice of the search window for one period.
    fn best_window(&self, samples: &[f64], period: usize) -> Option<WindowScore> {
        let n = samples.len();
        if period == 0 || n < period * 2 {
            return None;
        }
        let pattern = &samples[n - period..];
        let search_len = (period * self.config.search_window_multiple.max(1)).min(n - period);
        let search_start = n - period - search_len;
        let search = &samples[search_start..n - period];

        let mut best: Option<WindowScore> = None;
        for (offset, candidate) in search.windows(period).enumerate() {
            let score = self.similarity(pattern, candidate);
            if best
                .as_ref()
                .map_or(true, |b| score > b.score + SCORE_TIE_TOLERANCE)
            {
                best = Some(WindowScore {
                    offset,
                    series_start: search_start + offset,
                    score,
                });
            }
        }
        best
    }
}

/// Correlation used as an agreement score.
///
/// Single-element vectors agree trivially; zero-variance inputs have no
/// defined correlation and count as no agreement.
fn agreement(a: &[f64], b: &[f64]) -> f64 {
    match stats::pearson(a, b) {
        Ok(r) => r,
        Err(PatternError::InsufficientSamples { .. }) => 1.0,
        Err(err) => {
            trace!(error = %err, "correlation collapsed to zero");
            0.0
        }
    }
}
