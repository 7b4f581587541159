//! Linear-trend state predictor with cross-metric adjustment.

use std::collections::BTreeMap;

use tracing::debug;

use crate::history::MetricHistoryStore;
use crate::invariants::InvariantChecker;
use crate::observation::{default_metric_value, MetricSample};
use crate::stats;

use super::types::{PredictedEmotion, PredictionBasis, PredictorConfig, StatePrediction};

/// Neutral value for a metric with no reading and no documented default.
const FALLBACK_VALUE: f64 = 0.5;

/// Extrapolates the tracked metrics one step ahead.
#[derive(Clone, Debug)]
pub struct StatePredictor {
    config: PredictorConfig,
    tracked_metrics: Vec<String>,
}

impl StatePredictor {
    pub fn new(config: PredictorConfig, tracked_metrics: Vec<String>) -> Self {
        Self {
            config,
            tracked_metrics,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Predict the next state from `current` and the stored history.
    ///
    /// `pattern_active` selects the pattern-based basis and the confidence
    /// bonus. Never fails: short history yields a passthrough prediction.
    pub fn predict(
        &self,
        current: &MetricSample,
        history: &MetricHistoryStore,
        pattern_active: bool,
    ) -> StatePrediction {
        if history.len() < self.config.min_history {
            return self.passthrough(current);
        }

        let predicted: BTreeMap<String, f64> = self
            .tracked_metrics
            .iter()
            .map(|metric| (metric.clone(), self.predict_metric(metric, current, history)))
            .collect();

        let mut confidence = self.trend_confidence(history);
        if pattern_active {
            confidence = (confidence + self.config.pattern_bonus).min(self.config.max_confidence);
        }

        StatePrediction {
            predicted_emotion: self.infer_emotion(&predicted),
            warnings: self.warnings(&predicted),
            predicted,
            confidence: InvariantChecker::clamp_unit(confidence),
            time_horizon_secs: self.config.time_horizon_secs,
            prediction_basis: if pattern_active {
                PredictionBasis::PatternBased
            } else {
                PredictionBasis::TrendAnalysis
            },
        }
    }

    fn passthrough(&self, current: &MetricSample) -> StatePrediction {
        let predicted = self
            .tracked_metrics
            .iter()
            .map(|metric| (metric.clone(), current_or_default(current, metric)))
            .collect();
        StatePrediction {
            predicted,
            predicted_emotion: PredictedEmotion::Neutral,
            confidence: self.config.min_confidence,
            time_horizon_secs: self.config.time_horizon_secs,
            prediction_basis: PredictionBasis::InsufficientData,
            warnings: Vec::new(),
        }
    }

    /// `last + slope` over the trend window, nudged by present drivers, clamped.
    fn predict_metric(&self, metric: &str, current: &MetricSample, history: &MetricHistoryStore) -> f64 {
        let values = history.recent_series(metric, self.config.trend_window);
        let Some(&last) = values.last() else {
            return current_or_default(current, metric);
        };
        let slope = stats::linear_slope(&values).unwrap_or_else(|err| {
            debug!(metric, error = %err, "trend fit degenerate, holding last value");
            0.0
        });

        let adjustment: f64 = self
            .config
            .weights
            .drivers(metric)
            .filter_map(|(driver, weight)| current.get(driver).map(|v| weight * (v - 0.5)))
            .sum();

        InvariantChecker::clamp_unit(last + slope + adjustment * self.config.adjustment_scale)
    }

    /// Priority-ordered threshold table over the role metrics.
    fn infer_emotion(&self, predicted: &BTreeMap<String, f64>) -> PredictedEmotion {
        let (coherence, volatility, heat) = self.roles(predicted);
        if volatility > 0.7 && coherence > 0.6 {
            PredictedEmotion::Creative
        } else if volatility < 0.3 && coherence > 0.7 {
            PredictedEmotion::Contemplative
        } else if heat > 0.8 && volatility > 0.7 {
            PredictedEmotion::Overwhelmed
        } else if coherence > 0.8 && volatility < 0.4 && heat < 0.3 {
            PredictedEmotion::Calm
        } else if heat > 0.6 {
            PredictedEmotion::Anxious
        } else {
            PredictedEmotion::Curious
        }
    }

    fn warnings(&self, predicted: &BTreeMap<String, f64>) -> Vec<String> {
        let (coherence, volatility, heat) = self.roles(predicted);
        let rules = [
            (
                heat > 0.8,
                "High heat predicted - thermal management may be needed",
            ),
            (
                volatility > 0.9,
                "Extremely high entropy predicted - system may become chaotic",
            ),
            (
                coherence < 0.2,
                "Very low SCUP predicted - coherence breakdown possible",
            ),
            (
                heat > 0.7 && volatility > 0.8,
                "Combined high heat and entropy - overwhelm state likely",
            ),
        ];
        rules
            .into_iter()
            .filter(|(fires, _)| *fires)
            .map(|(_, text)| text.to_string())
            .collect()
    }

    /// `max(min, base − min(cap, scale · Σ top-2 first-difference variances))`.
    fn trend_confidence(&self, history: &MetricHistoryStore) -> f64 {
        let cfg = &self.config;
        let mut variances: Vec<f64> = self
            .tracked_metrics
            .iter()
            .filter_map(|metric| {
                let values = history.recent_series(metric, cfg.trend_window);
                stats::variance(&stats::first_differences(&values)).ok()
            })
            .collect();
        variances.sort_by(|a, b| b.total_cmp(a));
        let volatility: f64 = variances.iter().take(2).sum();

        let penalty = (cfg.variance_penalty_scale * volatility).min(cfg.max_variance_penalty);
        (cfg.base_confidence - penalty).max(cfg.min_confidence)
    }

    fn roles(&self, predicted: &BTreeMap<String, f64>) -> (f64, f64, f64) {
        let lookup = |metric: &str| {
            predicted
                .get(metric)
                .copied()
                .or_else(|| default_metric_value(metric))
                .unwrap_or(FALLBACK_VALUE)
        };
        let roles = &self.config.roles;
        (
            lookup(&roles.coherence),
            lookup(&roles.volatility),
            lookup(&roles.heat),
        )
    }
}

fn current_or_default(current: &MetricSample, metric: &str) -> f64 {
    current
        .get(metric)
        .or_else(|| default_metric_value(metric))
        .unwrap_or(FALLBACK_VALUE)
}
