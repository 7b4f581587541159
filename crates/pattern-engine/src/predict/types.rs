//! Prediction type definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::invariants::{PREDICTION_HORIZON_SECS, PREDICTION_MIN_HISTORY, TREND_WINDOW};
use crate::observation::{METRIC_ENTROPY, METRIC_HEAT, METRIC_SCUP};

/// What a prediction was based on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionBasis {
    /// Too little history; values are passed through.
    InsufficientData,
    /// Linear trend extrapolation only.
    TrendAnalysis,
    /// Trend extrapolation while a repeating pattern is active.
    PatternBased,
}

impl std::fmt::Display for PredictionBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData => write!(f, "insufficient_data"),
            Self::TrendAnalysis => write!(f, "trend_analysis"),
            Self::PatternBased => write!(f, "pattern_based"),
        }
    }
}

/// Coarse emotional label inferred from predicted metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedEmotion {
    Creative,
    Contemplative,
    Overwhelmed,
    Calm,
    Anxious,
    Curious,
    Neutral,
}

impl std::fmt::Display for PredictedEmotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Creative => "creative",
            Self::Contemplative => "contemplative",
            Self::Overwhelmed => "overwhelmed",
            Self::Calm => "calm",
            Self::Anxious => "anxious",
            Self::Curious => "curious",
            Self::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// Short-horizon forecast of the tracked metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatePrediction {
    /// Predicted value per tracked metric, each in `[0, 1]` unless passed through.
    pub predicted: BTreeMap<String, f64>,
    pub predicted_emotion: PredictedEmotion,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub time_horizon_secs: u64,
    pub prediction_basis: PredictionBasis,
    /// Threshold warnings, in rule order.
    pub warnings: Vec<String>,
}

impl StatePrediction {
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.predicted.get(metric).copied()
    }
}

/// Cross-metric adjustment table: `target -> driver -> weight`.
///
/// Each present driver nudges the target by `weight · (driver − 0.5)`, and
/// the sum is scaled by [`PredictorConfig::adjustment_scale`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionWeights(pub BTreeMap<String, BTreeMap<String, f64>>);

impl PredictionWeights {
    pub fn drivers(&self, target: &str) -> impl Iterator<Item = (&str, f64)> {
        self.0
            .get(target)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl Default for PredictionWeights {
    fn default() -> Self {
        let table: [(&str, &[(&str, f64)]); 3] = [
            (
                METRIC_SCUP,
                &[(METRIC_ENTROPY, -0.3), (METRIC_HEAT, -0.2), ("momentum", 0.4)],
            ),
            (
                METRIC_ENTROPY,
                &[(METRIC_SCUP, -0.4), (METRIC_HEAT, 0.3), ("time_factor", 0.1)],
            ),
            (
                METRIC_HEAT,
                &[(METRIC_SCUP, -0.2), (METRIC_ENTROPY, 0.5), ("pressure", 0.3)],
            ),
        ];
        Self(
            table
                .iter()
                .map(|(target, drivers)| {
                    (
                        target.to_string(),
                        drivers.iter().map(|(d, w)| (d.to_string(), *w)).collect(),
                    )
                })
                .collect(),
        )
    }
}

/// Which tracked metric plays each role in the emotion table and warnings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricRoles {
    pub coherence: String,
    pub volatility: String,
    pub heat: String,
}

impl Default for MetricRoles {
    fn default() -> Self {
        Self {
            coherence: METRIC_SCUP.to_string(),
            volatility: METRIC_ENTROPY.to_string(),
            heat: METRIC_HEAT.to_string(),
        }
    }
}

/// Configuration for the state predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// History needed before trends are extrapolated.
    pub min_history: usize,
    /// Newest samples used by the linear fit.
    pub trend_window: usize,
    pub adjustment_scale: f64,
    pub weights: PredictionWeights,
    pub roles: MetricRoles,
    pub time_horizon_secs: u64,
    pub base_confidence: f64,
    pub min_confidence: f64,
    pub max_variance_penalty: f64,
    pub variance_penalty_scale: f64,
    pub pattern_bonus: f64,
    pub max_confidence: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_history: PREDICTION_MIN_HISTORY,
            trend_window: TREND_WINDOW,
            adjustment_scale: 0.1,
            weights: PredictionWeights::default(),
            roles: MetricRoles::default(),
            time_horizon_secs: PREDICTION_HORIZON_SECS,
            base_confidence: 0.8,
            min_confidence: 0.1,
            max_variance_penalty: 0.5,
            variance_penalty_scale: 2.0,
            pattern_bonus: 0.2,
            max_confidence: 0.95,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_match_table() {
        let w = PredictionWeights::default();
        let scup: Vec<_> = w.drivers("scup").collect();
        assert_eq!(scup.len(), 3);
        assert!(scup.contains(&("momentum", 0.4)));
        assert!(w.drivers("heat").any(|(d, v)| d == "pressure" && v == 0.3));
        assert_eq!(w.drivers("tick_rate").count(), 0);
    }

    #[test]
    fn weights_serialize_as_plain_map() {
        let json = serde_json::to_value(PredictionWeights::default()).unwrap();
        assert_eq!(json["entropy"]["scup"], -0.4);
    }

    #[test]
    fn labels_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&PredictionBasis::InsufficientData).unwrap(),
            "\"insufficient_data\""
        );
        assert_eq!(PredictionBasis::PatternBased.to_string(), "pattern_based");
        assert_eq!(PredictedEmotion::Contemplative.to_string(), "contemplative");
        assert_eq!(
            serde_json::to_string(&PredictedEmotion::Overwhelmed).unwrap(),
            "\"overwhelmed\""
        );
    }

    #[test]
    fn predictor_config_from_partial_json() {
        let cfg: PredictorConfig = serde_json::from_str(r#"{"trend_window": 20}"#).unwrap();
        assert_eq!(cfg.trend_window, 20);
        assert_eq!(cfg.min_history, 5);
        assert_eq!(cfg.time_horizon_secs, 10);
        assert_eq!(cfg.roles.coherence, "scup");
    }
}
