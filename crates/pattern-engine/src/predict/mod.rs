//! Short-horizon state prediction.
//!
//! Each tracked metric is extrapolated one step with a least-squares slope
//! over its recent window, nudged by cross-metric drivers from the query,
//! and clamped to `[0, 1]`. The predicted values then drive a coarse emotion
//! label and a set of threshold warnings.

pub mod predictor;
pub mod types;

pub use predictor::StatePredictor;
pub use types::{
    MetricRoles, PredictedEmotion, PredictionBasis, PredictionWeights, PredictorConfig,
    StatePrediction,
};
