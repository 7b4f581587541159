//! # metric-pattern-engine
//!
//! Pattern, anomaly and trend engine for the metric stream of a simulation
//! tick loop.
//!
//! The host feeds one metric / emotion observation per tick. The engine keeps
//! bounded histories with running statistics and answers three questions on
//! demand: is the stream repeating itself ("rebloop"), is the current
//! observation anomalous, and where are the metrics heading next.
//!
//! ## Architecture
//!
//! ```text
//!   host tick (MetricSample, EmotionSample)
//!       │
//!       ▼
//!   ┌──────────────────────┐
//!   │  MetricHistoryStore  │  ← bounded ring buffers + RunningMetricStats
//!   └──────────┬───────────┘
//!              │
//!      ┌───────┼─────────────────┬──────────────────┐
//!      ▼       ▼                 ▼                  ▼
//!  PatternMatcher ──► RebloopTriggerPolicy   AnomalyDetector   StatePredictor
//!      │                (cooldown state)     (recent log)          │
//!      ▼                                          │                ▼
//!  PatternMatch                                Vec<Anomaly>   StatePrediction
//!      └──────────────────────┬───────────────────┴────────────────┘
//!                             ▼
//!                 PatternDetectionEngine (facade)
//! ```
//!
//! ## Invariants
//!
//! - Memory is bounded: every buffer has a fixed capacity.
//! - Queries are total: `None`, an empty list or a low-confidence
//!   prediction instead of an error.
//! - Reported confidences and amplitudes lie in `[0, 1]`.
//! - Rebloop triggers are at least the cooldown apart.
//!
//! ## Quick Start
//!
//! ```rust
//! use metric_pattern_engine::{EmotionSample, MetricSample, PatternDetectionEngine};
//!
//! let mut engine = PatternDetectionEngine::with_defaults();
//! for i in 0..40 {
//!     let scup = if i % 2 == 0 { 0.3 } else { 0.4 };
//!     engine.add_data_point(&MetricSample::new().with_scup(scup), &EmotionSample::new());
//! }
//! let anomalies = engine.find_anomalies(&MetricSample::new().with_scup(0.99));
//! let prediction = engine.predict_next_state(&MetricSample::new().with_scup(0.3));
//! let summary = engine.get_pattern_summary();
//! assert_eq!(summary.data_points, 40);
//! assert!(!anomalies.is_empty());
//! assert!(prediction.confidence > 0.0);
//! ```

#![deny(unsafe_code)]

pub mod anomaly;
pub mod engine;
pub mod error;
pub mod history;
pub mod invariants;
pub mod observation;
pub mod pattern;
pub mod predict;
pub mod stats;

pub use anomaly::{
    Anomaly, AnomalyCheck, AnomalyDetector, AnomalyDetectorConfig, AnomalySeverity, AnomalyType,
    SeverityBands,
};
pub use engine::{DetectionStatus, EngineConfig, PatternDetectionEngine, PatternSummary, TickReport};
pub use error::{PatternError, PatternResult};
pub use history::{
    EmotionPoint, MetricHistoryStore, MetricPoint, RingBuffer, RunningMetricStats,
    TickIntervalPoint,
};
pub use observation::{EmotionSample, MetricSample};
pub use pattern::{
    PatternMatch, PatternMatcher, PatternMatcherConfig, PatternType, RebloopConfig,
    RebloopTriggerPolicy, SimilarityWeights,
};
pub use predict::{
    MetricRoles, PredictedEmotion, PredictionBasis, PredictionWeights, PredictorConfig,
    StatePrediction, StatePredictor,
};
