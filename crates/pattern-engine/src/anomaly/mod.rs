//! Statistical anomaly detection on queried metrics and on the ingestion rhythm.
//!
//! ```text
//!   query sample + MetricHistoryStore
//!       │
//!       ├──► MetricDeviationCheck (z-score vs running stats, ≥10 samples)
//!       └──► TickRhythmCheck (z-score of newest interval, last 10 intervals)
//!             │
//!             ▼
//!       Vec<Anomaly> ──► recent-anomaly log (bounded)
//! ```

pub mod detector;
pub mod types;

pub use detector::{
    AnomalyCheck, AnomalyDetector, MetricDeviationCheck, TickRhythmCheck, TICK_INTERVAL_METRIC,
};
pub use types::{Anomaly, AnomalyDetectorConfig, AnomalySeverity, AnomalyType, SeverityBands};
