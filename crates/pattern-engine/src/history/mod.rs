//! Bounded observation history.
//!
//! ```text
//!   host tick ──► MetricHistoryStore::add
//!                    ├──► RingBuffer<MetricPoint>
//!                    ├──► RingBuffer<EmotionPoint>
//!                    ├──► RingBuffer<TickIntervalPoint>
//!                    └──► RunningMetricStats (per metric, last 100 samples)
//! ```

pub mod ring;
pub mod store;
pub mod types;

pub use ring::RingBuffer;
pub use store::MetricHistoryStore;
pub use types::{EmotionPoint, MetricPoint, RunningMetricStats, TickIntervalPoint};
