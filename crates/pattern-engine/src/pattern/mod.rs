//! Repeating-pattern ("rebloop") detection.
//!
//! ```text
//!   MetricHistoryStore
//!       │
//!       ▼
//!   PatternMatcher  ── per metric × window length:
//!       │              0.5·corr + 0.3·1/(1+dist) + 0.2·trend corr
//!       ▼
//!   PatternMatch (score > threshold)
//!       │
//!       ▼
//!   RebloopTriggerPolicy (confidence, amplitude, cooldown) ──► rebloop_trigger
//! ```

pub mod matcher;
pub mod trigger;
pub mod types;

pub use matcher::PatternMatcher;
pub use trigger::RebloopTriggerPolicy;
pub use types::{PatternMatch, PatternMatcherConfig, PatternType, RebloopConfig, SimilarityWeights};
