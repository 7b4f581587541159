//! Rebloop trigger policy -- gates pattern matches into downstream reset signals.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::types::{PatternMatch, RebloopConfig};

/// Decides whether a pattern is strong and fresh enough to fire a rebloop.
///
/// Holds the only cross-call mutable state of the pattern path: the time of
/// the last trigger and a running count.
#[derive(Clone, Debug)]
pub struct RebloopTriggerPolicy {
    config: RebloopConfig,
    last_trigger: Option<DateTime<Utc>>,
    trigger_count: u64,
}

impl RebloopTriggerPolicy {
    pub fn new(config: RebloopConfig) -> Self {
        Self {
            config,
            last_trigger: None,
            trigger_count: 0,
        }
    }

    pub fn config(&self) -> &RebloopConfig {
        &self.config
    }

    /// Evaluate `pattern` at `now`. On acceptance the pattern is marked,
    /// the counter is bumped and the cooldown restarts.
    pub fn is_trigger(&mut self, pattern: &mut PatternMatch, now: DateTime<Utc>) -> bool {
        if !self.qualifies(pattern) || self.in_cooldown(now) {
            return false;
        }
        pattern.rebloop_trigger = true;
        self.trigger_count += 1;
        self.last_trigger = Some(now);
        info!(
            description = %pattern.description,
            confidence = pattern.confidence,
            count = self.trigger_count,
            "rebloop trigger fired"
        );
        true
    }

    /// Whether the pattern is strong enough, ignoring the cooldown.
    pub fn qualifies(&self, pattern: &PatternMatch) -> bool {
        pattern.confidence >= self.config.min_confidence
            && pattern.amplitude >= self.config.min_amplitude
    }

    /// Whether a previous trigger is still inside its cooldown at `now`.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_trigger {
            None => false,
            Some(last) => now.signed_duration_since(last) < self.cooldown(),
        }
    }

    pub fn trigger_count(&self) -> u64 {
        self.trigger_count
    }

    pub fn last_trigger(&self) -> Option<DateTime<Utc>> {
        self.last_trigger
    }

    fn cooldown(&self) -> Duration {
        i64::try_from(self.config.cooldown_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RebloopTriggerPolicy {
    fn default() -> Self {
        Self::new(RebloopConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::types::PatternType;
    use proptest::prelude::*;

    fn pattern(confidence: f64, amplitude: f64) -> PatternMatch {
        let now = Utc::now();
        PatternMatch {
            pattern_type: PatternType::RepeatingSequence,
            confidence,
            period: 4,
            amplitude,
            phase: 0.0,
            start_time: now,
            end_time: now,
            metrics_involved: vec!["scup".into()],
            description: "scup shows 4-step repeating pattern (amplitude: 0.400)".into(),
            rebloop_trigger: false,
        }
    }

    #[test]
    fn strong_pattern_fires_once_per_cooldown() {
        let mut policy = RebloopTriggerPolicy::default();
        let t0 = Utc::now();

        let mut first = pattern(0.95, 0.4);
        assert!(policy.is_trigger(&mut first, t0));
        assert!(first.rebloop_trigger);

        let mut second = pattern(0.95, 0.4);
        assert!(!policy.is_trigger(&mut second, t0 + Duration::seconds(10)));
        assert!(!second.rebloop_trigger);
        assert_eq!(policy.trigger_count(), 1);
        assert_eq!(policy.last_trigger(), Some(t0));
    }

    #[test]
    fn cooldown_expires_at_thirty_seconds() {
        let mut policy = RebloopTriggerPolicy::default();
        let t0 = Utc::now();
        assert!(policy.is_trigger(&mut pattern(0.95, 0.4), t0));
        assert!(policy.in_cooldown(t0 + Duration::seconds(29)));
        assert!(!policy.in_cooldown(t0 + Duration::seconds(30)));
        assert!(policy.is_trigger(&mut pattern(0.95, 0.4), t0 + Duration::seconds(30)));
        assert_eq!(policy.trigger_count(), 2);
    }

    #[test]
    fn weak_or_flat_patterns_are_rejected() {
        let mut policy = RebloopTriggerPolicy::default();
        let now = Utc::now();
        assert!(!policy.is_trigger(&mut pattern(0.89, 0.5), now));
        assert!(!policy.is_trigger(&mut pattern(0.99, 0.05), now));
        assert_eq!(policy.trigger_count(), 0);
        assert!(policy.last_trigger().is_none());
    }

    #[test]
    fn boundary_values_are_accepted() {
        let mut policy = RebloopTriggerPolicy::default();
        assert!(policy.is_trigger(&mut pattern(0.9, 0.1), Utc::now()));
    }

    #[test]
    fn huge_cooldown_saturates() {
        for cooldown_seconds in [100_000_000_000_000_000, u64::MAX] {
            let mut policy = RebloopTriggerPolicy::new(RebloopConfig {
                cooldown_seconds,
                ..RebloopConfig::default()
            });
            let t0 = Utc::now();
            assert!(policy.is_trigger(&mut pattern(0.95, 0.4), t0));
            assert!(!policy.is_trigger(&mut pattern(0.95, 0.4), t0 + Duration::days(365)));
            assert!(policy.in_cooldown(t0 + Duration::days(365 * 1000)));
            assert_eq!(policy.trigger_count(), 1);
        }
    }

    proptest! {
        #[test]
        fn triggers_are_spaced_by_cooldown(gaps in proptest::collection::vec(0i64..60, 1..40)) {
            let mut policy = RebloopTriggerPolicy::default();
            let mut now = Utc::now();
            let mut fired = Vec::new();
            for gap in gaps {
                now += Duration::seconds(gap);
                if policy.is_trigger(&mut pattern(0.95, 0.5), now) {
                    fired.push(now);
                }
            }
            for pair in fired.windows(2) {
                prop_assert!(pair[1] - pair[0] >= Duration::seconds(30));
            }
            prop_assert_eq!(policy.trigger_count(), fired.len() as u64);
        }
    }
}
