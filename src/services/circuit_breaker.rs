//! Circuit breaker pattern for failure detection and recovery.
//!
//! One breaker per remediation target. Repeated failures inside a sliding
//! window open the circuit; an open circuit fails tasks fast without
//! touching the remediator until the cooldown elapses and a half-open
//! probe is allowed through.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::models::BreakerConfig;
use crate::domain::ports::Clock;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, dispatches flow normally.
    Closed,
    /// Circuit is open, dispatches are blocked.
    Open,
    /// Circuit is testing whether the target has recovered.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Breaker state for a single target. Time values are monotonic readings.
#[derive(Debug, Clone)]
struct TargetBreaker {
    state: CircuitState,
    failures: Vec<Duration>,
    opened_at: Option<Duration>,
    open_count: u32,
}

impl TargetBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: Vec::new(),
            opened_at: None,
            open_count: 0,
        }
    }

    fn record_failure(&mut self, now: Duration, window: Duration, threshold: u32) {
        match self.state {
            CircuitState::HalfOpen => {
                // One failed probe reopens immediately.
                self.open(now);
            }
            CircuitState::Closed => {
                self.failures.push(now);
                self.prune(now, window);
                if self.failures.len() as u32 >= threshold {
                    self.open(now);
                }
            }
            CircuitState::Open => {
                self.failures.push(now);
                self.prune(now, window);
            }
        }
    }

    fn record_success(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.close();
        } else if self.state == CircuitState::Closed {
            self.failures.clear();
        }
    }

    /// Whether a dispatch may proceed; drives open -> half-open on elapsed
    /// cooldown.
    fn allows(&mut self, now: Duration, cooldown: Duration) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match self.opened_at {
                Some(opened_at) if now.saturating_sub(opened_at) >= cooldown => {
                    self.state = CircuitState::HalfOpen;
                    true
                }
                _ => false,
            },
        }
    }

    fn open(&mut self, now: Duration) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.failures.clear();
    }

    fn prune(&mut self, now: Duration, window: Duration) {
        self.failures
            .retain(|failed_at| now.saturating_sub(*failed_at) <= window);
    }
}

/// Statistics for one target's breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub target: String,
    pub state: &'static str,
    pub recent_failures: usize,
    pub open_count: u32,
}

/// Registry of per-target circuit breakers.
pub struct CircuitBreakerRegistry {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: Mutex<HashMap<String, TargetBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.config.cooldown_seconds)
    }

    /// Whether the target's circuit currently blocks dispatches. A blocked
    /// answer is stable until the cooldown elapses; the first call after
    /// that flips the breaker to half-open and lets one probe through.
    pub fn is_open(&self, target: &str) -> bool {
        let now = self.clock.monotonic();
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        match breakers.get_mut(target) {
            Some(breaker) => !breaker.allows(now, self.cooldown()),
            None => false,
        }
    }

    pub fn record_failure(&self, target: &str) {
        let now = self.clock.monotonic();
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        let breaker = breakers
            .entry(target.to_string())
            .or_insert_with(TargetBreaker::new);
        breaker.record_failure(now, self.window(), self.config.failure_threshold);
    }

    pub fn record_success(&self, target: &str) {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        if let Some(breaker) = breakers.get_mut(target) {
            breaker.record_success();
        }
    }

    pub fn state(&self, target: &str) -> Option<CircuitState> {
        let breakers = self.breakers.lock().expect("breaker lock poisoned");
        breakers.get(target).map(|b| b.state)
    }

    pub fn stats(&self) -> Vec<BreakerStats> {
        let now = self.clock.monotonic();
        let window = self.window();
        let breakers = self.breakers.lock().expect("breaker lock poisoned");
        breakers
            .iter()
            .map(|(target, breaker)| BreakerStats {
                target: target.clone(),
                state: breaker.state.as_str(),
                recent_failures: breaker
                    .failures
                    .iter()
                    .filter(|failed_at| now.saturating_sub(**failed_at) <= window)
                    .count(),
                open_count: breaker.open_count,
            })
            .collect()
    }

    /// Manually reset one target's breaker.
    pub fn reset(&self, target: &str) {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        if let Some(breaker) = breakers.get_mut(target) {
            breaker.close();
            breaker.open_count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ManualClock;

    fn config(threshold: u32, window_secs: u64, cooldown_secs: u64) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: threshold,
            window_seconds: window_secs,
            cooldown_seconds: cooldown_secs,
        }
    }

    fn registry(cfg: BreakerConfig) -> (Arc<ManualClock>, CircuitBreakerRegistry) {
        let clock = Arc::new(ManualClock::new());
        let registry = CircuitBreakerRegistry::new(cfg, clock.clone());
        (clock, registry)
    }

    #[test]
    fn unknown_target_is_closed() {
        let (_, registry) = registry(config(3, 60, 30));
        assert!(!registry.is_open("svc-1"));
        assert_eq!(registry.state("svc-1"), None);
    }

    #[test]
    fn opens_after_threshold_failures_within_window() {
        let (_, registry) = registry(config(3, 60, 30));
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        assert!(!registry.is_open("svc-1"));

        registry.record_failure("svc-1");
        assert!(registry.is_open("svc-1"));
        assert_eq!(registry.state("svc-1"), Some(CircuitState::Open));
    }

    #[test]
    fn failures_outside_window_do_not_open() {
        let (clock, registry) = registry(config(3, 60, 30));
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        clock.advance(Duration::from_secs(61));
        registry.record_failure("svc-1");
        assert!(!registry.is_open("svc-1"));
    }

    #[test]
    fn half_open_after_cooldown_then_closes_on_success() {
        let (clock, registry) = registry(config(2, 60, 30));
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        assert!(registry.is_open("svc-1"));

        clock.advance(Duration::from_secs(31));
        // First check after the cooldown admits a probe.
        assert!(!registry.is_open("svc-1"));
        assert_eq!(registry.state("svc-1"), Some(CircuitState::HalfOpen));

        registry.record_success("svc-1");
        assert_eq!(registry.state("svc-1"), Some(CircuitState::Closed));
        assert!(!registry.is_open("svc-1"));
    }

    #[test]
    fn half_open_failure_reopens() {
        let (clock, registry) = registry(config(2, 60, 30));
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        clock.advance(Duration::from_secs(31));
        assert!(!registry.is_open("svc-1"));

        registry.record_failure("svc-1");
        assert_eq!(registry.state("svc-1"), Some(CircuitState::Open));
        assert!(registry.is_open("svc-1"));
    }

    #[test]
    fn targets_are_independent() {
        let (_, registry) = registry(config(2, 60, 30));
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        assert!(registry.is_open("svc-1"));
        assert!(!registry.is_open("svc-2"));
    }

    #[test]
    fn success_in_closed_state_clears_failures() {
        let (_, registry) = registry(config(3, 60, 30));
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        registry.record_success("svc-1");
        registry.record_failure("svc-1");
        registry.record_failure("svc-1");
        assert!(!registry.is_open("svc-1"));
    }

    #[test]
    fn reset_closes_and_zeroes() {
        let (_, registry) = registry(config(1, 60, 30));
        registry.record_failure("svc-1");
        assert!(registry.is_open("svc-1"));
        registry.reset("svc-1");
        assert!(!registry.is_open("svc-1"));
        let stats = registry.stats();
        assert_eq!(stats[0].open_count, 0);
    }
}
