//! Retry policy with exponential backoff for remediator dispatches.

use rand::Rng;
use std::time::Duration;

use crate::domain::models::RetryConfig;

/// Fraction of the backoff added or removed as jitter.
const JITTER_PCT: f64 = 0.20;

/// Retry policy with exponential backoff
///
/// Delay for a 1-based attempt is `min(max_delay, base * factor^(attempt-1))`
/// with up to ±20% jitter so synchronized retries do not stampede the
/// remediator.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum remediator deliveries per action before terminal failure
    pub max_attempts: u32,

    /// Initial backoff duration in milliseconds
    pub base_delay_ms: u64,

    /// Maximum backoff duration in milliseconds
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            exponential_base: config.exponential_base,
        }
    }

    /// Whether another delivery is allowed after `attempt` (1-based) failed.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Pre-jitter backoff for a 1-based attempt number.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.exponential_base.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let raw_ms = (self.base_delay_ms as f64) * factor;
        let capped_ms = raw_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Backoff with ±20% jitter applied.
    pub fn jittered_backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        let spread = base.as_secs_f64() * JITTER_PCT;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((base.as_secs_f64() + offset).max(0.0))
    }
}
