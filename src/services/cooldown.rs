//! Per `(policy, target)` cooldown tracking.
//!
//! All arithmetic runs on the injected monotonic clock. The check-and-mark
//! is a single critical section so two concurrent evaluations of the same
//! pair cannot both emit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::ports::Clock;

type CooldownKey = (String, String);

/// How many multiples of the largest observed cooldown an entry may age
/// before opportunistic eviction. Evicting is always safe: an unknown key
/// reads as ready.
const EVICTION_FACTOR: u32 = 10;

pub struct CooldownRegistry {
    clock: Arc<dyn Clock>,
    inner: Mutex<CooldownState>,
}

struct CooldownState {
    last_fired: HashMap<CooldownKey, Duration>,
    longest_cooldown: Duration,
}

impl CooldownRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(CooldownState {
                last_fired: HashMap::new(),
                longest_cooldown: Duration::ZERO,
            }),
        }
    }

    /// Whether the pair may fire, and how long remains if it may not.
    pub fn ready(&self, policy: &str, target: &str, cooldown: Duration) -> (bool, Duration) {
        let now = self.clock.monotonic();
        let state = self.inner.lock().expect("cooldown lock poisoned");
        match state.last_fired.get(&key(policy, target)) {
            Some(last) => {
                let elapsed = now.saturating_sub(*last);
                if elapsed >= cooldown {
                    (true, Duration::ZERO)
                } else {
                    (false, cooldown - elapsed)
                }
            }
            None => (true, Duration::ZERO),
        }
    }

    /// Atomic check-and-mark: returns true and records the firing when the
    /// pair is ready, false without side effects otherwise.
    pub fn try_fire(&self, policy: &str, target: &str, cooldown: Duration) -> bool {
        let now = self.clock.monotonic();
        let mut state = self.inner.lock().expect("cooldown lock poisoned");

        let allowed = match state.last_fired.get(&key(policy, target)) {
            Some(last) => now.saturating_sub(*last) >= cooldown,
            None => true,
        };
        if allowed {
            state.last_fired.insert(key(policy, target), now);
            if cooldown > state.longest_cooldown {
                state.longest_cooldown = cooldown;
            }
        }
        allowed
    }

    /// Record a firing unconditionally.
    pub fn mark(&self, policy: &str, target: &str) {
        let now = self.clock.monotonic();
        let mut state = self.inner.lock().expect("cooldown lock poisoned");
        state.last_fired.insert(key(policy, target), now);
    }

    /// Drop entries old enough that no configured cooldown can still
    /// suppress them.
    pub fn evict_stale(&self) {
        let now = self.clock.monotonic();
        let mut state = self.inner.lock().expect("cooldown lock poisoned");
        let horizon = state.longest_cooldown * EVICTION_FACTOR;
        if horizon.is_zero() {
            return;
        }
        state
            .last_fired
            .retain(|_, last| now.saturating_sub(*last) <= horizon);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cooldown lock poisoned").last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(policy: &str, target: &str) -> CooldownKey {
    (policy.to_string(), target.to_string())
}
