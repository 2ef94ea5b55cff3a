//! Process-wide observable counters.
//!
//! Counters are plain atomics plus small locked maps for labeled series.
//! They feed the stats surface; there is no scrape endpoint here.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Result label for policy evaluation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalResult {
    Matched,
    Unmatched,
}

impl EvalResult {
    fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
        }
    }
}

#[derive(Default)]
pub struct Telemetry {
    requests_total: AtomicU64,
    ingest_total: AtomicU64,
    worker_active: AtomicU64,
    policy_evaluations: Mutex<HashMap<String, u64>>,
    actions_total: Mutex<HashMap<String, u64>>,
    queue_operations: Mutex<HashMap<&'static str, u64>>,
    worker_tasks: Mutex<HashMap<&'static str, u64>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingest(&self) {
        self.ingest_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_policy_evaluation(&self, policy: &str, result: EvalResult) {
        let key = format!("{policy}|{}", result.as_str());
        let mut map = self.policy_evaluations.lock().expect("telemetry poisoned");
        *map.entry(key).or_insert(0) += 1;
    }

    pub fn record_action(&self, target: &str, action: &str, status: &str) {
        let key = format!("{target}|{action}|{status}");
        let mut map = self.actions_total.lock().expect("telemetry poisoned");
        *map.entry(key).or_insert(0) += 1;
    }

    pub fn record_queue_op(&self, op: &'static str) {
        let mut map = self.queue_operations.lock().expect("telemetry poisoned");
        *map.entry(op).or_insert(0) += 1;
    }

    pub fn record_worker_task(&self, status: &'static str) {
        let mut map = self.worker_tasks.lock().expect("telemetry poisoned");
        *map.entry(status).or_insert(0) += 1;
    }

    pub fn worker_started(&self) {
        self.worker_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_finished(&self) {
        self.worker_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            ingest_total: self.ingest_total.load(Ordering::Relaxed),
            worker_active: self.worker_active.load(Ordering::Relaxed),
            policy_evaluation_total: self
                .policy_evaluations
                .lock()
                .expect("telemetry poisoned")
                .clone(),
            actions_total: self.actions_total.lock().expect("telemetry poisoned").clone(),
            queue_operations_total: self
                .queue_operations
                .lock()
                .expect("telemetry poisoned")
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
            worker_tasks_total: self
                .worker_tasks
                .lock()
                .expect("telemetry poisoned")
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        }
    }
}

/// Point-in-time copy of every counter, serializable for stats output.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub requests_total: u64,
    pub ingest_total: u64,
    pub worker_active: u64,
    pub policy_evaluation_total: HashMap<String, u64>,
    pub actions_total: HashMap<String, u64>,
    pub queue_operations_total: HashMap<String, u64>,
    pub worker_tasks_total: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let telemetry = Telemetry::new();
        telemetry.record_ingest();
        telemetry.record_ingest();
        telemetry.record_request();
        telemetry.record_policy_evaluation("high-cpu", EvalResult::Matched);
        telemetry.record_policy_evaluation("high-cpu", EvalResult::Matched);
        telemetry.record_policy_evaluation("high-cpu", EvalResult::Unmatched);
        telemetry.record_queue_op("enqueue");
        telemetry.record_worker_task("completed");

        let snap = telemetry.snapshot();
        assert_eq!(snap.ingest_total, 2);
        assert_eq!(snap.requests_total, 1);
        assert_eq!(snap.policy_evaluation_total.get("high-cpu|matched"), Some(&2));
        assert_eq!(snap.policy_evaluation_total.get("high-cpu|unmatched"), Some(&1));
        assert_eq!(snap.queue_operations_total.get("enqueue"), Some(&1));
        assert_eq!(snap.worker_tasks_total.get("completed"), Some(&1));
    }

    #[test]
    fn worker_active_gauge_tracks_in_flight() {
        let telemetry = Telemetry::new();
        telemetry.worker_started();
        telemetry.worker_started();
        telemetry.worker_finished();
        assert_eq!(telemetry.snapshot().worker_active, 1);
    }
}
