//! Queue payload tying a remediation intent to its action record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::models::policy::{ActionKind, Severity};
use crate::domain::models::violation::ActionIntent;

/// Serialized payload placed on the remediation queue.
///
/// Corresponds one-to-one with an action record at enqueue time. The
/// `task_id` stays stable across retries of the same action; `attempt` is
/// 1-based and strictly increasing per re-enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task_id: String,
    pub action_id: i64,
    pub target: String,
    pub action: ActionKind,
    pub severity: Severity,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub enqueued_at: DateTime<Utc>,
    pub attempt: u32,
}

impl TaskEnvelope {
    /// Build the first-attempt envelope for a freshly created action record.
    pub fn first_attempt(action_id: i64, intent: &ActionIntent, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            action_id,
            target: intent.target.clone(),
            action: intent.action,
            severity: intent.severity,
            params: intent.params.clone(),
            enqueued_at,
            attempt: 1,
        }
    }

    /// Clone the envelope for re-delivery after a transient failure.
    pub fn next_attempt(&self, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            attempt: self.attempt + 1,
            enqueued_at,
            ..self.clone()
        }
    }

    /// Idempotency key sent to the remediator; distinct per attempt so the
    /// remote side can deduplicate exactly one delivery of each try.
    pub fn idempotency_key(&self) -> String {
        format!("{}-{}", self.task_id, self.attempt)
    }
}
