//! Remediation queue port.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::domain::errors::DomainResult;
use crate::domain::models::TaskEnvelope;

/// Counters exposed to operators alongside the advisory queue length.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub queue_length: u64,
    pub tasks_enqueued: u64,
    pub tasks_dequeued: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub last_processed_task: Option<String>,
}

/// Durable multi-producer multi-consumer FIFO of task envelopes.
///
/// Consumers observe envelopes in enqueue order across all producers.
/// Claiming is destructive; envelopes not yet dequeued survive process
/// restarts.
#[async_trait]
pub trait RemediationQueue: Send + Sync {
    /// Append an envelope to the tail.
    async fn enqueue(&self, envelope: &TaskEnvelope) -> DomainResult<()>;

    /// Block up to `timeout` for the head envelope; `None` on timeout.
    async fn dequeue(&self, timeout: Duration) -> DomainResult<Option<TaskEnvelope>>;

    /// Advisory current size; may be momentarily stale.
    async fn len(&self) -> DomainResult<u64>;

    /// Record that a dequeued task finished successfully.
    fn record_completed(&self, task_id: &str);

    /// Record that a dequeued task failed terminally.
    fn record_failed(&self, task_id: &str);

    /// Snapshot of the observable counters.
    async fn stats(&self) -> DomainResult<QueueStats>;
}
