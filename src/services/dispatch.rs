//! Turns engine intents into persisted actions and queue envelopes.
//!
//! Shared by the ingest path and the scheduled runner. The remediator is
//! never called here; workers pick the envelopes up asynchronously.

use std::sync::Arc;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActionIntent, ActionRecord, TaskEnvelope};
use crate::domain::ports::{ActionRepository, Clock, RemediationQueue};
use crate::services::telemetry::Telemetry;

pub struct RemediationDispatcher {
    actions: Arc<dyn ActionRepository>,
    queue: Arc<dyn RemediationQueue>,
    telemetry: Arc<Telemetry>,
    clock: Arc<dyn Clock>,
}

impl RemediationDispatcher {
    pub fn new(
        actions: Arc<dyn ActionRepository>,
        queue: Arc<dyn RemediationQueue>,
        telemetry: Arc<Telemetry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            actions,
            queue,
            telemetry,
            clock,
        }
    }

    /// Create one pending action record per intent and enqueue its first
    /// envelope. Returns the created records in intent order.
    pub async fn submit(&self, intents: &[ActionIntent]) -> DomainResult<Vec<ActionRecord>> {
        let mut records = Vec::with_capacity(intents.len());
        for intent in intents {
            let record = self
                .actions
                .create(&intent.target, intent.action.as_str(), None)
                .await?;

            let envelope = TaskEnvelope::first_attempt(record.id, intent, self.clock.wall());
            self.queue.enqueue(&envelope).await?;
            self.telemetry.record_queue_op("enqueue");
            self.telemetry
                .record_action(&intent.target, intent.action.as_str(), "pending");

            info!(
                action_id = record.id,
                task_id = %envelope.task_id,
                target = %intent.target,
                action = %intent.action.as_str(),
                "remediation enqueued"
            );
            records.push(record);
        }
        Ok(records)
    }
}
