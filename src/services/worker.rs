//! Worker pool consuming the remediation queue.
//!
//! Each worker blocks on the queue, claims the action record for the
//! envelope it popped, checks the target's circuit, and drives the
//! remediator. Failures are isolated per task: nothing a single envelope
//! does can take a worker down.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::{TaskEnvelope, WorkerConfig};
use crate::domain::ports::{
    ActionRepository, Clock, RemediationOutcome, RemediationQueue, Remediator,
};
use crate::services::circuit_breaker::CircuitBreakerRegistry;
use crate::services::retry::RetryPolicy;
use crate::services::telemetry::Telemetry;

/// Shared dependencies cloned into every worker task.
struct WorkerContext {
    queue: Arc<dyn RemediationQueue>,
    actions: Arc<dyn ActionRepository>,
    breaker: Arc<CircuitBreakerRegistry>,
    remediator: Arc<dyn Remediator>,
    retry: RetryPolicy,
    telemetry: Arc<Telemetry>,
    clock: Arc<dyn Clock>,
    poll_timeout: Duration,
    execution_timeout: Duration,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `max_concurrent` independent consumers. Workers stop once the
    /// shutdown signal flips and their current task reaches a terminal
    /// action state.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        config: &WorkerConfig,
        retry: RetryPolicy,
        queue: Arc<dyn RemediationQueue>,
        actions: Arc<dyn ActionRepository>,
        breaker: Arc<CircuitBreakerRegistry>,
        remediator: Arc<dyn Remediator>,
        telemetry: Arc<Telemetry>,
        clock: Arc<dyn Clock>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let context = Arc::new(WorkerContext {
            queue,
            actions,
            breaker,
            remediator,
            retry,
            telemetry,
            clock,
            poll_timeout: Duration::from_secs(config.queue_poll_timeout_seconds),
            execution_timeout: Duration::from_secs(config.execution_timeout_seconds),
        });

        let handles = (0..config.max_concurrent)
            .map(|worker_id| {
                let context = context.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(worker_loop(worker_id, context, shutdown))
            })
            .collect();

        Self { handles }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Wait for all workers to finish, up to `drain_timeout`.
    pub async fn shutdown(self, drain_timeout: Duration) {
        let drained = timeout(drain_timeout, futures::future::join_all(self.handles)).await;
        if drained.is_err() {
            warn!("workers did not drain within the shutdown timeout");
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    context: Arc<WorkerContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker_id, "worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        // The dequeue is destructive, so it is never raced against the
        // shutdown signal: an envelope popped during shutdown is still
        // driven to a terminal action state before the worker exits.
        match context.queue.dequeue(context.poll_timeout).await {
            Ok(Some(envelope)) => {
                context.telemetry.record_queue_op("dequeue");
                process_envelope(&context, envelope, &mut shutdown).await;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(worker_id, %err, "queue dequeue failed");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
    info!(worker_id, "worker stopped");
}

async fn process_envelope(
    context: &WorkerContext,
    envelope: TaskEnvelope,
    shutdown: &mut watch::Receiver<bool>,
) {
    // Winning the claim moves the record to running before any remote call,
    // so a crash after this point cannot replay the same delivery.
    match context.actions.claim(envelope.action_id).await {
        Ok(_) => {}
        Err(DomainError::Conflict { .. }) => {
            debug!(
                action_id = envelope.action_id,
                task_id = %envelope.task_id,
                "duplicate delivery discarded"
            );
            return;
        }
        Err(err) => {
            warn!(action_id = envelope.action_id, %err, "claim failed, dropping envelope");
            return;
        }
    };

    context.telemetry.worker_started();
    dispatch_claimed(context, &envelope, shutdown).await;
    context.telemetry.worker_finished();
}

async fn dispatch_claimed(
    context: &WorkerContext,
    envelope: &TaskEnvelope,
    shutdown: &mut watch::Receiver<bool>,
) {
    if context.breaker.is_open(&envelope.target) {
        info!(
            target = %envelope.target,
            action_id = envelope.action_id,
            "circuit open, failing without dispatch"
        );
        finalize_failure(context, envelope, "circuit_open").await;
        return;
    }

    let outcome = match timeout(
        context.execution_timeout,
        context.remediator.dispatch(envelope),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => RemediationOutcome::Transient {
            reason: "execution timeout exceeded".to_string(),
        },
    };

    match outcome {
        RemediationOutcome::Success { detail } => {
            if let Err(err) = context
                .actions
                .mark_completed(envelope.action_id, detail.as_deref())
                .await
            {
                error!(action_id = envelope.action_id, %err, "failed to persist completion");
            }
            context.queue.record_completed(&envelope.task_id);
            context.breaker.record_success(&envelope.target);
            context.telemetry.record_worker_task("completed");
            context
                .telemetry
                .record_action(&envelope.target, envelope.action.as_str(), "completed");
            info!(
                action_id = envelope.action_id,
                task_id = %envelope.task_id,
                attempt = envelope.attempt,
                "remediation completed"
            );
        }
        RemediationOutcome::Permanent { reason } => {
            context.breaker.record_failure(&envelope.target);
            finalize_failure(context, envelope, &reason).await;
        }
        RemediationOutcome::Transient { reason } => {
            context.breaker.record_failure(&envelope.target);
            if context.retry.allows_retry(envelope.attempt) {
                schedule_retry(context, envelope, &reason, shutdown).await;
            } else {
                finalize_failure(context, envelope, &format!("retries exhausted: {reason}")).await;
            }
        }
    }
}

/// Back off, move the action back to pending, and re-enqueue the envelope
/// with the next attempt number. Shutdown interrupts the backoff sleep but
/// the re-enqueue still happens so the delivery is not lost.
async fn schedule_retry(
    context: &WorkerContext,
    envelope: &TaskEnvelope,
    reason: &str,
    shutdown: &mut watch::Receiver<bool>,
) {
    let delay = context.retry.jittered_backoff(envelope.attempt);
    debug!(
        action_id = envelope.action_id,
        attempt = envelope.attempt,
        delay_ms = delay.as_millis() as u64,
        %reason,
        "transient failure, backing off before retry"
    );
    tokio::select! {
        () = sleep(delay) => {}
        _ = shutdown.changed() => {}
    }

    if let Err(err) = context
        .actions
        .mark_pending_retry(envelope.action_id, reason)
        .await
    {
        error!(action_id = envelope.action_id, %err, "failed to reset action for retry");
        return;
    }

    let retry_envelope = envelope.next_attempt(context.clock.wall());
    match context.queue.enqueue(&retry_envelope).await {
        Ok(()) => {
            context.telemetry.record_queue_op("enqueue");
            context.telemetry.record_worker_task("retried");
        }
        Err(err) => {
            error!(action_id = envelope.action_id, %err, "failed to re-enqueue retry");
        }
    }
}

async fn finalize_failure(context: &WorkerContext, envelope: &TaskEnvelope, reason: &str) {
    if let Err(err) = context.actions.mark_failed(envelope.action_id, reason).await {
        error!(action_id = envelope.action_id, %err, "failed to persist failure");
    }
    context.queue.record_failed(&envelope.task_id);
    context.telemetry.record_worker_task("failed");
    context
        .telemetry
        .record_action(&envelope.target, envelope.action.as_str(), "failed");
    warn!(
        action_id = envelope.action_id,
        task_id = %envelope.task_id,
        attempt = envelope.attempt,
        %reason,
        "remediation failed"
    );
}
