//! Process-wide lifecycle and the function surface of the control plane.
//!
//! Construction injects every collaborator: repositories, queue, remediator
//! client, and clock. `start` brings up the worker pool and the scheduled
//! runner; `shutdown` signals both and waits for in-flight dispatches to
//! reach a terminal action state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionIntent, ActionKind, ActionRecord, ActionStatus, MetricSample, Policy, PolicyDocument,
    PolicyPatch, Severity, Violation, WardenConfig,
};
use crate::domain::ports::{
    ActionFilter, ActionRepository, Clock, MetricRepository, QueueStats, RemediationQueue,
    Remediator,
};
use crate::services::circuit_breaker::{BreakerStats, CircuitBreakerRegistry};
use crate::services::cooldown::CooldownRegistry;
use crate::services::dispatch::RemediationDispatcher;
use crate::services::engine::PolicyEngine;
use crate::services::registry::PolicyRegistry;
use crate::services::retry::RetryPolicy;
use crate::services::runner::{Runner, RunnerStatus};
use crate::services::telemetry::{Telemetry, TelemetrySnapshot};
use crate::services::worker::WorkerPool;

/// Ingest request body.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub metric_id: i64,
    pub message: String,
}

/// Dry-run evaluation request body.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub metrics: HashMap<String, f64>,
    #[serde(default)]
    pub target: Option<String>,
}

/// An action that would be triggered by the evaluated metrics.
#[derive(Debug, Clone, Serialize)]
pub struct TriggeredAction {
    pub action: &'static str,
    pub target: String,
    pub status: &'static str,
    pub params: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub ok: bool,
    pub violations: Vec<Violation>,
    pub actions_triggered: Vec<TriggeredAction>,
    pub timestamp: DateTime<Utc>,
}

/// Manual remediation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActionRequest {
    pub target: String,
    pub action: ActionKind,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Aggregate operator-facing statistics.
#[derive(Debug, Serialize)]
pub struct ControlPlaneStats {
    pub queue: QueueStats,
    pub runner: RunnerStatus,
    pub breakers: Vec<BreakerStats>,
    pub counters: TelemetrySnapshot,
}

pub struct ControlPlane {
    config: WardenConfig,
    registry: Arc<PolicyRegistry>,
    engine: Arc<PolicyEngine>,
    breaker: Arc<CircuitBreakerRegistry>,
    metrics: Arc<dyn MetricRepository>,
    actions: Arc<dyn ActionRepository>,
    queue: Arc<dyn RemediationQueue>,
    remediator: Arc<dyn Remediator>,
    dispatcher: Arc<RemediationDispatcher>,
    telemetry: Arc<Telemetry>,
    clock: Arc<dyn Clock>,
    workers: Mutex<Option<WorkerPool>>,
    runner: Mutex<Option<Runner>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ControlPlane {
    pub fn new(
        config: WardenConfig,
        metrics: Arc<dyn MetricRepository>,
        actions: Arc<dyn ActionRepository>,
        queue: Arc<dyn RemediationQueue>,
        remediator: Arc<dyn Remediator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let telemetry = Arc::new(Telemetry::new());
        let registry = Arc::new(PolicyRegistry::new());
        let cooldowns = Arc::new(CooldownRegistry::new(clock.clone()));
        let breaker = Arc::new(CircuitBreakerRegistry::new(
            config.breaker.clone(),
            clock.clone(),
        ));
        let engine = Arc::new(PolicyEngine::new(
            registry.clone(),
            cooldowns,
            telemetry.clone(),
            clock.clone(),
        ));
        let dispatcher = Arc::new(RemediationDispatcher::new(
            actions.clone(),
            queue.clone(),
            telemetry.clone(),
            clock.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            registry,
            engine,
            breaker,
            metrics,
            actions,
            queue,
            remediator,
            dispatcher,
            telemetry,
            clock,
            workers: Mutex::new(None),
            runner: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// Bring up the worker pool and, when enabled, the scheduled runner.
    pub fn start(&self) {
        let pool = WorkerPool::spawn(
            &self.config.workers,
            RetryPolicy::from_config(&self.config.retry),
            self.queue.clone(),
            self.actions.clone(),
            self.breaker.clone(),
            self.remediator.clone(),
            self.telemetry.clone(),
            self.clock.clone(),
            self.shutdown_tx.subscribe(),
        );
        info!(workers = pool.worker_count(), "worker pool started");
        *self.workers.lock().expect("control plane lock poisoned") = Some(pool);

        let runner = Runner::spawn(
            self.config.runner.clone(),
            self.metrics.clone(),
            self.engine.clone(),
            self.dispatcher.clone(),
            self.shutdown_tx.subscribe(),
        );
        *self.runner.lock().expect("control plane lock poisoned") = Some(runner);
    }

    /// Signal workers and the runner, then wait up to the configured
    /// shutdown timeout for in-flight dispatches to drain. Envelopes not
    /// yet claimed stay in the queue.
    pub async fn shutdown(&self) {
        info!("control plane shutting down");
        let _ = self.shutdown_tx.send(true);

        let workers = self
            .workers
            .lock()
            .expect("control plane lock poisoned")
            .take();
        if let Some(pool) = workers {
            pool.shutdown(Duration::from_secs(self.config.shutdown_timeout_seconds))
                .await;
        }

        let runner = self
            .runner
            .lock()
            .expect("control plane lock poisoned")
            .take();
        if let Some(runner) = runner {
            runner.stop().await;
        }
        info!("control plane stopped");
    }

    // --- ingest -----------------------------------------------------------

    /// Persist a sample, evaluate it synchronously, and enqueue any intents.
    /// The remediator is never called on this path.
    pub async fn ingest(&self, request: IngestRequest) -> DomainResult<IngestResponse> {
        self.telemetry.record_request();

        let sample = MetricSample::new(request.name, request.value, request.tags, self.clock.wall());
        sample.validate()?;

        let metric_id = self.metrics.insert(&sample).await?;
        self.telemetry.record_ingest();

        let mut mapping = HashMap::new();
        mapping.insert(sample.name.clone(), sample.value);
        let evaluation = self.engine.evaluate(&mapping, sample.effective_target());
        let triggered = evaluation.intents.len();
        if triggered > 0 {
            self.dispatcher.submit(&evaluation.intents).await?;
        }

        Ok(IngestResponse {
            ok: true,
            metric_id,
            message: format!(
                "ingested `{}`; {} violation(s), {} action(s) triggered",
                sample.name,
                evaluation.violations.len(),
                triggered
            ),
        })
    }

    // --- policies ---------------------------------------------------------

    pub fn create_policy(&self, policy: Policy) -> DomainResult<Policy> {
        self.telemetry.record_request();
        self.registry.insert(policy.clone())?;
        Ok(policy)
    }

    pub fn list_policies(&self) -> Vec<Policy> {
        self.telemetry.record_request();
        self.registry.list()
    }

    pub fn get_policy(&self, name: &str) -> DomainResult<Policy> {
        self.telemetry.record_request();
        self.registry.get(name)
    }

    pub fn update_policy(&self, name: &str, patch: PolicyPatch) -> DomainResult<Policy> {
        self.telemetry.record_request();
        self.registry.update(name, patch)
    }

    pub fn delete_policy(&self, name: &str) -> DomainResult<()> {
        self.telemetry.record_request();
        self.registry.delete(name)
    }

    pub fn enable_policy(&self, name: &str) -> DomainResult<()> {
        self.telemetry.record_request();
        self.registry.enable(name)
    }

    pub fn disable_policy(&self, name: &str) -> DomainResult<()> {
        self.telemetry.record_request();
        self.registry.disable(name)
    }

    pub fn policies_by_severity(&self, severity: Severity) -> Vec<Policy> {
        self.telemetry.record_request();
        self.registry.by_severity(severity)
    }

    /// Transactional reload from a parsed document.
    pub fn reload_policies(&self, document: PolicyDocument) -> DomainResult<usize> {
        self.telemetry.record_request();
        self.registry.reload(document)
    }

    /// Transactional reload from a YAML policy file.
    pub fn reload_policies_from_path(&self, path: &Path) -> DomainResult<usize> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            DomainError::Validation(format!("cannot read policy file {}: {err}", path.display()))
        })?;
        let document = PolicyDocument::from_yaml(&raw)?;
        self.reload_policies(document)
    }

    /// Side-effect-free evaluation: cooldowns stay untouched and nothing is
    /// enqueued. Triggered actions are reported as simulated.
    pub fn evaluate(&self, request: &EvaluateRequest) -> EvaluateResponse {
        self.telemetry.record_request();
        let evaluation = self
            .engine
            .evaluate_dry_run(&request.metrics, request.target.as_deref());

        EvaluateResponse {
            ok: true,
            violations: evaluation.violations,
            actions_triggered: evaluation
                .intents
                .into_iter()
                .map(|intent| TriggeredAction {
                    action: intent.action.as_str(),
                    target: intent.target,
                    status: "simulated",
                    params: intent.params,
                })
                .collect(),
            timestamp: self.clock.wall(),
        }
    }

    // --- actions ----------------------------------------------------------

    /// Create a manual remediation: persists the record and enqueues its
    /// envelope exactly like an engine-emitted intent.
    pub async fn create_action(&self, request: CreateActionRequest) -> DomainResult<ActionRecord> {
        self.telemetry.record_request();
        let intent = ActionIntent {
            action: request.action,
            target: request.target,
            severity: request.severity,
            params: request.params,
        };
        let mut records = self.dispatcher.submit(std::slice::from_ref(&intent)).await?;
        records
            .pop()
            .ok_or_else(|| DomainError::Internal("dispatcher returned no record".into()))
    }

    pub async fn list_actions(&self, filter: ActionFilter) -> DomainResult<Vec<ActionRecord>> {
        self.telemetry.record_request();
        self.actions.list(filter).await
    }

    pub async fn get_action(&self, id: i64) -> DomainResult<ActionRecord> {
        self.telemetry.record_request();
        self.actions.get(id).await
    }

    /// Status filtering has exactly one entry point; a caller-supplied
    /// filter is expressed through it rather than combined with other
    /// filters.
    pub async fn actions_by_status(
        &self,
        status: ActionStatus,
        limit: Option<u32>,
    ) -> DomainResult<Vec<ActionRecord>> {
        self.telemetry.record_request();
        self.actions
            .list(ActionFilter {
                status: Some(status),
                target: None,
                limit,
            })
            .await
    }

    pub async fn cancel_action(&self, id: i64) -> DomainResult<()> {
        self.telemetry.record_request();
        self.actions.cancel(id).await
    }

    // --- stats ------------------------------------------------------------

    pub fn runner_status(&self) -> RunnerStatus {
        let runner = self.runner.lock().expect("control plane lock poisoned");
        runner.as_ref().map_or(
            RunnerStatus {
                enabled: self.config.runner.enabled,
                running: false,
                interval_seconds: self.config.runner.interval_seconds,
                batch_size: self.config.runner.batch_size,
            },
            Runner::status,
        )
    }

    pub fn set_runner_enabled(&self, enabled: bool) {
        let runner = self.runner.lock().expect("control plane lock poisoned");
        if let Some(runner) = runner.as_ref() {
            runner.set_enabled(enabled);
        }
    }

    pub async fn queue_stats(&self) -> DomainResult<QueueStats> {
        self.queue.stats().await
    }

    pub fn breaker_stats(&self) -> Vec<BreakerStats> {
        self.breaker.stats()
    }

    pub async fn stats(&self) -> DomainResult<ControlPlaneStats> {
        Ok(ControlPlaneStats {
            queue: self.queue.stats().await?,
            runner: self.runner_status(),
            breakers: self.breaker.stats(),
            counters: self.telemetry.snapshot(),
        })
    }
}
