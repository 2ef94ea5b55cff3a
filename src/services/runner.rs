//! Scheduled re-evaluation of recently ingested samples.
//!
//! A single recurring task drains samples received since its last tick,
//! groups them by effective target, and runs one engine pass per group.
//! Ticks are serialized: a tick runs to completion before the next fires,
//! and overruns coalesce into at most one pending tick.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::domain::models::{RunnerConfig, StoredMetric};
use crate::domain::ports::MetricRepository;
use crate::services::dispatch::RemediationDispatcher;
use crate::services::engine::PolicyEngine;

#[derive(Debug, Clone, Serialize)]
pub struct RunnerStatus {
    pub enabled: bool,
    pub running: bool,
    pub interval_seconds: u64,
    pub batch_size: u32,
}

struct RunnerState {
    enabled: AtomicBool,
    running: AtomicBool,
}

pub struct Runner {
    config: RunnerConfig,
    state: Arc<RunnerState>,
    handle: JoinHandle<()>,
}

impl Runner {
    pub fn spawn(
        config: RunnerConfig,
        metrics: Arc<dyn MetricRepository>,
        engine: Arc<PolicyEngine>,
        dispatcher: Arc<RemediationDispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let state = Arc::new(RunnerState {
            enabled: AtomicBool::new(config.enabled),
            running: AtomicBool::new(false),
        });

        let handle = tokio::spawn(runner_loop(
            config.clone(),
            state.clone(),
            metrics,
            engine,
            dispatcher,
            shutdown,
        ));

        Self {
            config,
            state,
            handle,
        }
    }

    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            enabled: self.state.enabled.load(Ordering::Relaxed),
            running: self.state.running.load(Ordering::Relaxed),
            interval_seconds: self.config.interval_seconds,
            batch_size: self.config.batch_size,
        }
    }

    /// Toggle scheduled evaluation independently of the on-ingest path.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::Relaxed);
    }

    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

async fn runner_loop(
    config: RunnerConfig,
    state: Arc<RunnerState>,
    metrics: Arc<dyn MetricRepository>,
    engine: Arc<PolicyEngine>,
    dispatcher: Arc<RemediationDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_secs(config.interval_seconds.max(1)));
    // Overrun ticks are delayed rather than bursted, keeping at most one
    // tick pending at any time.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cursor: i64 = 0;

    info!(
        interval_seconds = config.interval_seconds,
        batch_size = config.batch_size,
        "runner started"
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if *shutdown.borrow() {
            break;
        }
        if !state.enabled.load(Ordering::Relaxed) {
            continue;
        }

        state.running.store(true, Ordering::Relaxed);
        match run_tick(&metrics, &engine, &dispatcher, cursor, config.batch_size).await {
            Ok(next_cursor) => cursor = next_cursor,
            Err(err) => error!(%err, "runner tick failed"),
        }
        state.running.store(false, Ordering::Relaxed);
    }

    info!("runner stopped");
}

/// Drain one batch, evaluate per target group, and return the new cursor.
async fn run_tick(
    metrics: &Arc<dyn MetricRepository>,
    engine: &Arc<PolicyEngine>,
    dispatcher: &Arc<RemediationDispatcher>,
    cursor: i64,
    batch_size: u32,
) -> crate::domain::errors::DomainResult<i64> {
    let batch = metrics.since_id(cursor, batch_size).await?;
    if batch.is_empty() {
        return Ok(cursor);
    }
    let next_cursor = batch.last().map_or(cursor, |m| m.id);

    for (target, samples) in group_by_target(&batch) {
        // Later samples of the same metric win within a tick.
        let mut mapping: HashMap<String, f64> = HashMap::new();
        for sample in &samples {
            mapping.insert(sample.sample.name.clone(), sample.sample.value);
        }

        let evaluation = engine.evaluate(&mapping, target.as_deref());
        debug!(
            target = target.as_deref().unwrap_or("-"),
            samples = samples.len(),
            violations = evaluation.violations.len(),
            intents = evaluation.intents.len(),
            "runner evaluated group"
        );
        if !evaluation.intents.is_empty() {
            dispatcher.submit(&evaluation.intents).await?;
        }
    }

    Ok(next_cursor)
}

fn group_by_target(batch: &[StoredMetric]) -> Vec<(Option<String>, Vec<&StoredMetric>)> {
    let mut groups: Vec<(Option<String>, Vec<&StoredMetric>)> = Vec::new();
    for metric in batch {
        let target = metric.sample.effective_target().map(str::to_string);
        match groups.iter_mut().find(|(key, _)| *key == target) {
            Some((_, members)) => members.push(metric),
            None => groups.push((target, vec![metric])),
        }
    }
    groups
}
