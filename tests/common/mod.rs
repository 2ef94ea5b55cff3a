//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tempfile::TempDir;

use warden::adapters::sqlite::SqliteStore;
use warden::domain::models::TaskEnvelope;
use warden::domain::ports::{RemediationOutcome, Remediator};

/// Create a migrated in-memory database for test isolation.
#[allow(dead_code)]
pub async fn migrated_pool() -> SqlitePool {
    SqliteStore::open_in_memory()
        .await
        .expect("test store")
        .pool()
}

/// Create a temporary directory holding a database file, for tests that
/// exercise durability across pool reopens.
#[allow(dead_code)]
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    (dir, db_path)
}

/// Remediator double that replays a scripted sequence of outcomes and
/// counts deliveries. Once the script is exhausted every further dispatch
/// succeeds.
#[allow(dead_code)]
pub struct ScriptedRemediator {
    outcomes: Mutex<VecDeque<RemediationOutcome>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedRemediator {
    pub fn new(outcomes: Vec<RemediationOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Remediator for ScriptedRemediator {
    async fn dispatch(&self, _envelope: &TaskEnvelope) -> RemediationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or(RemediationOutcome::Success { detail: None })
    }
}

/// Wait until `predicate` returns true, polling every 10ms, or panic after
/// `timeout_ms`.
#[allow(dead_code)]
pub async fn wait_for<F, Fut>(timeout_ms: u64, mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    loop {
        if predicate().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout_ms}ms"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
