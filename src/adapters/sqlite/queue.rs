//! SQLite-backed durable remediation queue.
//!
//! Envelopes live in the `remediation_queue` table until a consumer pops
//! them, so anything not yet claimed survives a process crash. The pop is a
//! single `DELETE ... RETURNING` of the minimum id, which SQLite serializes,
//! giving exactly-one delivery per envelope across concurrent consumers.
//!
//! Blocking dequeue is a bounded poll: same-process producers wake waiting
//! consumers through a `Notify`, while the poll interval covers envelopes
//! written by other processes sharing the database file.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};

use crate::domain::errors::DomainResult;
use crate::domain::models::TaskEnvelope;
use crate::domain::ports::{QueueStats, RemediationQueue};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct SqliteQueue {
    pool: SqlitePool,
    notify: Notify,
    tasks_enqueued: AtomicU64,
    tasks_dequeued: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    last_processed: Mutex<Option<String>>,
}

impl SqliteQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            notify: Notify::new(),
            tasks_enqueued: AtomicU64::new(0),
            tasks_dequeued: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            last_processed: Mutex::new(None),
        }
    }

    async fn try_pop(&self) -> DomainResult<Option<TaskEnvelope>> {
        let row = sqlx::query(
            "DELETE FROM remediation_queue
             WHERE id = (SELECT id FROM remediation_queue ORDER BY id LIMIT 1)
             RETURNING payload",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let payload: String = row.get("payload");
                let envelope: TaskEnvelope = serde_json::from_str(&payload)?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RemediationQueue for SqliteQueue {
    async fn enqueue(&self, envelope: &TaskEnvelope) -> DomainResult<()> {
        let payload = serde_json::to_string(envelope)?;
        sqlx::query(
            "INSERT INTO remediation_queue (task_id, payload, enqueued_at) VALUES (?, ?, ?)",
        )
        .bind(&envelope.task_id)
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.tasks_enqueued.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> DomainResult<Option<TaskEnvelope>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(envelope) = self.try_pop().await? {
                self.tasks_dequeued.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(envelope));
            }

            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Ok(None);
            };
            let wait = remaining.min(POLL_INTERVAL);
            tokio::select! {
                () = self.notify.notified() => {}
                () = sleep(wait) => {}
            }
        }
    }

    async fn len(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM remediation_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    fn record_completed(&self, task_id: &str) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last_processed.lock().expect("queue lock poisoned");
        *last = Some(task_id.to_string());
    }

    fn record_failed(&self, task_id: &str) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        let _ = task_id;
    }

    async fn stats(&self) -> DomainResult<QueueStats> {
        Ok(QueueStats {
            queue_length: self.len().await?,
            tasks_enqueued: self.tasks_enqueued.load(Ordering::Relaxed),
            tasks_dequeued: self.tasks_dequeued.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            last_processed_task: self
                .last_processed
                .lock()
                .expect("queue lock poisoned")
                .clone(),
        })
    }
}
