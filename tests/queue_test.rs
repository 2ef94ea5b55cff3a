//! Integration tests for the durable remediation queue.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Map;

use warden::adapters::sqlite::{SqliteQueue, SqliteStore};
use warden::domain::models::{ActionIntent, ActionKind, DatabaseConfig, Severity, TaskEnvelope};
use warden::domain::ports::RemediationQueue;

fn envelope(task_id: &str, action_id: i64) -> TaskEnvelope {
    let intent = ActionIntent {
        action: ActionKind::Restart,
        target: "web-1".to_string(),
        severity: Severity::Warning,
        params: Map::new(),
    };
    let mut env = TaskEnvelope::first_attempt(action_id, &intent, Utc::now());
    env.task_id = task_id.to_string();
    env
}

#[tokio::test]
async fn dequeue_order_equals_enqueue_order() {
    let queue = SqliteQueue::new(common::migrated_pool().await);

    for (task_id, action_id) in [("A", 1), ("B", 2), ("C", 3)] {
        queue.enqueue(&envelope(task_id, action_id)).await.unwrap();
    }

    let mut observed = Vec::new();
    for _ in 0..3 {
        let env = queue
            .dequeue(Duration::from_secs(1))
            .await
            .unwrap()
            .expect("queued envelope");
        observed.push(env.task_id);
    }
    assert_eq!(observed, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn dequeue_times_out_on_empty_queue() {
    let queue = SqliteQueue::new(common::migrated_pool().await);

    let started = std::time::Instant::now();
    let result = queue.dequeue(Duration::from_millis(150)).await.unwrap();
    assert!(result.is_none());
    assert!(started.elapsed() >= Duration::from_millis(140));
}

#[tokio::test]
async fn enqueue_wakes_a_blocked_consumer() {
    let queue = Arc::new(SqliteQueue::new(common::migrated_pool().await));

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.dequeue(Duration::from_secs(5)).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.enqueue(&envelope("wake", 1)).await.unwrap();

    let dequeued = consumer.await.unwrap().unwrap().expect("envelope");
    assert_eq!(dequeued.task_id, "wake");
}

#[tokio::test]
async fn counters_track_operations() {
    let queue = SqliteQueue::new(common::migrated_pool().await);

    queue.enqueue(&envelope("A", 1)).await.unwrap();
    queue.enqueue(&envelope("B", 2)).await.unwrap();
    let env = queue
        .dequeue(Duration::from_secs(1))
        .await
        .unwrap()
        .expect("envelope");
    queue.record_completed(&env.task_id);

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.tasks_enqueued, 2);
    assert_eq!(stats.tasks_dequeued, 1);
    assert_eq!(stats.tasks_completed, 1);
    assert_eq!(stats.tasks_failed, 0);
    assert_eq!(stats.queue_length, 1);
    assert_eq!(stats.last_processed_task.as_deref(), Some("A"));
}

#[tokio::test]
async fn unclaimed_envelopes_survive_a_reopen() {
    let (_dir, db_path) = common::temp_db_path();
    let config = DatabaseConfig {
        path: db_path.display().to_string(),
        max_connections: 5,
    };

    {
        let store = SqliteStore::open(&config).await.unwrap();
        let pool = store.pool();
        let queue = SqliteQueue::new(pool.clone());
        queue.enqueue(&envelope("survivor", 9)).await.unwrap();
        pool.close().await;
    }

    let store = SqliteStore::open(&config).await.unwrap();
    let queue = SqliteQueue::new(store.pool());
    let env = queue
        .dequeue(Duration::from_secs(1))
        .await
        .unwrap()
        .expect("surviving envelope");
    assert_eq!(env.task_id, "survivor");
    assert_eq!(env.action_id, 9);
}

#[tokio::test]
async fn concurrent_consumers_each_get_distinct_envelopes() {
    let queue = Arc::new(SqliteQueue::new(common::migrated_pool().await));
    for i in 0..8 {
        queue
            .enqueue(&envelope(&format!("task-{i}"), i))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(env) = queue.dequeue(Duration::from_millis(200)).await.unwrap() {
                seen.push(env.task_id);
            }
            seen
        }));
    }

    let mut all: Vec<String> = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort();
    let expected: Vec<String> = (0..8).map(|i| format!("task-{i}")).collect();
    let mut expected_sorted = expected.clone();
    expected_sorted.sort();
    assert_eq!(all, expected_sorted);
}
