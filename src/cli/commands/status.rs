//! `warden status`: queue depth and action counts from the shared store.

use anyhow::Result;
use sqlx::Row;

use crate::adapters::sqlite::SqliteActionRepository;
use crate::domain::models::{ActionStatus, WardenConfig};
use crate::domain::ports::ActionRepository;

use super::open_database;

pub async fn handle_status(config: &WardenConfig, json: bool) -> Result<()> {
    let pool = open_database(config).await?;

    let (queue_length,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM remediation_queue")
        .fetch_one(&pool)
        .await?;
    let (metric_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metrics")
        .fetch_one(&pool)
        .await?;
    let oldest_queued: Option<String> =
        sqlx::query("SELECT enqueued_at FROM remediation_queue ORDER BY id LIMIT 1")
            .fetch_optional(&pool)
            .await?
            .map(|row| row.get("enqueued_at"));

    let actions = SqliteActionRepository::new(pool);
    let counts = actions.count_by_status().await?;

    if json {
        let report = serde_json::json!({
            "queue_length": queue_length,
            "oldest_queued": oldest_queued,
            "metrics": metric_count,
            "actions": {
                "pending": counts.get(&ActionStatus::Pending).copied().unwrap_or(0),
                "running": counts.get(&ActionStatus::Running).copied().unwrap_or(0),
                "completed": counts.get(&ActionStatus::Completed).copied().unwrap_or(0),
                "failed": counts.get(&ActionStatus::Failed).copied().unwrap_or(0),
                "cancelled": counts.get(&ActionStatus::Cancelled).copied().unwrap_or(0),
            },
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("queue length:   {queue_length}");
    if let Some(oldest) = oldest_queued {
        println!("oldest queued:  {oldest}");
    }
    println!("metrics stored: {metric_count}");
    println!("actions:");
    for status in [
        ActionStatus::Pending,
        ActionStatus::Running,
        ActionStatus::Completed,
        ActionStatus::Failed,
        ActionStatus::Cancelled,
    ] {
        let count = counts.get(&status).copied().unwrap_or(0);
        println!("  {:<10} {count}", status.as_str());
    }
    Ok(())
}
