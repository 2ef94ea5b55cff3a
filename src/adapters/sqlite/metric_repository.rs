//! SQLite implementation of the MetricRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MetricSample, StoredMetric};
use crate::domain::ports::MetricRepository;

#[derive(Clone)]
pub struct SqliteMetricRepository {
    pool: SqlitePool,
}

impl SqliteMetricRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricRepository for SqliteMetricRepository {
    async fn insert(&self, sample: &MetricSample) -> DomainResult<i64> {
        sample.validate()?;
        let tags_json = serde_json::to_string(&sample.tags)?;

        let result = sqlx::query(
            "INSERT INTO metrics (name, value, tags, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&sample.name)
        .bind(sample.value)
        .bind(&tags_json)
        .bind(sample.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn since_id(&self, cursor: i64, limit: u32) -> DomainResult<Vec<StoredMetric>> {
        let rows = sqlx::query(
            "SELECT id, name, value, tags, recorded_at FROM metrics
             WHERE id > ? ORDER BY id ASC LIMIT ?",
        )
        .bind(cursor)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_stored_metric).collect()
    }

    async fn count(&self) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metrics")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }
}

fn row_to_stored_metric(row: sqlx::sqlite::SqliteRow) -> DomainResult<StoredMetric> {
    let tags_json: String = row.get("tags");
    let tags: HashMap<String, String> = serde_json::from_str(&tags_json)?;
    let recorded_raw: String = row.get("recorded_at");
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_raw)
        .map_err(|e| DomainError::Serialization(format!("bad recorded_at timestamp: {e}")))?
        .with_timezone(&Utc);

    Ok(StoredMetric {
        id: row.get("id"),
        sample: MetricSample {
            name: row.get("name"),
            value: row.get("value"),
            tags,
            recorded_at,
        },
    })
}
