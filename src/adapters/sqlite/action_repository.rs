//! SQLite implementation of the ActionRepository.
//!
//! Every status transition is an optimistic compare-and-set: the UPDATE
//! carries the expected current status in its WHERE clause, so racing
//! writers resolve to exactly one winner and the losers see Conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ActionRecord, ActionStatus};
use crate::domain::ports::{
    ActionFilter, ActionRepository, DEFAULT_ACTION_LIST_LIMIT, MAX_ACTION_LIST_LIMIT,
};

const MAX_FIELD_LEN: usize = 255;

#[derive(Clone)]
pub struct SqliteActionRepository {
    pool: SqlitePool,
}

impl SqliteActionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// CAS transition helper. Returns Conflict when the record exists but is
    /// not in `from`, NotFound when it does not exist at all.
    async fn transition(
        &self,
        id: i64,
        from: ActionStatus,
        to: ActionStatus,
        details: Option<&str>,
        last_error: Option<&str>,
        bump_attempts: bool,
    ) -> DomainResult<()> {
        let attempts_expr = if bump_attempts {
            "attempts + 1"
        } else {
            "attempts"
        };
        let query = format!(
            "UPDATE actions SET status = ?, updated_at = ?, attempts = {attempts_expr},
             details = COALESCE(?, details), last_error = COALESCE(?, last_error)
             WHERE id = ? AND status = ?"
        );

        let result = sqlx::query(&query)
            .bind(to.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(details)
            .bind(last_error)
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Distinguish a lost race from a missing record.
            return match self.get(id).await {
                Ok(_) => Err(DomainError::conflict("action", id.to_string())),
                Err(e) => Err(e),
            };
        }
        Ok(())
    }
}

#[async_trait]
impl ActionRepository for SqliteActionRepository {
    async fn create(
        &self,
        target: &str,
        action: &str,
        details: Option<&str>,
    ) -> DomainResult<ActionRecord> {
        if target.is_empty() || target.len() > MAX_FIELD_LEN {
            return Err(DomainError::Validation(format!(
                "action target must be 1..{MAX_FIELD_LEN} characters"
            )));
        }
        if action.is_empty() || action.len() > MAX_FIELD_LEN {
            return Err(DomainError::Validation(format!(
                "action name must be 1..{MAX_FIELD_LEN} characters"
            )));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO actions (target, action, status, details, started_at, updated_at, attempts)
             VALUES (?, ?, 'pending', ?, ?, ?, 1)",
        )
        .bind(target)
        .bind(action)
        .bind(details)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get(result.last_insert_rowid()).await
    }

    async fn claim(&self, id: i64) -> DomainResult<ActionRecord> {
        self.transition(id, ActionStatus::Pending, ActionStatus::Running, None, None, false)
            .await?;
        self.get(id).await
    }

    async fn mark_completed(&self, id: i64, details: Option<&str>) -> DomainResult<()> {
        self.transition(
            id,
            ActionStatus::Running,
            ActionStatus::Completed,
            details,
            None,
            false,
        )
        .await
    }

    async fn mark_failed(&self, id: i64, error: &str) -> DomainResult<()> {
        self.transition(
            id,
            ActionStatus::Running,
            ActionStatus::Failed,
            None,
            Some(error),
            false,
        )
        .await
    }

    async fn mark_pending_retry(&self, id: i64, error: &str) -> DomainResult<()> {
        self.transition(
            id,
            ActionStatus::Running,
            ActionStatus::Pending,
            None,
            Some(error),
            true,
        )
        .await
    }

    async fn cancel(&self, id: i64) -> DomainResult<()> {
        self.transition(id, ActionStatus::Pending, ActionStatus::Cancelled, None, None, false)
            .await
    }

    async fn get(&self, id: i64) -> DomainResult<ActionRecord> {
        let row = sqlx::query("SELECT * FROM actions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row_to_record(&row),
            None => Err(DomainError::not_found("action", id.to_string())),
        }
    }

    async fn list(&self, filter: ActionFilter) -> DomainResult<Vec<ActionRecord>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_ACTION_LIST_LIMIT)
            .min(MAX_ACTION_LIST_LIMIT);

        let mut query = String::from("SELECT * FROM actions WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(target) = &filter.target {
            query.push_str(" AND target = ?");
            bindings.push(target.clone());
        }
        query.push_str(" ORDER BY id DESC LIMIT ?");

        let mut q = sqlx::query(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }
        q = q.bind(i64::from(limit));

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn count_by_status(&self) -> DomainResult<HashMap<ActionStatus, u64>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM actions GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for row in rows {
            let raw: String = row.get("status");
            let n: i64 = row.get("n");
            if let Some(status) = ActionStatus::from_str(&raw) {
                counts.insert(status, n.unsigned_abs());
            }
        }
        Ok(counts)
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> DomainResult<ActionRecord> {
    let status_raw: String = row.get("status");
    let status = ActionStatus::from_str(&status_raw)
        .ok_or_else(|| DomainError::Internal(format!("unknown action status `{status_raw}`")))?;
    let attempts: i64 = row.get("attempts");

    Ok(ActionRecord {
        id: row.get("id"),
        target: row.get("target"),
        action: row.get("action"),
        status,
        details: row.get("details"),
        started_at: parse_ts(&row.get::<String, _>("started_at"))?,
        updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
        attempts: u32::try_from(attempts.max(0)).unwrap_or(u32::MAX),
        last_error: row.get("last_error"),
    })
}

fn parse_ts(raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DomainError::Serialization(format!("bad timestamp `{raw}`: {e}")))
}
