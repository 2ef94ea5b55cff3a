//! Action repository port.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActionRecord, ActionStatus};

/// Filter criteria for listing actions. `limit` is clamped to 500; listings
/// return newest first.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    pub status: Option<ActionStatus>,
    pub target: Option<String>,
    pub limit: Option<u32>,
}

pub const DEFAULT_ACTION_LIST_LIMIT: u32 = 50;
pub const MAX_ACTION_LIST_LIMIT: u32 = 500;

/// Repository interface for action records.
///
/// Status transitions are enforced with optimistic compare-and-set on
/// `(id, expected status)`; a lost race surfaces as
/// [`crate::domain::errors::DomainError::Conflict`]. `claim` performs the
/// `pending -> running` edge of the lifecycle DAG, so exactly one worker
/// wins each envelope.
#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// Create a pending record and return it with its assigned id.
    async fn create(
        &self,
        target: &str,
        action: &str,
        details: Option<&str>,
    ) -> DomainResult<ActionRecord>;

    /// Atomically transition `pending -> running` and return the record.
    /// Conflict when the record is in any other status.
    async fn claim(&self, id: i64) -> DomainResult<ActionRecord>;

    /// Transition `running -> completed`.
    async fn mark_completed(&self, id: i64, details: Option<&str>) -> DomainResult<()>;

    /// Transition `running -> failed` with the error recorded.
    async fn mark_failed(&self, id: i64, error: &str) -> DomainResult<()>;

    /// Transition `running -> pending` for a retry, incrementing `attempts`.
    async fn mark_pending_retry(&self, id: i64, error: &str) -> DomainResult<()>;

    /// Transition `pending -> cancelled`.
    async fn cancel(&self, id: i64) -> DomainResult<()>;

    /// Fetch a record by id.
    async fn get(&self, id: i64) -> DomainResult<ActionRecord>;

    /// List records, newest first, honoring the filter.
    async fn list(&self, filter: ActionFilter) -> DomainResult<Vec<ActionRecord>>;

    /// Count records per status.
    async fn count_by_status(&self) -> DomainResult<HashMap<ActionStatus, u64>>;
}
