//! Remediation action records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a remediation action.
///
/// Transitions form a DAG: `pending -> running` (claim), `running ->
/// completed | failed`, `running -> pending` (transient failure, attempts
/// incremented), `pending -> cancelled`. Completed, failed and cancelled
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> &'static [ActionStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Pending],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// A requested remediation against a target, tracked across its lifecycle.
///
/// `id` is assigned by the repository and never reused. Everything except
/// `status`, `details`, `updated_at`, `attempts` and `last_error` is
/// immutable after creation. `attempts` counts scheduled deliveries: it
/// starts at 1 and only the transient-failure transition increments it, so
/// it always matches the attempt number of the newest envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: i64,
    pub target: String,
    pub action: String,
    pub status: ActionStatus,
    pub details: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}
