//! Remediator client port.

use async_trait::async_trait;

use crate::domain::models::TaskEnvelope;

/// Classified result of one remediator delivery.
///
/// Transient outcomes are eligible for re-enqueue with backoff; permanent
/// outcomes terminate the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// The remediator accepted and executed the task.
    Success { detail: Option<String> },
    /// The task can never succeed as submitted.
    Permanent { reason: String },
    /// The failure is retryable: network error, timeout, overload.
    Transient { reason: String },
}

impl RemediationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Driver for the external remediation endpoint.
#[async_trait]
pub trait Remediator: Send + Sync {
    /// Deliver one envelope. Transport errors are folded into the outcome;
    /// this call does not fail.
    async fn dispatch(&self, envelope: &TaskEnvelope) -> RemediationOutcome;
}
