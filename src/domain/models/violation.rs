//! Transient evaluation outputs: violations and remediation intents.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::models::policy::{ActionKind, Severity};

/// Evidence that a policy's condition held for one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub policy_name: String,
    pub severity: Severity,
    pub description: String,
    /// Concrete target resolved from the evaluation context.
    pub target: String,
    pub timestamp: DateTime<Utc>,
}

/// A remediation the engine wants executed. Emission already passed the
/// cooldown gate; the dispatcher turns intents into action records and
/// queue envelopes.
#[derive(Debug, Clone, Serialize)]
pub struct ActionIntent {
    pub action: ActionKind,
    pub target: String,
    pub severity: Severity,
    pub params: Map<String, Value>,
}
