//! Policy domain model: named rules pairing a condition with an action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::condition::Condition;

pub const MAX_TARGET_LEN: usize = 255;

/// Severity attached to a policy and its violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Warning
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Remediation verb a policy requests when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    ScaleUp,
    Restart,
    DrainPod,
    Custom,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScaleUp => "scale-up",
            Self::Restart => "restart",
            Self::DrainPod => "drain-pod",
            Self::Custom => "custom",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scale-up" => Some(Self::ScaleUp),
            "restart" => Some(Self::Restart),
            "drain-pod" => Some(Self::DrainPod),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A named, enable-able rule. Owned exclusively by the registry; callers
/// receive clones and never observe partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub severity: Severity,

    /// Target glob: a literal, `*`, `prefix-*`, `*-suffix`, or the alias
    /// `all` (equivalent to `*`).
    pub target: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub auto_remediate: bool,

    pub condition: Condition,

    pub action: ActionKind,

    /// Opaque parameters forwarded to the remediator verbatim.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Minimum seconds between successive firings for one target.
    #[serde(default)]
    pub cooldown_seconds: u64,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

impl Policy {
    /// Validate the policy against the admission contract.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.is_empty() {
            return Err(DomainError::Validation("policy name is empty".into()));
        }
        validate_target_pattern(&self.target)?;
        self.condition.validate()
    }
}

/// Partial update applied by the registry; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyPatch {
    pub description: Option<String>,
    pub severity: Option<Severity>,
    pub target: Option<String>,
    pub enabled: Option<bool>,
    pub auto_remediate: Option<bool>,
    pub condition: Option<Condition>,
    pub params: Option<Map<String, Value>>,
    pub cooldown_seconds: Option<u64>,
}

/// Declarative policy source document, reloaded transactionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl PolicyDocument {
    pub fn from_yaml(raw: &str) -> DomainResult<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Validate a target pattern at policy admission.
///
/// Recognized forms: `all`, `*`, `prefix-*`, `*-suffix`, or a literal with
/// no wildcard. A `*` anywhere else is rejected.
pub fn validate_target_pattern(pattern: &str) -> DomainResult<()> {
    if pattern.is_empty() {
        return Err(DomainError::Validation("target pattern is empty".into()));
    }
    if pattern.len() > MAX_TARGET_LEN {
        return Err(DomainError::Validation(format!(
            "target pattern exceeds {MAX_TARGET_LEN} characters"
        )));
    }
    let stars = pattern.matches('*').count();
    let valid = match stars {
        0 => true,
        1 => pattern == "*" || pattern.starts_with('*') || pattern.ends_with('*'),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "unsupported target pattern `{pattern}`"
        )))
    }
}

/// Glob match between a policy target pattern and a concrete target.
///
/// Case-sensitive. `all` and `*` match any non-empty target; `prefix-*`
/// matches by prefix, `*-suffix` by suffix; anything else is a literal.
pub fn target_matches(pattern: &str, target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    if pattern == "all" || pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        if !prefix.contains('*') {
            return target.starts_with(prefix);
        }
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if !suffix.contains('*') {
            return target.ends_with(suffix);
        }
    }
    pattern == target
}
