//! In-memory authoritative policy set.
//!
//! Readers take point-in-time snapshots behind an `Arc` swap, so listing
//! never blocks a writer and never observes a half-applied mutation.
//! Mutations clone the current set, edit the clone, and swap it in under
//! the write lock.

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    validate_target_pattern, Policy, PolicyDocument, PolicyPatch, Severity,
};

pub struct PolicyRegistry {
    policies: RwLock<Arc<Vec<Policy>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Point-in-time snapshot in insertion order.
    pub fn snapshot(&self) -> Arc<Vec<Policy>> {
        self.policies.read().expect("registry lock poisoned").clone()
    }

    pub fn list(&self) -> Vec<Policy> {
        self.snapshot().as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn get(&self, name: &str) -> DomainResult<Policy> {
        self.snapshot()
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| DomainError::not_found("policy", name))
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<Policy> {
        self.snapshot()
            .iter()
            .filter(|p| p.severity == severity)
            .cloned()
            .collect()
    }

    pub fn insert(&self, policy: Policy) -> DomainResult<()> {
        policy.validate()?;
        let mut guard = self.policies.write().expect("registry lock poisoned");
        if guard.iter().any(|p| p.name == policy.name) {
            return Err(DomainError::AlreadyExists(policy.name));
        }
        let mut next = guard.as_ref().clone();
        info!(policy = %policy.name, "policy inserted");
        next.push(policy);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Merge recognized patch fields into an existing policy atomically.
    pub fn update(&self, name: &str, patch: PolicyPatch) -> DomainResult<Policy> {
        let mut guard = self.policies.write().expect("registry lock poisoned");
        let mut next = guard.as_ref().clone();
        let slot = next
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| DomainError::not_found("policy", name))?;

        let mut updated = slot.clone();
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(severity) = patch.severity {
            updated.severity = severity;
        }
        if let Some(target) = patch.target {
            validate_target_pattern(&target)?;
            updated.target = target;
        }
        if let Some(enabled) = patch.enabled {
            updated.enabled = enabled;
        }
        if let Some(auto_remediate) = patch.auto_remediate {
            updated.auto_remediate = auto_remediate;
        }
        if let Some(condition) = patch.condition {
            condition.validate()?;
            updated.condition = condition;
        }
        if let Some(params) = patch.params {
            updated.params = params;
        }
        if let Some(cooldown_seconds) = patch.cooldown_seconds {
            updated.cooldown_seconds = cooldown_seconds;
        }

        *slot = updated.clone();
        *guard = Arc::new(next);
        info!(policy = %name, "policy updated");
        Ok(updated)
    }

    pub fn delete(&self, name: &str) -> DomainResult<()> {
        let mut guard = self.policies.write().expect("registry lock poisoned");
        if !guard.iter().any(|p| p.name == name) {
            return Err(DomainError::not_found("policy", name));
        }
        let next: Vec<Policy> = guard.iter().filter(|p| p.name != name).cloned().collect();
        *guard = Arc::new(next);
        info!(policy = %name, "policy deleted");
        Ok(())
    }

    pub fn enable(&self, name: &str) -> DomainResult<()> {
        self.set_enabled(name, true)
    }

    pub fn disable(&self, name: &str) -> DomainResult<()> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> DomainResult<()> {
        let mut guard = self.policies.write().expect("registry lock poisoned");
        let mut next = guard.as_ref().clone();
        let slot = next
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| DomainError::not_found("policy", name))?;
        slot.enabled = enabled;
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace the registry contents transactionally.
    ///
    /// Every entry of the document is validated up front; any failure
    /// leaves the registry untouched and names the offending policies.
    pub fn reload(&self, document: PolicyDocument) -> DomainResult<usize> {
        let mut rejected: Vec<String> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();

        for policy in &document.policies {
            if policy.validate().is_err() {
                rejected.push(policy.name.clone());
            }
            if seen.contains(&policy.name.as_str()) {
                rejected.push(format!("{} (duplicate)", policy.name));
            }
            seen.push(policy.name.as_str());
        }

        if !rejected.is_empty() {
            return Err(DomainError::Validation(format!(
                "policy reload rejected: {}",
                rejected.join(", ")
            )));
        }

        let count = document.policies.len();
        let mut guard = self.policies.write().expect("registry lock poisoned");
        *guard = Arc::new(document.policies);
        info!(policies = count, "policy registry reloaded");
        Ok(count)
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ActionKind, Condition};
    use chrono::Utc;
    use serde_json::Map;

    fn policy(name: &str) -> Policy {
        Policy {
            name: name.to_string(),
            description: String::new(),
            severity: Severity::Warning,
            target: "all".to_string(),
            enabled: true,
            auto_remediate: false,
            condition: Condition::MetricExceeds {
                metric: "cpu".to_string(),
                threshold: 80.0,
            },
            action: ActionKind::Restart,
            params: Map::new(),
            cooldown_seconds: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("a")).unwrap();
        assert_eq!(registry.get("a").unwrap().name, "a");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("a")).unwrap();
        assert!(matches!(
            registry.insert(policy("a")),
            Err(DomainError::AlreadyExists(_))
        ));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let registry = PolicyRegistry::new();
        for name in ["c", "a", "b"] {
            registry.insert(policy(name)).unwrap();
        }
        let names: Vec<String> = registry.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let registry = PolicyRegistry::new();
        assert!(matches!(
            registry.delete("ghost"),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn update_merges_only_patched_fields() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("a")).unwrap();

        let updated = registry
            .update(
                "a",
                PolicyPatch {
                    severity: Some(Severity::Critical),
                    cooldown_seconds: Some(90),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.severity, Severity::Critical);
        assert_eq!(updated.cooldown_seconds, 90);
        assert_eq!(updated.target, "all");
    }

    #[test]
    fn update_validates_patched_target() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("a")).unwrap();
        let result = registry.update(
            "a",
            PolicyPatch {
                target: Some("we*rd".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(registry.get("a").unwrap().target, "all");
    }

    #[test]
    fn enable_disable_round_trip() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("a")).unwrap();
        registry.disable("a").unwrap();
        assert!(!registry.get("a").unwrap().enabled);
        registry.enable("a").unwrap();
        assert!(registry.get("a").unwrap().enabled);
        assert!(registry.enable("ghost").is_err());
    }

    #[test]
    fn by_severity_filters() {
        let registry = PolicyRegistry::new();
        let mut critical = policy("crit");
        critical.severity = Severity::Critical;
        registry.insert(policy("warn")).unwrap();
        registry.insert(critical).unwrap();
        let filtered = registry.by_severity(Severity::Critical);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "crit");
    }

    #[test]
    fn reload_swaps_contents() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("old")).unwrap();

        let document = PolicyDocument {
            policies: vec![policy("new-1"), policy("new-2")],
        };
        assert_eq!(registry.reload(document).unwrap(), 2);
        assert!(registry.get("old").is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn invalid_reload_leaves_registry_unchanged_and_names_offenders() {
        let registry = PolicyRegistry::new();
        registry.insert(policy("keep")).unwrap();

        let mut bad = policy("broken");
        bad.target = "a*b".to_string();
        let document = PolicyDocument {
            policies: vec![policy("fine"), bad],
        };

        let err = registry.reload(document).unwrap_err();
        match err {
            DomainError::Validation(message) => assert!(message.contains("broken")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(registry.len(), 1);
        assert!(registry.get("keep").is_ok());
    }

    #[test]
    fn reload_rejects_duplicate_names() {
        let registry = PolicyRegistry::new();
        let document = PolicyDocument {
            policies: vec![policy("dup"), policy("dup")],
        };
        assert!(registry.reload(document).is_err());
        assert!(registry.is_empty());
    }
}
