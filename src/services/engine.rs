//! Policy evaluation engine.
//!
//! Composes the registry snapshot, the condition evaluator, and the
//! cooldown registry into one deterministic pass: identical inputs against
//! the same snapshot and cooldown state produce identical outputs, in
//! snapshot (insertion) order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::models::{target_matches, ActionIntent, Violation};
use crate::domain::ports::Clock;
use crate::services::cooldown::CooldownRegistry;
use crate::services::registry::PolicyRegistry;
use crate::services::telemetry::{EvalResult, Telemetry};

/// Ordered outputs of one evaluation pass.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub violations: Vec<Violation>,
    pub intents: Vec<ActionIntent>,
}

pub struct PolicyEngine {
    registry: Arc<PolicyRegistry>,
    cooldowns: Arc<CooldownRegistry>,
    telemetry: Arc<Telemetry>,
    clock: Arc<dyn Clock>,
}

impl PolicyEngine {
    pub fn new(
        registry: Arc<PolicyRegistry>,
        cooldowns: Arc<CooldownRegistry>,
        telemetry: Arc<Telemetry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            cooldowns,
            telemetry,
            clock,
        }
    }

    /// Evaluate all enabled policies against a metric mapping.
    ///
    /// Fires cooldowns for matching pairs: a pair still cooling down yields
    /// its violation but no intent. Intents are only emitted for policies
    /// with `auto_remediate` set.
    pub fn evaluate(
        &self,
        metrics: &HashMap<String, f64>,
        target: Option<&str>,
    ) -> Evaluation {
        self.evaluate_inner(metrics, target, true)
    }

    /// Evaluation with no persistent side effects: the cooldown registry is
    /// left untouched and nothing may be enqueued from the result. Intents
    /// reflect what `evaluate` would emit right now.
    pub fn evaluate_dry_run(
        &self,
        metrics: &HashMap<String, f64>,
        target: Option<&str>,
    ) -> Evaluation {
        self.evaluate_inner(metrics, target, false)
    }

    fn evaluate_inner(
        &self,
        metrics: &HashMap<String, f64>,
        target: Option<&str>,
        commit: bool,
    ) -> Evaluation {
        if commit {
            self.cooldowns.evict_stale();
        }
        let snapshot = self.registry.snapshot();
        let mut evaluation = Evaluation::default();

        for policy in snapshot.iter().filter(|p| p.enabled) {
            if let Some(concrete) = target {
                if !target_matches(&policy.target, concrete) {
                    continue;
                }
            }

            let matched = policy.condition.evaluate(metrics);
            self.telemetry.record_policy_evaluation(
                &policy.name,
                if matched {
                    EvalResult::Matched
                } else {
                    EvalResult::Unmatched
                },
            );
            if !matched {
                continue;
            }

            let effective_target = target.unwrap_or(policy.target.as_str()).to_string();
            let cooldown = Duration::from_secs(policy.cooldown_seconds);

            let fired = if commit {
                self.cooldowns
                    .try_fire(&policy.name, &effective_target, cooldown)
            } else {
                self.cooldowns
                    .ready(&policy.name, &effective_target, cooldown)
                    .0
            };

            evaluation.violations.push(Violation {
                policy_name: policy.name.clone(),
                severity: policy.severity,
                description: policy.description.clone(),
                target: effective_target.clone(),
                timestamp: self.clock.wall(),
            });

            if !fired {
                debug!(
                    policy = %policy.name,
                    target = %effective_target,
                    "violation suppressed by cooldown"
                );
                continue;
            }

            if policy.auto_remediate {
                evaluation.intents.push(ActionIntent {
                    action: policy.action,
                    target: effective_target,
                    severity: policy.severity,
                    params: policy.params.clone(),
                });
            }
        }

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ActionKind, Condition, Policy, Severity};
    use crate::domain::ports::ManualClock;
    use chrono::Utc;
    use serde_json::Map;

    fn policy(name: &str, target: &str, auto: bool, cooldown: u64) -> Policy {
        Policy {
            name: name.to_string(),
            description: format!("{name} description"),
            severity: Severity::Critical,
            target: target.to_string(),
            enabled: true,
            auto_remediate: auto,
            condition: Condition::MetricExceeds {
                metric: "cpu".to_string(),
                threshold: 80.0,
            },
            action: ActionKind::Restart,
            params: Map::new(),
            cooldown_seconds: cooldown,
            created_at: Utc::now(),
        }
    }

    fn engine_with(policies: Vec<Policy>) -> (Arc<ManualClock>, Arc<PolicyRegistry>, PolicyEngine) {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(PolicyRegistry::new());
        for p in policies {
            registry.insert(p).unwrap();
        }
        let engine = PolicyEngine::new(
            registry.clone(),
            Arc::new(CooldownRegistry::new(clock.clone())),
            Arc::new(Telemetry::new()),
            clock.clone(),
        );
        (clock, registry, engine)
    }

    fn metrics(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), *value))
            .collect()
    }

    #[test]
    fn threshold_fires_once_per_cooldown_window() {
        let (clock, _, engine) = engine_with(vec![policy("high-cpu", "all", true, 60)]);

        let first = engine.evaluate(&metrics(&[("cpu", 95.0)]), None);
        assert_eq!(first.violations.len(), 1);
        assert_eq!(first.intents.len(), 1);

        clock.advance(Duration::from_secs(30));
        let second = engine.evaluate(&metrics(&[("cpu", 90.0)]), None);
        assert_eq!(second.violations.len(), 1);
        assert_eq!(second.intents.len(), 0);

        clock.advance(Duration::from_secs(31));
        let third = engine.evaluate(&metrics(&[("cpu", 90.0)]), None);
        assert_eq!(third.violations.len(), 1);
        assert_eq!(third.intents.len(), 1);
    }

    #[test]
    fn target_glob_scopes_policies() {
        let (_, _, engine) = engine_with(vec![policy("web-cpu", "web-*", true, 0)]);

        let matched = engine.evaluate(&metrics(&[("cpu", 99.0)]), Some("web-1"));
        assert_eq!(matched.violations.len(), 1);
        assert_eq!(matched.intents.len(), 1);
        assert_eq!(matched.intents[0].target, "web-1");

        let unmatched = engine.evaluate(&metrics(&[("cpu", 99.0)]), Some("db-1"));
        assert!(unmatched.violations.is_empty());
        assert!(unmatched.intents.is_empty());
    }

    #[test]
    fn disabled_policy_is_skipped() {
        let (_, registry, engine) = engine_with(vec![policy("high-cpu", "all", true, 0)]);
        registry.disable("high-cpu").unwrap();

        let result = engine.evaluate(&metrics(&[("cpu", 99.0)]), None);
        assert!(result.violations.is_empty());
        assert!(result.intents.is_empty());
    }

    #[test]
    fn no_intent_without_auto_remediate() {
        let (_, _, engine) = engine_with(vec![policy("observe-cpu", "all", false, 0)]);
        let result = engine.evaluate(&metrics(&[("cpu", 99.0)]), None);
        assert_eq!(result.violations.len(), 1);
        assert!(result.intents.is_empty());
    }

    #[test]
    fn violations_follow_snapshot_order() {
        let (_, _, engine) = engine_with(vec![
            policy("zeta", "all", false, 0),
            policy("alpha", "all", false, 0),
        ]);
        let result = engine.evaluate(&metrics(&[("cpu", 99.0)]), None);
        let names: Vec<&str> = result
            .violations
            .iter()
            .map(|v| v.policy_name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn dry_run_never_touches_cooldowns() {
        let (_, _, engine) = engine_with(vec![policy("high-cpu", "all", true, 60)]);

        let first = engine.evaluate_dry_run(&metrics(&[("cpu", 95.0)]), None);
        let second = engine.evaluate_dry_run(&metrics(&[("cpu", 95.0)]), None);
        assert_eq!(first.violations.len(), second.violations.len());
        assert_eq!(first.intents.len(), 1);
        assert_eq!(second.intents.len(), 1);

        // The pair is still ready for the real path afterwards.
        let committed = engine.evaluate(&metrics(&[("cpu", 95.0)]), None);
        assert_eq!(committed.intents.len(), 1);
    }

    #[test]
    fn effective_target_defaults_to_policy_pattern() {
        let (_, _, engine) = engine_with(vec![policy("high-cpu", "all", true, 0)]);
        let result = engine.evaluate(&metrics(&[("cpu", 95.0)]), None);
        assert_eq!(result.violations[0].target, "all");
        assert_eq!(result.intents[0].target, "all");
    }
}
