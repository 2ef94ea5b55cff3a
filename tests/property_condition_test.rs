//! Property-based tests for the condition evaluator and target matching.

use proptest::prelude::*;
use std::collections::HashMap;

use warden::domain::models::{target_matches, Condition};

fn arb_metric_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("cpu".to_string()),
        Just("mem".to_string()),
        Just("disk".to_string()),
        Just("load".to_string()),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Condition> {
    (arb_metric_name(), -1000.0f64..1000.0, any::<bool>()).prop_map(
        |(metric, threshold, exceeds)| {
            if exceeds {
                Condition::MetricExceeds { metric, threshold }
            } else {
                Condition::MetricBelow { metric, threshold }
            }
        },
    )
}

fn arb_condition() -> impl Strategy<Value = Condition> {
    arb_leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|conditions| Condition::All { conditions }),
            prop::collection::vec(inner, 0..4).prop_map(|conditions| Condition::Any { conditions }),
        ]
    })
}

fn arb_metrics() -> impl Strategy<Value = HashMap<String, f64>> {
    prop::collection::hash_map(arb_metric_name(), -1000.0f64..1000.0, 0..4)
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(tree in arb_condition(), metrics in arb_metrics()) {
        prop_assert_eq!(tree.evaluate(&metrics), tree.evaluate(&metrics));
    }

    #[test]
    fn evaluation_never_mutates_inputs(tree in arb_condition(), metrics in arb_metrics()) {
        let before = metrics.clone();
        let _ = tree.evaluate(&metrics);
        prop_assert_eq!(before, metrics);
    }

    #[test]
    fn all_matches_iterator_semantics(children in prop::collection::vec(arb_leaf(), 0..6), metrics in arb_metrics()) {
        let expected = !children.is_empty() && children.iter().all(|c| c.evaluate(&metrics));
        let tree = Condition::All { conditions: children };
        prop_assert_eq!(tree.evaluate(&metrics), expected);
    }

    #[test]
    fn any_matches_iterator_semantics(children in prop::collection::vec(arb_leaf(), 0..6), metrics in arb_metrics()) {
        let expected = children.iter().any(|c| c.evaluate(&metrics));
        let tree = Condition::Any { conditions: children };
        prop_assert_eq!(tree.evaluate(&metrics), expected);
    }

    #[test]
    fn exceeds_and_below_are_disjoint_at_equal_threshold(
        name in arb_metric_name(),
        value in -1000.0f64..1000.0,
    ) {
        let metrics = HashMap::from([(name.clone(), value)]);
        let exceeds = Condition::MetricExceeds { metric: name.clone(), threshold: value };
        let below = Condition::MetricBelow { metric: name, threshold: value };
        prop_assert!(!exceeds.evaluate(&metrics));
        prop_assert!(!below.evaluate(&metrics));
    }

    #[test]
    fn condition_survives_json_round_trip(tree in arb_condition(), metrics in arb_metrics()) {
        let raw = serde_json::to_string(&tree).unwrap();
        let back: Condition = serde_json::from_str(&raw).unwrap();
        prop_assert_eq!(tree.evaluate(&metrics), back.evaluate(&metrics));
    }
}

fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

/// Targets shaped like production identifiers: bare or dashed pairs, so the
/// glob branches are actually exercised.
fn arb_target() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_segment(),
        (arb_segment(), arb_segment()).prop_map(|(a, b)| format!("{a}-{b}")),
    ]
}

proptest! {
    #[test]
    fn wildcard_matches_everything_non_empty(target in arb_target()) {
        prop_assert!(target_matches("*", &target));
        prop_assert!(target_matches("all", &target));
    }

    #[test]
    fn prefix_glob_agrees_with_starts_with(prefix in arb_segment(), target in arb_target()) {
        let pattern = format!("{prefix}-*");
        let expected = target.starts_with(&format!("{prefix}-"));
        prop_assert_eq!(target_matches(&pattern, &target), expected);
    }

    #[test]
    fn suffix_glob_agrees_with_ends_with(suffix in arb_segment(), target in arb_target()) {
        let pattern = format!("*-{suffix}");
        let expected = target.ends_with(&format!("-{suffix}"));
        prop_assert_eq!(target_matches(&pattern, &target), expected);
    }

    #[test]
    fn literal_patterns_match_only_themselves(
        pattern in arb_target().prop_filter("`all` is a wildcard alias", |p| p != "all"),
        target in arb_target(),
    ) {
        prop_assert_eq!(target_matches(&pattern, &target), pattern == target);
    }
}
