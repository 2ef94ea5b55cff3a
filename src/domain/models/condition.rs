//! Boolean condition trees evaluated against a metric mapping.
//!
//! Conditions are parsed from policy documents as a tagged enum, so an
//! unknown condition type is rejected at parse time and can never reach
//! evaluation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};

/// Maximum nesting depth accepted at validation time.
pub const MAX_CONDITION_DEPTH: usize = 16;

/// A recursive boolean formula over `metric name -> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// True iff the metric is present and strictly greater than `threshold`.
    MetricExceeds { metric: String, threshold: f64 },

    /// True iff the metric is present and strictly less than `threshold`.
    MetricBelow { metric: String, threshold: f64 },

    /// True iff non-empty and every child is true.
    All { conditions: Vec<Condition> },

    /// True iff at least one child is true. Empty is false.
    Any { conditions: Vec<Condition> },
}

impl Condition {
    /// Evaluate the tree against a metric mapping.
    ///
    /// Pure and total: missing metric keys yield false, never an error.
    /// Short-circuits on `All`/`Any` and runs linear in the node count.
    pub fn evaluate(&self, metrics: &HashMap<String, f64>) -> bool {
        match self {
            Condition::MetricExceeds { metric, threshold } => {
                metrics.get(metric).is_some_and(|value| value > threshold)
            }
            Condition::MetricBelow { metric, threshold } => {
                metrics.get(metric).is_some_and(|value| value < threshold)
            }
            Condition::All { conditions } => {
                !conditions.is_empty() && conditions.iter().all(|c| c.evaluate(metrics))
            }
            Condition::Any { conditions } => conditions.iter().any(|c| c.evaluate(metrics)),
        }
    }

    /// Depth of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Condition::MetricExceeds { .. } | Condition::MetricBelow { .. } => 1,
            Condition::All { conditions } | Condition::Any { conditions } => {
                1 + conditions.iter().map(Condition::depth).max().unwrap_or(0)
            }
        }
    }

    /// Structural validation applied when a policy is admitted.
    pub fn validate(&self) -> DomainResult<()> {
        if self.depth() > MAX_CONDITION_DEPTH {
            return Err(DomainError::Validation(format!(
                "condition nesting exceeds depth {MAX_CONDITION_DEPTH}"
            )));
        }
        self.validate_node()
    }

    fn validate_node(&self) -> DomainResult<()> {
        match self {
            Condition::MetricExceeds { metric, threshold }
            | Condition::MetricBelow { metric, threshold } => {
                if metric.is_empty() {
                    return Err(DomainError::Validation(
                        "condition references an empty metric name".into(),
                    ));
                }
                if !threshold.is_finite() {
                    return Err(DomainError::Validation(format!(
                        "condition threshold for `{metric}` is not finite"
                    )));
                }
                Ok(())
            }
            Condition::All { conditions } | Condition::Any { conditions } => {
                for child in conditions {
                    child.validate_node()?;
                }
                Ok(())
            }
        }
    }
}
