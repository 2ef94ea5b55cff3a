//! Telemetry sample domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};

pub const MAX_METRIC_NAME_LEN: usize = 255;

/// A single numeric telemetry sample reported by a producer.
///
/// Samples are immutable once ingested; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name, e.g. `cpu` or `disk_free_percent`.
    pub name: String,

    /// Finite numeric value.
    pub value: f64,

    /// Free-form producer tags. `target` and `host` are recognized when
    /// resolving the remediation target for a sample.
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Producer timestamp, or server receipt time when the producer
    /// omitted one.
    pub recorded_at: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        tags: HashMap<String, String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            tags,
            recorded_at,
        }
    }

    /// Validate the sample against the ingest contract.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.is_empty() {
            return Err(DomainError::Validation("metric name is empty".into()));
        }
        if self.name.len() > MAX_METRIC_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "metric name exceeds {MAX_METRIC_NAME_LEN} characters"
            )));
        }
        if !self.value.is_finite() {
            return Err(DomainError::Validation(format!(
                "metric `{}` has a non-finite value",
                self.name
            )));
        }
        Ok(())
    }

    /// Resolve the remediation target this sample speaks about, if any.
    ///
    /// The `target` tag wins over `host`; samples carrying neither evaluate
    /// without a concrete target.
    pub fn effective_target(&self) -> Option<&str> {
        self.tags
            .get("target")
            .or_else(|| self.tags.get("host"))
            .map(String::as_str)
    }
}

/// A persisted sample together with its repository-assigned id.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMetric {
    pub id: i64,
    #[serde(flatten)]
    pub sample: MetricSample,
}
