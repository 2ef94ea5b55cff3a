//! Metric repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{MetricSample, StoredMetric};

/// Repository interface for telemetry sample persistence.
#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// Persist a sample and return its assigned id.
    async fn insert(&self, sample: &MetricSample) -> DomainResult<i64>;

    /// Samples with an id strictly greater than `cursor`, oldest first,
    /// bounded by `limit`. Drives the scheduled re-evaluation runner.
    async fn since_id(&self, cursor: i64, limit: u32) -> DomainResult<Vec<StoredMetric>>;

    /// Total persisted samples.
    async fn count(&self) -> DomainResult<u64>;
}
