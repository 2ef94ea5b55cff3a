//! SQLite adapters: the shared store, repositories, and the durable
//! remediation queue.

pub mod action_repository;
pub mod metric_repository;
pub mod queue;
pub mod store;

pub use action_repository::SqliteActionRepository;
pub use metric_repository::SqliteMetricRepository;
pub use queue::SqliteQueue;
pub use store::{SqliteStore, StoreError};
