//! Warden - Self-Healing Control Plane
//!
//! Ingests numeric telemetry, evaluates dynamically reloadable policies
//! against each sample, and drives at-most-once remediations through:
//! - a policy engine with a composable condition language, target globs,
//!   and per-(policy, target) cooldowns
//! - a durable SQLite-backed FIFO of remediation envelopes
//! - a worker pool with per-target circuit breaking and jittered
//!   exponential retry against an external HTTP remediator

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::WardenConfig;
pub use services::ControlPlane;
