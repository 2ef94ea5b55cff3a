//! Ports: interfaces the core exposes toward its collaborators.

pub mod action_repository;
pub mod clock;
pub mod metric_repository;
pub mod queue;
pub mod remediator;

pub use action_repository::{
    ActionFilter, ActionRepository, DEFAULT_ACTION_LIST_LIMIT, MAX_ACTION_LIST_LIMIT,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use metric_repository::MetricRepository;
pub use queue::{QueueStats, RemediationQueue};
pub use remediator::{RemediationOutcome, Remediator};
