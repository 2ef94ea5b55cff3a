//! Service layer: the policy engine, queue consumers, and supporting
//! machinery composed by the control plane.

pub mod circuit_breaker;
pub mod control_plane;
pub mod cooldown;
pub mod dispatch;
pub mod engine;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod telemetry;
pub mod worker;

pub use circuit_breaker::{BreakerStats, CircuitBreakerRegistry, CircuitState};
pub use control_plane::{
    ControlPlane, ControlPlaneStats, CreateActionRequest, EvaluateRequest, EvaluateResponse,
    IngestRequest, IngestResponse, TriggeredAction,
};
pub use cooldown::CooldownRegistry;
pub use dispatch::RemediationDispatcher;
pub use engine::{Evaluation, PolicyEngine};
pub use registry::PolicyRegistry;
pub use retry::RetryPolicy;
pub use runner::{Runner, RunnerStatus};
pub use telemetry::{EvalResult, Telemetry, TelemetrySnapshot};
pub use worker::WorkerPool;
