use serde::{Deserialize, Serialize};

/// Main configuration structure for warden
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WardenConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Remediator endpoint configuration
    #[serde(default)]
    pub remediator: RemediatorConfig,

    /// Scheduled re-evaluation configuration
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Worker pool configuration
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker configuration
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Optional declarative policy source loaded at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<String>,

    /// Seconds to wait for in-flight dispatches during shutdown
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
}

const fn default_shutdown_timeout_seconds() -> u64 {
    30
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            remediator: RemediatorConfig::default(),
            runner: RunnerConfig::default(),
            workers: WorkerConfig::default(),
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
            logging: LoggingConfig::default(),
            policy_file: None,
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".warden/warden.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Remediator endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RemediatorConfig {
    /// Remote remediation endpoint receiving task dispatches
    #[serde(default = "default_remediator_url")]
    pub url: String,
}

fn default_remediator_url() -> String {
    "http://localhost:8080/remediate".to_string()
}

impl Default for RemediatorConfig {
    fn default() -> Self {
        Self {
            url: default_remediator_url(),
        }
    }
}

/// Scheduled re-evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Whether the periodic evaluator runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between evaluation ticks
    #[serde(default = "default_runner_interval")]
    pub interval_seconds: u64,

    /// Maximum samples drained per tick
    #[serde(default = "default_runner_batch_size")]
    pub batch_size: u32,
}

const fn default_true() -> bool {
    true
}

const fn default_runner_interval() -> u64 {
    30
}

const fn default_runner_batch_size() -> u32 {
    100
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_seconds: default_runner_interval(),
            batch_size: default_runner_batch_size(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Concurrent queue consumers
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-task bound covering the remediator round-trip
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_seconds: u64,

    /// How long one dequeue call blocks before returning empty
    #[serde(default = "default_queue_poll_timeout")]
    pub queue_poll_timeout_seconds: u64,
}

const fn default_max_concurrent() -> usize {
    5
}

const fn default_execution_timeout() -> u64 {
    30
}

const fn default_queue_poll_timeout() -> u64 {
    5
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            execution_timeout_seconds: default_execution_timeout(),
            queue_poll_timeout_seconds: default_queue_poll_timeout(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum remediator deliveries per action before terminal failure
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_exponential_base() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            exponential_base: default_exponential_base(),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BreakerConfig {
    /// Failures inside the window required to open a target's circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Sliding failure window in seconds
    #[serde(default = "default_breaker_window")]
    pub window_seconds: u64,

    /// Seconds an open circuit waits before allowing a half-open probe
    #[serde(default = "default_breaker_cooldown")]
    pub cooldown_seconds: u64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_breaker_window() -> u64 {
    300
}

const fn default_breaker_cooldown() -> u64 {
    60
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            window_seconds: default_breaker_window(),
            cooldown_seconds: default_breaker_cooldown(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for rotated log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
