use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::WardenConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_concurrent: {0}. Must be between 1 and 64")]
    InvalidMaxConcurrent(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Remediator URL cannot be empty")]
    EmptyRemediatorUrl,

    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid backoff configuration: base_delay_ms ({0}) must be less than max_delay_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid exponential_base: {0}. Must be greater than 1.0")]
    InvalidExponentialBase(f64),

    #[error("Invalid failure_threshold: {0}. Cannot be 0")]
    InvalidFailureThreshold(u32),

    #[error("Invalid runner interval: {0}. Cannot be 0")]
    InvalidRunnerInterval(u64),

    #[error("Invalid runner batch_size: {0}. Must be between 1 and 10000")]
    InvalidRunnerBatchSize(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .warden/config.yaml (project config)
    /// 3. .warden/local.yaml (project local overrides, optional)
    /// 4. Environment variables (WARDEN_* prefix, highest priority)
    pub fn load() -> Result<WardenConfig> {
        let config: WardenConfig = Figment::new()
            .merge(Serialized::defaults(WardenConfig::default()))
            .merge(Yaml::file(".warden/config.yaml"))
            .merge(Yaml::file(".warden/local.yaml"))
            .merge(Env::prefixed("WARDEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<WardenConfig> {
        let config: WardenConfig = Figment::new()
            .merge(Serialized::defaults(WardenConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("WARDEN_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &WardenConfig) -> Result<(), ConfigError> {
        if config.workers.max_concurrent == 0 || config.workers.max_concurrent > 64 {
            return Err(ConfigError::InvalidMaxConcurrent(
                config.workers.max_concurrent,
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        if config.remediator.url.is_empty() {
            return Err(ConfigError::EmptyRemediatorUrl);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.retry.base_delay_ms >= config.retry.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.base_delay_ms,
                config.retry.max_delay_ms,
            ));
        }

        if config.retry.exponential_base <= 1.0 {
            return Err(ConfigError::InvalidExponentialBase(
                config.retry.exponential_base,
            ));
        }

        if config.breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(
                config.breaker.failure_threshold,
            ));
        }

        if config.runner.interval_seconds == 0 {
            return Err(ConfigError::InvalidRunnerInterval(
                config.runner.interval_seconds,
            ));
        }

        if config.runner.batch_size == 0 || config.runner.batch_size > 10_000 {
            return Err(ConfigError::InvalidRunnerBatchSize(config.runner.batch_size));
        }

        Ok(())
    }
}
