//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid host address: {0}")]
    InvalidHost(String),

    #[error("Timeout out of range")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Database pool size must be at least 1")]
    InvalidPoolSize,

    #[error("Database pool size exceeds maximum allowed ({0})")]
    PoolSizeTooLarge(u32),

    #[error("Sweep interval must be at least one second")]
    InvalidSweepInterval,

    #[error("Sweep page size must be between 1 and 10000")]
    InvalidSweepPageSize,

    #[error("Scheduler token must not be empty")]
    EmptySchedulerToken,

    #[error("Invalid session entry: {0}")]
    InvalidSessionEntry(String),

    #[error("Static sessions are not allowed in production")]
    StaticSessionsInProduction,
}
