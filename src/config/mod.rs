//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `ENTITLEMENTS` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use entitlements::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod server;
mod sweep;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use sweep::SweepConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// development setup on the in-memory store.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL; empty url selects in-memory)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Expiry sweep configuration
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Session configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `ENTITLEMENTS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENTS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ENTITLEMENTS__DATABASE__URL=...` -> `database.url = ...`
    /// - `ENTITLEMENTS__SWEEP__SCHEDULER_TOKEN=...` -> `sweep.scheduler_token`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ENTITLEMENTS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.sweep.validate()?;
        self.auth.validate(&self.server.environment)?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ENTITLEMENTS__DATABASE__URL",
        "ENTITLEMENTS__SERVER__PORT",
        "ENTITLEMENTS__SERVER__ENVIRONMENT",
        "ENTITLEMENTS__SWEEP__ENABLED",
        "ENTITLEMENTS__SWEEP__PAGE_SIZE",
        "ENTITLEMENTS__SWEEP__SCHEDULER_TOKEN",
        "ENTITLEMENTS__AUTH__STATIC_SESSIONS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        clear_env();
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(!config.database.is_configured());
        assert!(!config.sweep.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("ENTITLEMENTS__DATABASE__URL", "postgresql://test@localhost/test"),
            ("ENTITLEMENTS__SERVER__PORT", "3000"),
            ("ENTITLEMENTS__SWEEP__ENABLED", "true"),
            ("ENTITLEMENTS__SWEEP__PAGE_SIZE", "250"),
            ("ENTITLEMENTS__SWEEP__SCHEDULER_TOKEN", "cron-secret"),
        ])
        .unwrap();

        assert!(config.database.is_configured());
        assert_eq!(config.server.port, 3000);
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.page_size, 250);
        assert_eq!(
            config.sweep.scheduler_token.as_ref().unwrap().expose_secret(),
            "cron-secret"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_rejects_static_sessions() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("ENTITLEMENTS__SERVER__ENVIRONMENT", "production"),
            ("ENTITLEMENTS__AUTH__STATIC_SESSIONS", "tok=alice"),
        ])
        .unwrap();

        assert!(config.is_production());
        assert!(config.validate().is_err());
    }
}
