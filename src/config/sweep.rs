//! Expiry sweep configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Expiry sweep configuration
///
/// The in-process scheduler is optional; an external cron can call the
/// HTTP trigger instead.
#[derive(Debug, Deserialize)]
pub struct SweepConfig {
    /// Run the in-process scheduler
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between scheduled passes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Candidates fetched per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Shared secret expected in `X-Scheduler-Token` on the HTTP trigger
    #[serde(default)]
    pub scheduler_token: Option<SecretString>,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sweep configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.page_size == 0 || self.page_size > 10_000 {
            return Err(ValidationError::InvalidSweepPageSize);
        }
        if let Some(token) = &self.scheduler_token {
            if token.expose_secret().is_empty() {
                return Err(ValidationError::EmptySchedulerToken);
            }
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            page_size: default_page_size(),
            scheduler_token: None,
        }
    }
}

fn default_interval() -> u64 {
    24 * 60 * 60
}

fn default_page_size() -> u32 {
    100
}
