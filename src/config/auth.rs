//! Session configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;
use crate::domain::foundation::UserId;

/// Session configuration
///
/// The hosted auth service sits outside this binary. For local runs a static
/// session table can be supplied as `token=user_id` pairs separated by commas.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Static sessions, e.g. `dev-token=alice,other=bob`
    #[serde(default)]
    pub static_sessions: Option<String>,
}

impl AuthConfig {
    /// Parsed static sessions.
    pub fn sessions(&self) -> Result<Vec<(String, UserId)>, ValidationError> {
        let Some(raw) = &self.static_sessions else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (token, user) = entry
                    .split_once('=')
                    .ok_or_else(|| ValidationError::InvalidSessionEntry(entry.to_string()))?;
                let token = token.trim();
                if token.is_empty() {
                    return Err(ValidationError::InvalidSessionEntry(entry.to_string()));
                }
                let user_id = UserId::new(user.trim())
                    .map_err(|_| ValidationError::InvalidSessionEntry(entry.to_string()))?;
                Ok((token.to_string(), user_id))
            })
            .collect()
    }

    /// Validate session configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let sessions = self.sessions()?;
        if *environment == Environment::Production && !sessions.is_empty() {
            return Err(ValidationError::StaticSessionsInProduction);
        }
        Ok(())
    }
}
