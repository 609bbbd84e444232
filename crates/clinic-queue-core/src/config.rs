//! Session configuration.
//!
//! Resolved once when the board is opened and passed into the session; nothing
//! here is read again while gestures are being handled.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Timeouts and limits for a queue session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline for the backend to acknowledge a transition
    pub push_timeout_ms: u64,
    /// Deadline for a lane or board snapshot fetch
    pub fetch_timeout_ms: u64,
    /// Transient notices kept before the oldest is dropped
    pub max_notices: usize,
    /// Pause between full-board reload attempts after a failed reconnect
    pub reload_retry_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            push_timeout_ms: 5_000,
            fetch_timeout_ms: 10_000,
            max_notices: 20,
            reload_retry_ms: 1_000,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config. Missing keys take their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.push_timeout_ms == 0 {
            return Err(ConfigError::Invalid("push_timeout_ms must be positive".into()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be positive".into()));
        }
        if self.reload_retry_ms == 0 {
            return Err(ConfigError::Invalid("reload_retry_ms must be positive".into()));
        }
        if self.max_notices == 0 {
            return Err(ConfigError::Invalid("max_notices must be at least 1".into()));
        }
        Ok(())
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn reload_retry(&self) -> Duration {
        Duration::from_millis(self.reload_retry_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SessionConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{"push_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.push_timeout(), Duration::from_millis(250));
        assert_eq!(config.fetch_timeout_ms, 10_000);
        assert_eq!(config.max_notices, 20);
        assert_eq!(config.reload_retry(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = SessionConfig::from_json(r#"{"fetch_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            SessionConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
