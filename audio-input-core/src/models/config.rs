use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Configuration for an input session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Client name announced to the audio server (default: "audio-input").
    pub client_name: String,

    /// Report every failed reconnection attempt at warn level instead of debug.
    pub verbose: bool,

    /// Delay between reconnection attempts in milliseconds (default: 500).
    pub retry_interval_ms: u64,

    /// Let the initial open start the audio server if it is not running
    /// (default: true). Reconnection attempts never start a server.
    pub start_server: bool,
}

impl SessionConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        config.validate().map_err(SessionError::InvalidConfig)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.client_name.trim().is_empty() {
            return Err("client name must not be empty".into());
        }
        if self.retry_interval_ms == 0 {
            return Err("retry interval must be positive".into());
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_name: "audio-input".into(),
            verbose: false,
            retry_interval_ms: 500,
            start_server: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_interval(), Duration::from_millis(500));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SessionConfig::from_json(r#"{ "verbose": true }"#).unwrap();
        assert!(config.verbose);
        assert_eq!(config.client_name, "audio-input");
        assert_eq!(config.retry_interval_ms, 500);
        assert!(config.start_server);
    }

    #[test]
    fn rejects_zero_retry_interval() {
        let err = SessionConfig::from_json(r#"{ "retry_interval_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_blank_client_name() {
        let config = SessionConfig {
            client_name: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(SessionConfig::from_json("{ nope").is_err());
    }
}
