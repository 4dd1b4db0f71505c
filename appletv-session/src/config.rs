//! Configuration for session establishment and upkeep

use std::time::Duration;

use crate::error::{Result, SessionError};

/// Configuration for a [`crate::SessionOrchestrator`]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay before each reconnect attempt after an unexpected disconnect
    /// Default: 1 second
    pub reconnect_delay: Duration,

    /// Keepalive period on the realtime control channel, `None` disables it
    /// Default: 15 seconds
    pub keepalive_interval: Option<Duration>,

    /// How long to wait for a discovery result per channel
    /// Default: 30 seconds
    pub resolve_timeout: Duration,

    /// Controller name announced to the accessory
    /// Default: "Home Bridge"
    pub client_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            keepalive_interval: Some(Duration::from_secs(15)),
            resolve_timeout: Duration::from_secs(30),
            client_name: "Home Bridge".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay == Duration::ZERO {
            return Err(SessionError::Configuration(
                "Reconnect delay must be greater than 0".to_string(),
            ));
        }

        if self.keepalive_interval == Some(Duration::ZERO) {
            return Err(SessionError::Configuration(
                "Keepalive interval must be greater than 0 when enabled".to_string(),
            ));
        }

        if self.resolve_timeout == Duration::ZERO {
            return Err(SessionError::Configuration(
                "Resolve timeout must be greater than 0".to_string(),
            ));
        }

        if self.client_name.trim().is_empty() {
            return Err(SessionError::Configuration(
                "Client name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }
}
