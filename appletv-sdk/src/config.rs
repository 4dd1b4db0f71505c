//! Device and pairing configuration

use std::time::Duration;

use appletv_discovery::ServiceKind;
use appletv_session::SessionConfig;
use appletv_state::ReconcilerConfig;

use crate::error::{Result, SdkError};

/// Everything a running device is configured with
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub session: SessionConfig,
    pub reconciler: ReconcilerConfig,

    /// Pending capability writes and flow actions before callers wait
    pub command_buffer: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            reconciler: ReconcilerConfig::default(),
            command_buffer: 32,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .map_err(|e| SdkError::Configuration(e.to_string()))?;
        self.reconciler
            .validate()
            .map_err(|e| SdkError::Configuration(e.to_string()))?;

        if self.command_buffer == 0 {
            return Err(SdkError::Configuration(
                "Command buffer must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_reconciler(mut self, reconciler: ReconcilerConfig) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size;
        self
    }
}

/// Pairing wizard configuration
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// How long `show_view(Discover)` listens for new results
    pub discover_window: Duration,

    /// Capacity of the wizard's message channel
    pub message_buffer: usize,

    /// Service the pair-setup ceremony runs against
    pub service: ServiceKind,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            discover_window: Duration::from_secs(1),
            message_buffer: 32,
            service: ServiceKind::RemoteInput,
        }
    }
}

impl PairingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.message_buffer == 0 {
            return Err(SdkError::Configuration(
                "Message buffer must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_discover_window(mut self, window: Duration) -> Self {
        self.discover_window = window;
        self
    }

    pub fn with_message_buffer(mut self, size: usize) -> Self {
        self.message_buffer = size;
        self
    }

    pub fn with_service(mut self, service: ServiceKind) -> Self {
        self.service = service;
        self
    }
}
