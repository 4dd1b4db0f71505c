//! Error types for endpoint resolution.

use std::time::Duration;

use thiserror::Error;

use crate::ServiceKind;

/// Error type for discovery operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    /// No matching result was seen within the resolve timeout
    #[error("Timed out after {timeout:?} waiting for {service} result for device {id}")]
    Timeout {
        service: ServiceKind,
        id: String,
        timeout: Duration,
    },

    /// The resolver stopped publishing results
    #[error("Discovery results for {service} are no longer available")]
    Closed { service: ServiceKind },
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
