use appletv_api::ApiError;
use appletv_discovery::DiscoveryError;
use appletv_session::SessionError;
use appletv_state::{PlatformError, StateError};
use thiserror::Error;

use crate::kind::DeviceKind;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Channel error: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Listener registration for a capability the platform does not have
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Invalid value {value} for capability {capability}")]
    InvalidValue { capability: String, value: String },

    #[error("{kind} does not support {action}")]
    Unsupported { kind: DeviceKind, action: &'static str },

    #[error("Device is not connected")]
    NotConnected,

    #[error("Device has been shut down")]
    DeviceStopped,

    #[error("Pairing failed: {0}")]
    Pairing(String),

    #[error("Pairing device not set")]
    NoDeviceSelected,

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Invalid pin: {0}")]
    InvalidPin(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SdkError>;
