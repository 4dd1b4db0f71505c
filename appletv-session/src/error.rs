//! Error types for session establishment

use std::fmt;

use appletv_api::{ApiError, ChannelKind};
use appletv_discovery::DiscoveryError;
use thiserror::Error;

/// Step of the connect sequence a channel failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    Open,
    Connect,
    PairVerify,
    EnableEncryption,
    SystemInfo,
    TouchSessionStart,
    GenericSessionStart,
    RemoteSessionStart,
    SetupEventStream,
    SetupDataStream,
    DeviceInfoExchange,
    ConnectionState,
    ClientUpdatesConfig,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectStage::Open => "open",
            ConnectStage::Connect => "connect",
            ConnectStage::PairVerify => "pair-verify",
            ConnectStage::EnableEncryption => "enable encryption",
            ConnectStage::SystemInfo => "system info",
            ConnectStage::TouchSessionStart => "touch session start",
            ConnectStage::GenericSessionStart => "session start",
            ConnectStage::RemoteSessionStart => "remote session start",
            ConnectStage::SetupEventStream => "event stream setup",
            ConnectStage::SetupDataStream => "data stream setup",
            ConnectStage::DeviceInfoExchange => "device info exchange",
            ConnectStage::ConnectionState => "connection state",
            ConnectStage::ClientUpdatesConfig => "client updates config",
        };
        f.write_str(name)
    }
}

/// Errors that end a connect attempt
#[derive(Error, Debug)]
pub enum SessionError {
    /// Stored credentials could not be decoded
    #[error("Invalid stored credentials: {0}")]
    Credentials(#[source] ApiError),

    /// An endpoint could not be resolved in time
    #[error("Endpoint resolution failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A channel call failed
    #[error("{kind} channel failed during {stage}: {source}")]
    Channel {
        kind: ChannelKind,
        stage: ConnectStage,
        source: ApiError,
    },

    /// The accessory answered the handshake unexpectedly
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The attempt was cancelled before it finished
    #[error("Connect attempt cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SessionError {
    pub(crate) fn channel(kind: ChannelKind, stage: ConnectStage) -> impl FnOnce(ApiError) -> Self {
        move |source| SessionError::Channel { kind, stage, source }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
