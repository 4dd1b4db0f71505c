use thiserror::Error;

/// Errors reported by accessory channel clients
///
/// The protocol clients behind the channel traits own their own failure
/// detail; this enum only classifies it so callers can decide whether a
/// failure is about credentials, the transport or the conversation itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// Socket could not be opened or was lost
    ///
    /// Covers refused connections, unreachable hosts and transport resets.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pair-verify or pair-setup was rejected by the accessory
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Stored credentials could not be decoded
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The accessory answered with something the client did not expect
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Encrypted framing could not be enabled
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Invalid parameter value
    ///
    /// Returned for malformed pins, identifiers or URLs before anything is sent.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation requires a connected channel
    #[error("Channel is not connected")]
    NotConnected,
}

impl From<hex::FromHexError> for ApiError {
    fn from(error: hex::FromHexError) -> Self {
        ApiError::InvalidCredentials(error.to_string())
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
