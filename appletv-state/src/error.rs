//! Error types for appletv-state

use appletv_api::ApiError;
use appletv_archive::ArchiveError;
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors raised while reconciling one event
///
/// None of these end the event stream; the caller logs them and moves on.
#[derive(Error, Debug)]
pub enum StateError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A channel call made on behalf of an event failed
    #[error("Channel error: {0}")]
    Api(#[from] ApiError),

    /// A now-playing blob could not be decoded
    #[error("Now-playing blob dropped: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for appletv-state operations
pub type Result<T> = std::result::Result<T, StateError>;
