//! Error types for keyed-archive decoding

use thiserror::Error;

/// Errors that can occur while turning a blob into an object graph
///
/// Lookups themselves never fail; a missing key is reported as `None`.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The blob is not a property list
    #[error("Property list decoding failed: {0}")]
    PlistDecodingFailed(String),

    /// The property list decoded but is not a keyed archive
    #[error("Invalid archive structure: {0}")]
    InvalidArchiveStructure(String),
}

impl From<plist::Error> for ArchiveError {
    fn from(err: plist::Error) -> Self {
        ArchiveError::PlistDecodingFailed(err.to_string())
    }
}

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;
