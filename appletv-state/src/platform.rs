//! Boundary to the host home-automation platform

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// A capability value as the platform stores it
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CapabilityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CapabilityValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityValue::Bool(b) => write!(f, "{b}"),
            CapabilityValue::Number(n) => write!(f, "{n}"),
            CapabilityValue::String(s) => write!(f, "{s:?}"),
            CapabilityValue::Null => f.write_str("null"),
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        CapabilityValue::Bool(value)
    }
}

impl From<f64> for CapabilityValue {
    fn from(value: f64) -> Self {
        CapabilityValue::Number(value)
    }
}

impl From<&str> for CapabilityValue {
    fn from(value: &str) -> Self {
        CapabilityValue::String(value.to_string())
    }
}

impl From<String> for CapabilityValue {
    fn from(value: String) -> Self {
        CapabilityValue::String(value)
    }
}

/// Failure reported by the host platform
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Platform error: {0}")]
pub struct PlatformError(pub String);

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Device-level surface the host exposes to one device instance
#[async_trait]
pub trait Platform: Send + Sync {
    /// Capability names the platform currently has for this device
    async fn capabilities(&self) -> Vec<String>;

    async fn add_capability(&self, name: &str) -> PlatformResult<()>;

    async fn remove_capability(&self, name: &str) -> PlatformResult<()>;

    async fn set_capability_value(&self, name: &str, value: CapabilityValue) -> PlatformResult<()>;

    /// Write several values as one observable change
    async fn set_capability_values(&self, values: Vec<(String, CapabilityValue)>) -> PlatformResult<()>;

    async fn create_image(&self) -> PlatformResult<Box<dyn Image>>;

    async fn set_album_art(&self, image: &dyn Image) -> PlatformResult<()>;

    async fn set_unavailable(&self, reason: &str) -> PlatformResult<()>;

    async fn set_available(&self) -> PlatformResult<()>;
}

/// An image registered with the platform
#[async_trait]
pub trait Image: Send + Sync {
    fn id(&self) -> &str;

    /// Point the image at a remote URL; `None` shows the platform placeholder
    async fn set_url(&self, url: Option<&Url>) -> PlatformResult<()>;

    async fn set_bytes(&self, bytes: &[u8]) -> PlatformResult<()>;

    /// Tell the platform the image content changed
    async fn update(&self) -> PlatformResult<()>;

    async fn unregister(&self) -> PlatformResult<()>;
}
