//! # appletv-sdk
//!
//! Bridges Apple TV and HomePod accessories to a home-automation
//! platform's "device with capabilities" model.
//!
//! ```rust,ignore
//! use appletv_sdk::{Device, DeviceConfig, DeviceContext, DeviceKind};
//!
//! let context = DeviceContext { platform, resolver, connector };
//! let device = Device::start(DeviceKind::AppleTv, identity, context, DeviceConfig::default()).await?;
//!
//! // Platform capability writes are forwarded to the device
//! device.write_capability("remote_select", true).await?;
//! device.launch_app("com.apple.TVMusic").await?;
//!
//! device.shutdown().await?;
//! ```
//!
//! ## Lifecycle
//!
//! 1. The platform's capability set is synchronised with the device kind.
//! 2. Write listeners are registered for the command capabilities.
//! 3. The session is connected; on failure the device is marked
//!    unavailable and [`Device::start`] returns the error.
//! 4. The remote/input channel's topics are subscribed and the device is
//!    marked available.
//! 5. A task applies channel events to the platform and runs capability
//!    writes and flow actions, reconnecting whenever a channel drops.
//!
//! New devices are paired through a [`PairingSession`].
//!
//! ## Crates
//!
//! ```text
//! appletv-sdk (devices, commands, flow actions, pairing)
//!     ├── appletv-session (connect sequence, reconnect, keepalive)
//!     ├── appletv-state   (media state reconciliation, platform boundary)
//!     │     └── appletv-archive (keyed-archive lookups)
//!     ├── appletv-api     (channel traits, credentials)
//!     └── appletv-discovery (resolved endpoints)
//! ```

pub mod actions;
pub mod capabilities;
pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod kind;
pub mod logging;
pub mod pairing;

pub use actions::{ActionOutcome, AutocompleteItem, FlowAction};
pub use capabilities::{CapabilityListeners, CapabilitySynchronizer, SyncReport};
pub use commands::Invocation;
pub use config::{DeviceConfig, PairingConfig};
pub use device::{Device, DeviceContext, DeviceHandle};
pub use error::{Result, SdkError};
pub use kind::DeviceKind;
pub use logging::{init_logging, init_logging_from_env, LoggingMode};
pub use pairing::{DeviceListing, PairingDevice, PairingMessage, PairingSession, PairingView};

pub use appletv_api::{DeviceIdentity, StoredCredentials};
pub use appletv_discovery::{DiscoveryCache, DiscoveryResult, ServiceKind};
pub use appletv_state::{CapabilityValue, Image, Platform, PlatformError};

#[cfg(feature = "test-support")]
pub mod testing {
    //! Mock channels and a recording platform for host tests
    pub use appletv_api::testing::*;
    pub use appletv_state::testing::*;
}
