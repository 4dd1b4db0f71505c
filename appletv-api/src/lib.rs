//! Channel boundary for Apple TV and HomePod accessories
//!
//! Accessories expose two channels: a realtime media-remote control channel
//! (playback state, metadata, volume) and a remote/input channel (buttons,
//! power, apps, accounts). This crate defines the typed surface of both as
//! async traits, plus the credential records that tie a device to them.
//!
//! Protocol clients implement [`ControlChannel`], [`RemoteChannel`] and
//! [`PairSetup`] and hand them out through a [`ChannelConnector`].
//!
//! # Example
//!
//! ```rust,ignore
//! use appletv_api::{Credentials, ChannelConnector};
//!
//! let channel = connector.control_channel(&endpoint)?;
//! let events = channel.connect().await?;
//! let keys = channel.pair_verify(&Credentials::from_stored(&stored)?).await?;
//! channel.enable_encryption(&keys).await?;
//! ```

pub mod channel;
pub mod control;
pub mod credentials;
pub mod error;
pub mod remote;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use channel::{
    ChannelConnector, ChannelKind, ControlChannel, EventStream, PairSetup, PairingFrame, RemoteChannel,
};
pub use control::{
    ClientUpdatesConfig, ConnectionState, ControlEvent, ControlMessage, DeviceInfo, MediaCommand,
    NowPlayingItem, PlaybackQueueRequest, PlaybackState, PlayerClient, SetStateEvent,
};
pub use credentials::{Credentials, DeviceIdentity, SessionKeys, StoredCredentials};
pub use error::{ApiError, Result};
pub use remote::{AttentionState, Button, LaunchableApp, PressMode, RemoteEvent, Topic, UserAccount};
