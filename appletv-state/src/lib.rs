//! Media state reconciliation for Apple TV and HomePod devices
//!
//! The host platform sees a device as a set of named capabilities. This
//! crate keeps the media-related ones (playback state, track metadata,
//! artwork, volume, power) consistent with the events arriving on the
//! accessory's channels:
//!
//! - realtime control `SetState` events, filtered to the tracked player
//!   and optionally guarded against out-of-order delivery;
//! - now-playing client changes, which reset everything when nothing plays;
//! - keyed-archive blobs from the remote/input channel, decoded lazily;
//! - attention state changes, mirrored onto `onoff`.
//!
//! A state pass is never half-visible: it is either one batched rewrite or
//! one batched reset.

pub mod artwork;
pub mod capability;
pub mod config;
pub mod decoder;
pub mod error;
pub mod now_playing;
pub mod platform;
pub mod reconciler;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use artwork::ArtworkPublisher;
pub use config::{ReconcilerConfig, StalenessGuard};
pub use decoder::{decode_now_playing, BlobUpdate};
pub use error::{Result, StateError};
pub use now_playing::{Artwork, NowPlayingState, UNKNOWN_ARTIST};
pub use platform::{CapabilityValue, Image, Platform, PlatformError, PlatformResult};
pub use reconciler::MediaStateReconciler;
