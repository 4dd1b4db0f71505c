//! The observable now-playing snapshot

use url::Url;

use crate::capability;
use crate::platform::CapabilityValue;

/// Artist shown when neither the item nor the player name one
pub const UNKNOWN_ARTIST: &str = "-";

/// Artwork reference as last resolved
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Artwork {
    #[default]
    Placeholder,
    Url(Url),
    Bytes(Vec<u8>),
}

/// Everything the reconciler exposes as device attributes
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingState {
    pub album: String,
    pub artist: String,
    pub track: String,
    /// Seconds, `-1` when unknown
    pub duration: f64,
    /// Seconds, `-1` when unknown
    pub position: f64,
    pub playing: bool,
    /// Bundle identifier of the player whose events are applied
    pub tracked_client: Option<String>,
    pub artwork: Artwork,
    pub content_identifier: Option<String>,
}

impl NowPlayingState {
    /// The canonical "nothing playing" value
    pub fn empty() -> Self {
        Self {
            album: String::new(),
            artist: String::new(),
            track: String::new(),
            duration: -1.0,
            position: -1.0,
            playing: false,
            tracked_client: None,
            artwork: Artwork::Placeholder,
            content_identifier: None,
        }
    }

    /// Capability values for one full rewrite
    pub fn capability_values(&self) -> Vec<(String, CapabilityValue)> {
        vec![
            (capability::SPEAKER_PLAYING.to_string(), self.playing.into()),
            (capability::SPEAKER_TRACK.to_string(), self.track.clone().into()),
            (capability::SPEAKER_ARTIST.to_string(), self.artist.clone().into()),
            (capability::SPEAKER_ALBUM.to_string(), self.album.clone().into()),
            (capability::SPEAKER_DURATION.to_string(), self.duration.into()),
            (capability::SPEAKER_POSITION.to_string(), self.position.into()),
        ]
    }
}

impl Default for NowPlayingState {
    fn default() -> Self {
        Self::empty()
    }
}
