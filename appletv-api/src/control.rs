//! Messages and events of the realtime control channel

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Identity announced to the accessory during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Controller name shown on the accessory
    pub name: String,
    pub unique_identifier: String,
    pub system_build_version: String,
    pub protocol_version: u32,
}

/// Connection state announced after the device-info exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Which update kinds the accessory should push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientUpdatesConfig {
    pub artwork_updates: bool,
    pub now_playing_updates: bool,
    pub volume_updates: bool,
    pub keyboard_updates: bool,
}

impl Default for ClientUpdatesConfig {
    fn default() -> Self {
        Self {
            artwork_updates: true,
            now_playing_updates: true,
            volume_updates: true,
            keyboard_updates: false,
        }
    }
}

/// Request for the playback queue, used to pull artwork for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackQueueRequest {
    /// Content identifier the artwork is wanted for
    pub content_identifier: String,
    pub artwork_width: u32,
    pub artwork_height: u32,
}

/// Transport commands understood by both channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaCommand {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaCommand::Play => "Play",
            MediaCommand::Pause => "Pause",
            MediaCommand::NextTrack => "NextTrack",
            MediaCommand::PreviousTrack => "PreviousTrack",
        };
        f.write_str(name)
    }
}

/// Outbound realtime control messages
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    DeviceInfo(DeviceInfo),
    SetConnectionState(ConnectionState),
    ClientUpdatesConfig(ClientUpdatesConfig),
    SendCommand(MediaCommand),
    /// Absolute volume in `0.0..=1.0`
    SetVolume { volume: f32 },
    PlaybackQueueRequest(PlaybackQueueRequest),
}

impl ControlMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::DeviceInfo(_) => "DeviceInfo",
            ControlMessage::SetConnectionState(_) => "SetConnectionState",
            ControlMessage::ClientUpdatesConfig(_) => "ClientUpdatesConfig",
            ControlMessage::SendCommand(_) => "SendCommand",
            ControlMessage::SetVolume { .. } => "SetVolume",
            ControlMessage::PlaybackQueueRequest(_) => "PlaybackQueueRequest",
        }
    }
}

/// A media app on the accessory that can own the now-playing state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerClient {
    pub bundle_identifier: String,
    pub display_name: Option<String>,
}

impl PlayerClient {
    pub fn new(bundle_identifier: impl Into<String>) -> Self {
        Self {
            bundle_identifier: bundle_identifier.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Unknown,
    Playing,
    Paused,
    Stopped,
    Interrupted,
    Seeking,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Metadata of the item currently playing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NowPlayingItem {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// Seconds
    pub elapsed_time: Option<f64>,
    pub content_identifier: Option<String>,
    pub artwork_available: bool,
    pub artwork_url: Option<Url>,
    pub artwork_data: Option<Vec<u8>>,
}

/// Playback state and metadata for one player
#[derive(Debug, Clone, PartialEq)]
pub struct SetStateEvent {
    pub player: PlayerClient,
    pub playback_state: PlaybackState,
    /// Accessory timestamp of the playback state, if it sent one
    pub playback_state_timestamp: Option<f64>,
    pub item: Option<NowPlayingItem>,
}

/// Inbound realtime control events
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    SetState(SetStateEvent),
    /// The now-playing client changed; `None` when nothing is playing
    NowPlayingClient(Option<PlayerClient>),
    /// Absolute volume in `0.0..=1.0`
    VolumeChanged(f32),
}
