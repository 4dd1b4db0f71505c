//! Device kinds: which channels a device uses and which capabilities it declares

use std::fmt;

use appletv_api::ChannelKind;
use appletv_session::ChannelAdapter;
use appletv_state::capability::*;
use serde::{Deserialize, Serialize};

const APPLE_TV_CAPABILITIES: &[&str] = &[
    ONOFF,
    SPEAKER_PLAYING,
    SPEAKER_NEXT,
    SPEAKER_PREV,
    SPEAKER_TRACK,
    SPEAKER_ARTIST,
    SPEAKER_ALBUM,
    SPEAKER_DURATION,
    SPEAKER_POSITION,
    VOLUME_UP,
    VOLUME_DOWN,
    VOLUME_MUTE,
    REMOTE_UP,
    REMOTE_DOWN,
    REMOTE_LEFT,
    REMOTE_RIGHT,
    REMOTE_SELECT,
    REMOTE_HOME,
    REMOTE_BACK,
    REMOTE_PLAYPAUSE,
    REMOTE_SIRI,
];

const HOMEPOD_CAPABILITIES: &[&str] = &[
    SPEAKER_PLAYING,
    SPEAKER_NEXT,
    SPEAKER_PREV,
    SPEAKER_TRACK,
    SPEAKER_ARTIST,
    SPEAKER_ALBUM,
    SPEAKER_DURATION,
    SPEAKER_POSITION,
    VOLUME_SET,
];

/// A supported accessory family.
///
/// Kinds differ only in data: the channels they bring up and the
/// capabilities they declare. Everything else is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    AppleTv,
    HomePod,
}

impl DeviceKind {
    pub fn adapter(&self) -> ChannelAdapter {
        match self {
            DeviceKind::AppleTv => ChannelAdapter::Both,
            DeviceKind::HomePod => ChannelAdapter::ControlOnly,
        }
    }

    /// Declared capabilities, in platform order
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            DeviceKind::AppleTv => APPLE_TV_CAPABILITIES,
            DeviceKind::HomePod => HOMEPOD_CAPABILITIES,
        }
    }

    pub fn declares(&self, capability: &str) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether flow actions (apps, URLs, accounts) can run on this kind
    pub fn has_remote(&self) -> bool {
        self.adapter().has(ChannelKind::RemoteInput)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::AppleTv => f.write_str("Apple TV"),
            DeviceKind::HomePod => f.write_str("HomePod"),
        }
    }
}
