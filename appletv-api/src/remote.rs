//! Types of the remote/input channel

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inbound remote/input channel events
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Keyed-archive blob from the `NowPlayingInfo` topic
    NowPlayingInfo(Vec<u8>),
    /// Raw attention state byte from the `TVSystemStatus` topic
    SystemStatus(u8),
}

/// Event topics on the remote/input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NowPlayingInfo,
    SystemStatus,
    /// Media-control topic the accessory subscribes controllers to by default
    MediaControl,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::NowPlayingInfo => "NowPlayingInfo",
            Topic::SystemStatus => "TVSystemStatus",
            Topic::MediaControl => "_iMC",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HID buttons that can be pressed through the remote/input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Select,
    Menu,
    Home,
    PlayPause,
    Siri,
    VolumeUp,
    VolumeDown,
    PageUp,
    PageDown,
    Wake,
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressMode {
    Tap,
    Hold(Duration),
}

/// Accessory attention (power) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttentionState {
    #[default]
    Unknown,
    Asleep,
    Screensaver,
    Awake,
    Idle,
}

impl AttentionState {
    /// Map the raw state byte used on the wire
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x01 => AttentionState::Asleep,
            0x02 => AttentionState::Screensaver,
            0x03 => AttentionState::Awake,
            0x04 => AttentionState::Idle,
            _ => AttentionState::Unknown,
        }
    }

    /// Whether the accessory counts as powered on
    pub fn is_on(&self) -> bool {
        matches!(self, AttentionState::Screensaver | AttentionState::Awake)
    }
}

/// An installed app that can be launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchableApp {
    pub bundle_id: String,
    pub name: String,
}

/// A user account on the accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub account_id: String,
    pub name: String,
}
