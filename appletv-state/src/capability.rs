//! Capability names shared by device kinds and the reconciler

pub const ONOFF: &str = "onoff";

pub const SPEAKER_PLAYING: &str = "speaker_playing";
pub const SPEAKER_NEXT: &str = "speaker_next";
pub const SPEAKER_PREV: &str = "speaker_prev";
pub const SPEAKER_TRACK: &str = "speaker_track";
pub const SPEAKER_ARTIST: &str = "speaker_artist";
pub const SPEAKER_ALBUM: &str = "speaker_album";
pub const SPEAKER_DURATION: &str = "speaker_duration";
pub const SPEAKER_POSITION: &str = "speaker_position";

pub const VOLUME_SET: &str = "volume_set";
pub const VOLUME_UP: &str = "volume_up";
pub const VOLUME_DOWN: &str = "volume_down";
pub const VOLUME_MUTE: &str = "volume_mute";

pub const REMOTE_UP: &str = "remote_up";
pub const REMOTE_DOWN: &str = "remote_down";
pub const REMOTE_LEFT: &str = "remote_left";
pub const REMOTE_RIGHT: &str = "remote_right";
pub const REMOTE_SELECT: &str = "remote_select";
pub const REMOTE_HOME: &str = "remote_home";
pub const REMOTE_BACK: &str = "remote_back";
pub const REMOTE_PLAYPAUSE: &str = "remote_playpause";
pub const REMOTE_SIRI: &str = "remote_siri";

/// Prefix shared by every remote button capability
pub const REMOTE_PREFIX: &str = "remote_";
