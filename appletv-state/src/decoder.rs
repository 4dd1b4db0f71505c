//! Blob decoder - turns a now-playing keyed archive into typed changes
//!
//! Only keys that resolve are reported; everything else stays untouched.

use appletv_archive::{ArchiveGraph, ArchiveValue};

const PLAYBACK_STATE_KEY: &str = "playbackState";
const DURATION_KEY: &str = "duration";
const TITLE_KEY: &str = "title";
const IMAGE_DATA_KEY: &str = "imageData";
const IMAGE_PLACEHOLDER_KEY: &str = "imageDataIsPlaceholder";

/// Raw playback state the archive uses for "playing"
const PLAYING: i64 = 1;

/// Changes carried by one now-playing blob
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlobUpdate {
    pub playing: Option<bool>,
    pub duration: Option<f64>,
    pub track: Option<String>,
    /// Real artwork bytes; placeholder artwork is never reported
    pub artwork: Option<Vec<u8>>,
}

impl BlobUpdate {
    pub fn is_empty(&self) -> bool {
        self.playing.is_none() && self.duration.is_none() && self.track.is_none() && self.artwork.is_none()
    }
}

/// Decode a valid now-playing archive
pub fn decode_now_playing(graph: &ArchiveGraph) -> BlobUpdate {
    let playing = graph
        .get(PLAYBACK_STATE_KEY)
        .map(|state| state.as_i64() == Some(PLAYING));

    let artwork = match (graph.get(IMAGE_DATA_KEY), graph.get(IMAGE_PLACEHOLDER_KEY)) {
        (Some(data), Some(placeholder)) if !is_truthy(placeholder) => data.as_data().map(<[u8]>::to_vec),
        _ => None,
    };

    BlobUpdate {
        playing,
        duration: graph.get_f64(DURATION_KEY),
        track: graph.get_str(TITLE_KEY).map(str::to_string),
        artwork,
    }
}

fn is_truthy(value: &ArchiveValue) -> bool {
    match value {
        ArchiveValue::Null => false,
        ArchiveValue::Boolean(b) => *b,
        ArchiveValue::Integer(n) => *n != 0,
        ArchiveValue::Real(n) => *n != 0.0 && !n.is_nan(),
        ArchiveValue::String(s) => !s.is_empty(),
        _ => true,
    }
}
