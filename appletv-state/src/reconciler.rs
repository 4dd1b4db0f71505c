//! Turns channel events into platform capability writes

use std::collections::HashSet;
use std::sync::Arc;

use appletv_api::{
    AttentionState, ControlChannel, ControlEvent, ControlMessage, NowPlayingItem, PlaybackQueueRequest,
    PlayerClient, RemoteEvent, SetStateEvent,
};
use appletv_archive::ArchiveGraph;
use tracing::{debug, trace};

use crate::artwork::ArtworkPublisher;
use crate::capability;
use crate::config::{ReconcilerConfig, StalenessGuard};
use crate::decoder::{decode_now_playing, BlobUpdate};
use crate::error::Result;
use crate::now_playing::{Artwork, NowPlayingState, UNKNOWN_ARTIST};
use crate::platform::{CapabilityValue, Platform};

/// Keeps the platform's media capabilities consistent with channel events.
///
/// Runs on the device task; every handler finishes its platform writes
/// before the next event is taken, so no locking is needed. Writes to
/// capabilities the device kind does not declare are skipped.
pub struct MediaStateReconciler {
    platform: Arc<dyn Platform>,
    capabilities: HashSet<String>,
    config: ReconcilerConfig,
    state: NowPlayingState,
    last_state_timestamp: Option<f64>,
    artwork: ArtworkPublisher,
}

impl MediaStateReconciler {
    pub fn new<I, S>(platform: Arc<dyn Platform>, capabilities: I, config: ReconcilerConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            platform,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            config,
            state: NowPlayingState::empty(),
            last_state_timestamp: None,
            artwork: ArtworkPublisher::new(),
        }
    }

    pub fn state(&self) -> &NowPlayingState {
        &self.state
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Apply one realtime control event.
    ///
    /// `channel` is used for the one-off playback-queue request when
    /// artwork is available but was not sent inline.
    pub async fn handle_control_event(&mut self, event: ControlEvent, channel: &dyn ControlChannel) -> Result<()> {
        match event {
            ControlEvent::SetState(event) => self.apply_set_state(event, channel).await,
            ControlEvent::NowPlayingClient(Some(client)) => {
                self.track_client(client);
                Ok(())
            }
            ControlEvent::NowPlayingClient(None) => {
                if self.state == NowPlayingState::empty() {
                    trace!("Now-playing client already cleared");
                    return Ok(());
                }
                self.reset().await
            }
            ControlEvent::VolumeChanged(volume) => {
                self.write(capability::VOLUME_SET, CapabilityValue::Number(f64::from(volume)))
                    .await
            }
        }
    }

    /// Apply one remote/input channel event
    pub async fn handle_remote_event(&mut self, event: RemoteEvent) -> Result<()> {
        match event {
            RemoteEvent::NowPlayingInfo(blob) => {
                let graph = ArchiveGraph::from_bytes(&blob)?;
                if !graph.is_valid() {
                    debug!("Dropping now-playing blob without a root object");
                    return Ok(());
                }
                self.apply_blob(decode_now_playing(&graph)).await
            }
            RemoteEvent::SystemStatus(raw) => self.apply_attention_state(AttentionState::from_raw(raw)).await,
        }
    }

    /// Mirror the accessory's attention state onto `onoff`
    pub async fn apply_attention_state(&mut self, state: AttentionState) -> Result<()> {
        debug!(?state, "Attention state");
        self.write(capability::ONOFF, CapabilityValue::Bool(state.is_on())).await
    }

    /// Back to the empty state in one batched write, artwork to placeholder
    pub async fn reset(&mut self) -> Result<()> {
        debug!("Now-playing client cleared, resetting state");
        let empty = NowPlayingState::empty();

        self.write_batch(empty.capability_values()).await?;
        self.state = NowPlayingState {
            artwork: self.state.artwork.clone(),
            ..empty
        };
        self.last_state_timestamp = None;
        self.artwork.clear_request_marker();
        self.publish_artwork(Artwork::Placeholder).await
    }

    /// Release the artwork image
    pub async fn shutdown(&mut self) -> Result<()> {
        self.artwork.unregister().await
    }

    fn track_client(&mut self, client: PlayerClient) {
        if self.state.tracked_client.as_deref() != Some(client.bundle_identifier.as_str()) {
            debug!(client = %client.bundle_identifier, "Tracking now-playing client");
            self.state.tracked_client = Some(client.bundle_identifier);
            self.last_state_timestamp = None;
        }
    }

    async fn apply_set_state(&mut self, event: SetStateEvent, channel: &dyn ControlChannel) -> Result<()> {
        if let Some(tracked) = &self.state.tracked_client {
            if *tracked != event.player.bundle_identifier {
                trace!(player = %event.player.bundle_identifier, "Ignoring state for untracked player");
                return Ok(());
            }
        }

        if self.is_stale(event.playback_state_timestamp) {
            debug!(
                timestamp = ?event.playback_state_timestamp,
                last = ?self.last_state_timestamp,
                "Discarding stale state event"
            );
            return Ok(());
        }
        if let Some(timestamp) = event.playback_state_timestamp {
            self.last_state_timestamp = Some(timestamp);
        }

        let mut next = self.state.clone();
        next.playing = event.playback_state.is_playing();
        if let Some(item) = &event.item {
            next.track = item.title.clone().unwrap_or_default();
            next.album = item.album.clone().unwrap_or_default();
            next.artist = item
                .artist
                .clone()
                .filter(|artist| !artist.is_empty())
                .or_else(|| event.player.display_name.clone())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
            next.duration = item.duration.unwrap_or(-1.0);
            next.position = item.elapsed_time.unwrap_or(-1.0);
            next.content_identifier = item.content_identifier.clone();
        }

        self.write_batch(next.capability_values()).await?;
        self.state = next;

        match &event.item {
            Some(item) => self.resolve_artwork(item, channel).await,
            None => Ok(()),
        }
    }

    fn is_stale(&self, timestamp: Option<f64>) -> bool {
        match (self.config.staleness_guard, timestamp, self.last_state_timestamp) {
            (StalenessGuard::DiscardOlder, Some(timestamp), Some(last)) => timestamp < last,
            _ => false,
        }
    }

    async fn resolve_artwork(&mut self, item: &NowPlayingItem, channel: &dyn ControlChannel) -> Result<()> {
        if let Some(url) = &item.artwork_url {
            return self.publish_artwork(Artwork::Url(url.clone())).await;
        }

        if let Some(bytes) = item.artwork_data.as_ref().filter(|bytes| !bytes.is_empty()) {
            return self.publish_artwork(Artwork::Bytes(bytes.clone())).await;
        }

        if !item.artwork_available {
            return self.publish_artwork(Artwork::Placeholder).await;
        }

        // Available but not inline: ask once per item, the answer arrives as a later state event
        let Some(content_id) = item.content_identifier.as_deref() else {
            debug!("Artwork available without content identifier, not requesting");
            return Ok(());
        };
        if self.artwork.already_requested(content_id) {
            return Ok(());
        }

        debug!(content_id, "Requesting artwork through playback queue");
        self.artwork.mark_requested(content_id);
        channel
            .send(ControlMessage::PlaybackQueueRequest(PlaybackQueueRequest {
                content_identifier: content_id.to_string(),
                artwork_width: self.config.artwork_width,
                artwork_height: self.config.artwork_height,
            }))
            .await?;
        Ok(())
    }

    async fn apply_blob(&mut self, update: BlobUpdate) -> Result<()> {
        let mut values = Vec::new();

        if let Some(playing) = update.playing {
            self.state.playing = playing;
            values.push((capability::SPEAKER_PLAYING.to_string(), CapabilityValue::Bool(playing)));
        }
        if let Some(duration) = update.duration {
            self.state.duration = duration;
            values.push((capability::SPEAKER_DURATION.to_string(), CapabilityValue::Number(duration)));
        }
        if let Some(track) = update.track {
            values.push((capability::SPEAKER_TRACK.to_string(), CapabilityValue::String(track.clone())));
            self.state.track = track;
        }

        if !values.is_empty() {
            self.write_batch(values).await?;
        }

        if let Some(bytes) = update.artwork {
            self.publish_artwork(Artwork::Bytes(bytes)).await?;
        }
        Ok(())
    }

    async fn publish_artwork(&mut self, artwork: Artwork) -> Result<()> {
        self.artwork.publish(self.platform.as_ref(), artwork.clone()).await?;
        self.state.artwork = artwork;
        Ok(())
    }

    async fn write(&self, name: &str, value: CapabilityValue) -> Result<()> {
        if !self.capabilities.contains(name) {
            debug!(capability = name, %value, "Dropping write to undeclared capability");
            return Ok(());
        }
        debug!(capability = name, %value, "Capability write");
        self.platform.set_capability_value(name, value).await?;
        Ok(())
    }

    async fn write_batch(&self, values: Vec<(String, CapabilityValue)>) -> Result<()> {
        let values: Vec<_> = values
            .into_iter()
            .filter(|(name, _)| self.capabilities.contains(name))
            .collect();
        if values.is_empty() {
            return Ok(());
        }
        debug!(count = values.len(), "Batched capability write");
        self.platform.set_capability_values(values).await?;
        Ok(())
    }
}
