use std::sync::Arc;

use appletv_api::testing::MockControlChannel;
use appletv_api::{
    AttentionState, ControlEvent, ControlMessage, NowPlayingItem, PlaybackState, PlayerClient, RemoteEvent,
    SetStateEvent,
};
use appletv_state::capability::*;
use appletv_state::testing::{ImageCall, PlatformCall, RecordingPlatform};
use appletv_state::{
    Artwork, CapabilityValue, MediaStateReconciler, NowPlayingState, ReconcilerConfig, StalenessGuard,
    StateError,
};
use rstest::rstest;
use url::Url;

const MUSIC: &str = "com.apple.TVMusic";
const PODCASTS: &str = "com.apple.podcasts";

fn media_capabilities() -> Vec<&'static str> {
    vec![
        SPEAKER_PLAYING,
        SPEAKER_TRACK,
        SPEAKER_ARTIST,
        SPEAKER_ALBUM,
        SPEAKER_DURATION,
        SPEAKER_POSITION,
        VOLUME_SET,
        ONOFF,
    ]
}

fn setup(config: ReconcilerConfig) -> (Arc<RecordingPlatform>, MediaStateReconciler) {
    let platform = Arc::new(RecordingPlatform::new());
    let reconciler = MediaStateReconciler::new(platform.clone(), media_capabilities(), config);
    (platform, reconciler)
}

fn item(title: &str) -> NowPlayingItem {
    NowPlayingItem {
        title: Some(title.to_string()),
        artist: Some("Artist".to_string()),
        album: Some("Album".to_string()),
        duration: Some(200.0),
        elapsed_time: Some(12.5),
        content_identifier: Some(format!("id-{title}")),
        ..Default::default()
    }
}

fn set_state(player: &str, item: Option<NowPlayingItem>, timestamp: Option<f64>) -> ControlEvent {
    ControlEvent::SetState(SetStateEvent {
        player: PlayerClient::new(player).with_display_name("Music"),
        playback_state: PlaybackState::Playing,
        playback_state_timestamp: timestamp,
        item,
    })
}

fn url(path: &str) -> Url {
    Url::parse(&format!("https://artwork.example.com/{path}.jpg")).unwrap()
}

#[tokio::test]
async fn test_state_event_rewrites_everything_in_one_batch() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Song A")), None), &channel)
        .await
        .unwrap();

    let batches = platform.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 6);
    assert_eq!(platform.value(SPEAKER_TRACK), Some(CapabilityValue::from("Song A")));
    assert_eq!(platform.value(SPEAKER_ARTIST), Some(CapabilityValue::from("Artist")));
    assert_eq!(platform.value(SPEAKER_DURATION), Some(CapabilityValue::Number(200.0)));
    assert_eq!(platform.value(SPEAKER_POSITION), Some(CapabilityValue::Number(12.5)));
    assert_eq!(platform.value(SPEAKER_PLAYING), Some(CapabilityValue::Bool(true)));
}

#[rstest]
#[case(None, Some("Music"), "Music")]
#[case(Some(""), Some("Music"), "Music")]
#[case(None, None, "-")]
#[case(Some("Band"), Some("Music"), "Band")]
#[tokio::test]
async fn test_artist_fallback(
    #[case] artist: Option<&str>,
    #[case] display_name: Option<&str>,
    #[case] expected: &str,
) {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    let mut player = PlayerClient::new(MUSIC);
    player.display_name = display_name.map(str::to_string);
    let event = ControlEvent::SetState(SetStateEvent {
        player,
        playback_state: PlaybackState::Paused,
        playback_state_timestamp: None,
        item: Some(NowPlayingItem {
            artist: artist.map(str::to_string),
            ..item("Track")
        }),
    });

    reconciler.handle_control_event(event, &channel).await.unwrap();

    assert_eq!(platform.value(SPEAKER_ARTIST), Some(CapabilityValue::from(expected)));
    assert_eq!(platform.value(SPEAKER_PLAYING), Some(CapabilityValue::Bool(false)));
}

#[tokio::test]
async fn test_untracked_player_produces_no_writes() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(ControlEvent::NowPlayingClient(Some(PlayerClient::new(MUSIC))), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(set_state(PODCASTS, Some(item("Episode")), None), &channel)
        .await
        .unwrap();

    assert!(platform.calls().is_empty());
    assert_eq!(reconciler.state().track, "");
}

#[tokio::test]
async fn test_client_cleared_resets_in_one_write() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(ControlEvent::NowPlayingClient(Some(PlayerClient::new(MUSIC))), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(
            set_state(
                MUSIC,
                Some(NowPlayingItem {
                    artwork_url: Some(url("cover")),
                    ..item("Song A")
                }),
                None,
            ),
            &channel,
        )
        .await
        .unwrap();
    platform.clear_calls();

    reconciler
        .handle_control_event(ControlEvent::NowPlayingClient(None), &channel)
        .await
        .unwrap();

    let batches = platform.batches();
    assert_eq!(batches.len(), 1);
    let reset = &batches[0];
    for (name, expected) in [
        (SPEAKER_ALBUM, CapabilityValue::from("")),
        (SPEAKER_ARTIST, CapabilityValue::from("")),
        (SPEAKER_TRACK, CapabilityValue::from("")),
        (SPEAKER_DURATION, CapabilityValue::Number(-1.0)),
        (SPEAKER_POSITION, CapabilityValue::Number(-1.0)),
        (SPEAKER_PLAYING, CapabilityValue::Bool(false)),
    ] {
        assert!(reset.contains(&(name.to_string(), expected)), "missing {name}");
    }

    // Only the batch touched values; artwork went back to the placeholder
    let value_writes = platform
        .calls()
        .into_iter()
        .filter(|call| matches!(call, PlatformCall::SetValue(..) | PlatformCall::SetValues(_)))
        .count();
    assert_eq!(value_writes, 1);
    assert_eq!(reconciler.state().artwork, Artwork::Placeholder);
    assert_eq!(reconciler.state().tracked_client, None);
    assert_eq!(platform.images()[0].last_content(), Some(ImageCall::SetUrl(None)));
}

#[tokio::test]
async fn test_identical_artwork_url_updates_image_once() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();
    let with_art = |art: &str| {
        set_state(
            MUSIC,
            Some(NowPlayingItem {
                artwork_url: Some(url(art)),
                ..item("Song A")
            }),
            None,
        )
    };

    reconciler.handle_control_event(with_art("one"), &channel).await.unwrap();
    reconciler.handle_control_event(with_art("one"), &channel).await.unwrap();

    let images = platform.images();
    assert_eq!(images.len(), 1);
    let updates = |calls: Vec<ImageCall>| calls.iter().filter(|c| **c == ImageCall::Update).count();
    assert_eq!(updates(images[0].calls()), 1);

    reconciler.handle_control_event(with_art("two"), &channel).await.unwrap();
    assert_eq!(updates(images[0].calls()), 2);
    assert_eq!(images[0].content_changes(), 2);
    assert_eq!(images[0].last_content(), Some(ImageCall::SetUrl(Some(url("two")))));

    // Album art is attached once, on first publish
    let attached = platform
        .calls()
        .into_iter()
        .filter(|call| matches!(call, PlatformCall::SetAlbumArt(_)))
        .count();
    assert_eq!(attached, 1);
}

#[tokio::test]
async fn test_inline_bytes_win_over_queue_request() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    let event = set_state(
        MUSIC,
        Some(NowPlayingItem {
            artwork_available: true,
            artwork_data: Some(vec![0xff, 0xd8, 0xff]),
            ..item("Song A")
        }),
        None,
    );
    reconciler.handle_control_event(event, &channel).await.unwrap();

    assert!(channel.sent().is_empty());
    assert_eq!(
        platform.images()[0].last_content(),
        Some(ImageCall::SetBytes(vec![0xff, 0xd8, 0xff]))
    );
}

#[tokio::test]
async fn test_available_artwork_is_requested_once_per_content_id() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default().with_artwork_size(300, 300));
    let channel = MockControlChannel::new();
    let needs_art = |title: &str| {
        set_state(
            MUSIC,
            Some(NowPlayingItem {
                artwork_available: true,
                ..item(title)
            }),
            None,
        )
    };

    for _ in 0..3 {
        reconciler.handle_control_event(needs_art("Song A"), &channel).await.unwrap();
    }
    reconciler.handle_control_event(needs_art("Song B"), &channel).await.unwrap();
    reconciler.handle_control_event(needs_art("Song B"), &channel).await.unwrap();

    let requests: Vec<_> = channel
        .sent()
        .into_iter()
        .filter_map(|message| match message {
            ControlMessage::PlaybackQueueRequest(request) => Some(request),
            _ => None,
        })
        .collect();

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].content_identifier, "id-Song A");
    assert_eq!(requests[1].content_identifier, "id-Song B");
    assert_eq!((requests[0].artwork_width, requests[0].artwork_height), (300, 300));
    // Nothing is published while waiting for the queue response
    assert!(platform.images().is_empty());
}

#[tokio::test]
async fn test_unavailable_artwork_shows_placeholder() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("No Art")), None), &channel)
        .await
        .unwrap();

    assert_eq!(platform.images()[0].calls(), vec![ImageCall::SetUrl(None), ImageCall::Update]);
}

#[rstest]
#[case(StalenessGuard::DiscardOlder, "Newer")]
#[case(StalenessGuard::Disabled, "Older")]
#[tokio::test]
async fn test_staleness_guard(#[case] guard: StalenessGuard, #[case] expected: &str) {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default().with_staleness_guard(guard));
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Newer")), Some(200.0)), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Older")), Some(100.0)), &channel)
        .await
        .unwrap();

    assert_eq!(platform.value(SPEAKER_TRACK), Some(CapabilityValue::from(expected)));
}

#[tokio::test]
async fn test_events_without_timestamp_always_pass_the_guard() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Stamped")), Some(500.0)), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Unstamped")), None), &channel)
        .await
        .unwrap();

    assert_eq!(platform.value(SPEAKER_TRACK), Some(CapabilityValue::from("Unstamped")));
}

#[tokio::test]
async fn test_client_change_clears_timestamp() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(ControlEvent::NowPlayingClient(Some(PlayerClient::new(MUSIC))), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Song")), Some(900.0)), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(ControlEvent::NowPlayingClient(Some(PlayerClient::new(PODCASTS))), &channel)
        .await
        .unwrap();
    reconciler
        .handle_control_event(set_state(PODCASTS, Some(item("Episode")), Some(10.0)), &channel)
        .await
        .unwrap();

    assert_eq!(platform.value(SPEAKER_TRACK), Some(CapabilityValue::from("Episode")));
}

#[tokio::test]
async fn test_volume_writes_straight_through() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(ControlEvent::VolumeChanged(0.25), &channel)
        .await
        .unwrap();

    assert_eq!(
        platform.calls(),
        vec![PlatformCall::SetValue(VOLUME_SET.to_string(), CapabilityValue::Number(0.25))]
    );
}

#[tokio::test]
async fn test_undeclared_capabilities_are_skipped() {
    let platform = Arc::new(RecordingPlatform::new());
    let mut reconciler = MediaStateReconciler::new(platform.clone(), [ONOFF], ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(ControlEvent::VolumeChanged(0.5), &channel)
        .await
        .unwrap();
    reconciler.apply_attention_state(AttentionState::Asleep).await.unwrap();

    assert_eq!(
        platform.calls(),
        vec![PlatformCall::SetValue(ONOFF.to_string(), CapabilityValue::Bool(false))]
    );
}

#[rstest]
#[case(0x01, false)]
#[case(0x02, true)]
#[case(0x03, true)]
#[case(0x04, false)]
#[case(0x00, false)]
#[tokio::test]
async fn test_system_status_maps_to_onoff(#[case] raw: u8, #[case] on: bool) {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());

    reconciler.handle_remote_event(RemoteEvent::SystemStatus(raw)).await.unwrap();

    assert_eq!(platform.value(ONOFF), Some(CapabilityValue::Bool(on)));
}

#[tokio::test]
async fn test_platform_failure_is_reported_not_swallowed() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();
    platform.set_fail_writes(true);

    let result = reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Song")), None), &channel)
        .await;

    assert!(matches!(result, Err(StateError::Platform(_))));
    // The failed pass left the previous state in place
    assert_eq!(reconciler.state().track, "");
}

#[tokio::test]
async fn test_failed_artwork_publish_keeps_previous_artwork() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();
    let event = || {
        set_state(
            MUSIC,
            Some(NowPlayingItem {
                artwork_url: Some(url("cover")),
                ..item("Song")
            }),
            None,
        )
    };
    platform.set_fail_images(true);

    let result = reconciler.handle_control_event(event(), &channel).await;

    assert!(matches!(result, Err(StateError::Platform(_))));
    assert_eq!(reconciler.state().artwork, Artwork::Placeholder);

    platform.set_fail_images(false);
    reconciler.handle_control_event(event(), &channel).await.unwrap();
    assert_eq!(reconciler.state().artwork, Artwork::Url(url("cover")));
    assert_eq!(
        platform.images()[0].last_content(),
        Some(ImageCall::SetUrl(Some(url("cover"))))
    );
}

#[tokio::test]
async fn test_repeated_client_clear_writes_nothing() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    for _ in 0..3 {
        reconciler
            .handle_control_event(ControlEvent::NowPlayingClient(None), &channel)
            .await
            .unwrap();
    }
    assert!(platform.calls().is_empty());

    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Song")), None), &channel)
        .await
        .unwrap();
    platform.clear_calls();
    for _ in 0..3 {
        reconciler
            .handle_control_event(ControlEvent::NowPlayingClient(None), &channel)
            .await
            .unwrap();
    }

    assert_eq!(platform.batches().len(), 1);
    assert_eq!(reconciler.state(), &NowPlayingState::empty());
}

#[tokio::test]
async fn test_shutdown_unregisters_image() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let channel = MockControlChannel::new();

    reconciler
        .handle_control_event(set_state(MUSIC, Some(item("Song")), None), &channel)
        .await
        .unwrap();
    reconciler.shutdown().await.unwrap();

    assert!(platform.images()[0].is_unregistered());
}

/// Serialize a keyed archive whose root maps each name to the next object
fn blob(entries: Vec<(&str, plist::Value)>) -> Vec<u8> {
    let mut root = plist::Dictionary::new();
    let mut objects = vec![plist::Value::String("$null".to_string()), plist::Value::Boolean(false)];
    for (name, value) in entries {
        root.insert(name.to_string(), plist::Value::Uid(plist::Uid::new(objects.len() as u64)));
        objects.push(value);
    }
    objects[1] = plist::Value::Dictionary(root);

    let mut archive = plist::Dictionary::new();
    archive.insert("$objects".to_string(), plist::Value::Array(objects));

    let mut bytes = Vec::new();
    plist::Value::Dictionary(archive).to_writer_binary(&mut bytes).unwrap();
    bytes
}

fn int(n: i64) -> plist::Value {
    plist::Value::Integer(plist::Integer::from(n))
}

#[tokio::test]
async fn test_blob_writes_only_present_keys() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());

    let bytes = blob(vec![
        ("title", plist::Value::String("Blob Song".to_string())),
        ("playbackState", int(1)),
    ]);
    reconciler.handle_remote_event(RemoteEvent::NowPlayingInfo(bytes)).await.unwrap();

    assert_eq!(
        platform.batches(),
        vec![vec![
            (SPEAKER_PLAYING.to_string(), CapabilityValue::Bool(true)),
            (SPEAKER_TRACK.to_string(), CapabilityValue::from("Blob Song")),
        ]]
    );
    assert_eq!(platform.value(SPEAKER_DURATION), None);
    assert!(platform.images().is_empty());
}

#[tokio::test]
async fn test_blob_without_root_is_dropped() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());

    let mut archive = plist::Dictionary::new();
    archive.insert(
        "$objects".to_string(),
        plist::Value::Array(vec![plist::Value::String("$null".to_string())]),
    );
    let mut bytes = Vec::new();
    plist::Value::Dictionary(archive).to_writer_binary(&mut bytes).unwrap();

    reconciler.handle_remote_event(RemoteEvent::NowPlayingInfo(bytes)).await.unwrap();

    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_undecodable_blob_is_an_archive_error() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());

    let result = reconciler
        .handle_remote_event(RemoteEvent::NowPlayingInfo(b"not a plist".to_vec()))
        .await;

    assert!(matches!(result, Err(StateError::Archive(_))));
    assert!(platform.calls().is_empty());
}

#[rstest]
#[case(plist::Value::Boolean(true), false)]
#[case(int(1), false)]
#[case(plist::Value::Boolean(false), true)]
#[case(int(0), true)]
#[tokio::test]
async fn test_blob_artwork_respects_placeholder_flag(#[case] placeholder: plist::Value, #[case] published: bool) {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());

    let bytes = blob(vec![
        ("imageData", plist::Value::Data(vec![0x89, 0x50, 0x4e, 0x47])),
        ("imageDataIsPlaceholder", placeholder),
    ]);
    reconciler.handle_remote_event(RemoteEvent::NowPlayingInfo(bytes)).await.unwrap();

    let images = platform.images();
    assert_eq!(!images.is_empty(), published);
    if published {
        assert_eq!(images[0].last_content(), Some(ImageCall::SetBytes(vec![0x89, 0x50, 0x4e, 0x47])));
    }
}

#[tokio::test]
async fn test_repeated_blob_artwork_updates_image_once() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());
    let bytes = blob(vec![
        ("imageData", plist::Value::Data(vec![1, 2, 3])),
        ("imageDataIsPlaceholder", plist::Value::Boolean(false)),
    ]);

    reconciler
        .handle_remote_event(RemoteEvent::NowPlayingInfo(bytes.clone()))
        .await
        .unwrap();
    reconciler.handle_remote_event(RemoteEvent::NowPlayingInfo(bytes)).await.unwrap();

    let image = &platform.images()[0];
    assert_eq!(image.calls(), vec![ImageCall::SetBytes(vec![1, 2, 3]), ImageCall::Update]);
}

#[tokio::test]
async fn test_title_in_metadata_dictionary() {
    let (platform, mut reconciler) = setup(ReconcilerConfig::default());

    let mut metadata = plist::Dictionary::new();
    metadata.insert("title".to_string(), plist::Value::Uid(plist::Uid::new(3)));
    metadata.insert("duration".to_string(), plist::Value::Uid(plist::Uid::new(4)));
    let mut root = plist::Dictionary::new();
    root.insert("metadata".to_string(), plist::Value::Uid(plist::Uid::new(2)));

    let mut archive = plist::Dictionary::new();
    archive.insert(
        "$objects".to_string(),
        plist::Value::Array(vec![
            plist::Value::String("$null".to_string()),
            plist::Value::Dictionary(root),
            plist::Value::Dictionary(metadata),
            plist::Value::String("Nested".to_string()),
            plist::Value::Real(245.5),
        ]),
    );
    let mut bytes = Vec::new();
    plist::Value::Dictionary(archive).to_writer_binary(&mut bytes).unwrap();

    reconciler.handle_remote_event(RemoteEvent::NowPlayingInfo(bytes)).await.unwrap();

    assert_eq!(platform.value(SPEAKER_TRACK), Some(CapabilityValue::from("Nested")));
    assert_eq!(platform.value(SPEAKER_DURATION), Some(CapabilityValue::Number(245.5)));
    assert_eq!(reconciler.state().duration, 245.5);
}

proptest::proptest! {
    #[test]
    fn prop_discard_older_keeps_newest_track(timestamps in proptest::collection::vec(0u16..50, 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let (_platform, mut reconciler) = setup(ReconcilerConfig::default());
            let channel = MockControlChannel::new();

            let mut newest: Option<(u16, String)> = None;
            for (index, timestamp) in timestamps.iter().enumerate() {
                let title = format!("Track {index}");
                let event = set_state(MUSIC, Some(item(&title)), Some(f64::from(*timestamp)));
                reconciler.handle_control_event(event, &channel).await.unwrap();

                if newest.as_ref().map_or(true, |(seen, _)| timestamp >= seen) {
                    newest = Some((*timestamp, title));
                }
            }

            let expected = newest.map(|(_, title)| title).unwrap_or_default();
            proptest::prop_assert_eq!(reconciler.state().track.as_str(), expected.as_str());
            Ok(())
        })?;
    }
}
