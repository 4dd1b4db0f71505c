use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use appletv_api::testing::{sample_stored_credentials, MockConnector};
use appletv_api::{
    Button, ControlEvent, ControlMessage, DeviceIdentity, LaunchableApp, MediaCommand, NowPlayingItem,
    PlaybackState, PlayerClient, PressMode, RemoteEvent, SetStateEvent, UserAccount,
};
use appletv_discovery::{DiscoveryCache, DiscoveryResult, ServiceKind};
use appletv_sdk::{
    CapabilityValue, Device, DeviceConfig, DeviceContext, DeviceHandle, DeviceKind, SdkError,
};
use appletv_session::{SessionConfig, SessionError};
use appletv_state::capability::*;
use appletv_state::testing::{PlatformCall, RecordingPlatform};
use rstest::rstest;
use url::Url;

const DEVICE_ID: &str = "living-room-tv";

struct Harness {
    connector: Arc<MockConnector>,
    platform: Arc<RecordingPlatform>,
}

impl Harness {
    fn new() -> Self {
        Self {
            connector: Arc::new(MockConnector::new()),
            platform: Arc::new(RecordingPlatform::new()),
        }
    }

    fn context(&self) -> DeviceContext {
        DeviceContext {
            platform: self.platform.clone(),
            resolver: cache(),
            connector: self.connector.clone(),
        }
    }

    async fn start(&self, kind: DeviceKind) -> Result<DeviceHandle, SdkError> {
        Device::start(kind, identity(), self.context(), config()).await
    }
}

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        id: DEVICE_ID.to_string(),
        credentials: sample_stored_credentials(),
    }
}

fn cache() -> Arc<DiscoveryCache> {
    let cache = Arc::new(DiscoveryCache::new());
    for (service, port) in [(ServiceKind::RealtimeControl, 49152), (ServiceKind::RemoteInput, 49153)] {
        cache.insert(DiscoveryResult {
            id: DEVICE_ID.to_string(),
            name: "Living Room".to_string(),
            address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)),
            port,
            service,
            txt: BTreeMap::new(),
        });
    }
    cache
}

fn config() -> DeviceConfig {
    DeviceConfig::default().with_session(SessionConfig::default().with_keepalive_interval(None))
}

/// Poll until `condition` holds; time is paused so this costs nothing
async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

#[tokio::test(start_paused = true)]
async fn test_startup_syncs_then_connects_then_attaches() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    let calls = harness.platform.calls();
    let adds = DeviceKind::AppleTv.capabilities().len();
    assert_eq!(harness.platform.structure_changes(), adds);
    assert!(calls[..adds].iter().all(|c| matches!(c, PlatformCall::AddCapability(_))));
    assert_eq!(
        calls[adds..].to_vec(),
        vec![
            PlatformCall::SetValue(ONOFF.to_string(), CapabilityValue::Bool(true)),
            PlatformCall::SetAvailable,
        ]
    );

    let log = harness.connector.log();
    assert_eq!(
        log.calls_with_prefix("remote.")[7..].to_vec(),
        vec![
            "remote.attention_state",
            "remote.subscribe(NowPlayingInfo)",
            "remote.subscribe(TVSystemStatus)",
            "remote.unsubscribe(_iMC)",
            "remote.fetch_now_playing_info",
        ]
    );
    assert!(log.position("control.send(ClientUpdatesConfig)") < log.position("remote.attention_state"));

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_homepod_skips_remote_attach() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::HomePod).await.unwrap();

    assert_eq!(harness.connector.remote_count(), 0);
    assert_eq!(harness.platform.availability(), Some(true));
    assert_eq!(harness.platform.value(ONOFF), None);

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_existing_capabilities_are_reconciled() {
    let harness = Harness {
        connector: Arc::new(MockConnector::new()),
        platform: Arc::new(RecordingPlatform::with_capabilities([ONOFF, "legacy_input", SPEAKER_TRACK])),
    };
    let device = harness.start(DeviceKind::HomePod).await.unwrap();

    let calls = harness.platform.calls();
    assert!(calls.contains(&PlatformCall::RemoveCapability(ONOFF.to_string())));
    assert!(calls.contains(&PlatformCall::RemoveCapability("legacy_input".to_string())));
    assert!(!calls.contains(&PlatformCall::AddCapability(SPEAKER_TRACK.to_string())));
    assert_eq!(
        harness.platform.structure_changes(),
        DeviceKind::HomePod.capabilities().len() - 1 + 2
    );

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_initial_connect_failure_marks_unavailable_without_retry() {
    let harness = Harness::new();
    harness.connector.fail_control_on("pair_verify");

    let result = harness.start(DeviceKind::AppleTv).await;

    let Err(SdkError::Session(SessionError::Channel { .. })) = result else {
        panic!("expected a channel error");
    };
    assert_eq!(harness.platform.availability(), Some(false));
    assert!(matches!(
        harness.platform.calls().last(),
        Some(PlatformCall::SetUnavailable(reason)) if reason.contains("pair-verify")
    ));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.connector.control_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_attach_disconnects_channels() {
    let harness = Harness::new();
    harness.connector.fail_remote_on("subscribe");

    let result = harness.start(DeviceKind::AppleTv).await;

    assert!(matches!(result, Err(SdkError::Api(_))));
    let log = harness.connector.log();
    assert_eq!(log.count("control.disconnect"), 1);
    assert_eq!(log.count("remote.disconnect"), 1);
    assert_eq!(harness.platform.availability(), Some(false));
}

#[rstest]
#[case(REMOTE_SELECT, true, Some((Button::Select, PressMode::Tap)))]
#[case(REMOTE_SELECT, false, None)]
#[case(REMOTE_BACK, true, Some((Button::Menu, PressMode::Tap)))]
#[case(REMOTE_SIRI, true, Some((Button::Siri, PressMode::Hold(Duration::from_millis(1000)))))]
#[case(ONOFF, false, Some((Button::Sleep, PressMode::Tap)))]
#[case(ONOFF, true, Some((Button::Wake, PressMode::Tap)))]
#[case(VOLUME_MUTE, true, Some((Button::PageUp, PressMode::Tap)))]
#[tokio::test(start_paused = true)]
async fn test_button_writes(
    #[case] capability: &str,
    #[case] value: bool,
    #[case] expected: Option<(Button, PressMode)>,
) {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    device.write_capability(capability, value).await.unwrap();

    let presses = harness.connector.latest_remote().unwrap().presses();
    assert_eq!(presses, expected.into_iter().collect::<Vec<_>>());

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_apple_tv_media_commands_use_remote_channel() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    device.write_capability(SPEAKER_PLAYING, true).await.unwrap();
    device.write_capability(SPEAKER_PLAYING, false).await.unwrap();
    device.write_capability(SPEAKER_NEXT, true).await.unwrap();
    device.write_capability(SPEAKER_PREV, true).await.unwrap();

    assert_eq!(
        harness.connector.latest_remote().unwrap().commands(),
        vec![
            MediaCommand::Play,
            MediaCommand::Pause,
            MediaCommand::NextTrack,
            MediaCommand::PreviousTrack
        ]
    );

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_homepod_commands_use_control_channel() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::HomePod).await.unwrap();

    device.write_capability(SPEAKER_NEXT, true).await.unwrap();
    device.write_capability(VOLUME_SET, 0.5).await.unwrap();

    let sent = harness.connector.latest_control().unwrap().sent();
    assert!(sent.contains(&ControlMessage::SendCommand(MediaCommand::NextTrack)));
    assert!(sent.contains(&ControlMessage::SetVolume { volume: 0.5 }));

    device.shutdown().await.unwrap();
}

#[rstest]
#[case(DeviceKind::AppleTv, SPEAKER_TRACK)]
#[case(DeviceKind::AppleTv, VOLUME_SET)]
#[case(DeviceKind::HomePod, REMOTE_UP)]
#[tokio::test(start_paused = true)]
async fn test_writes_without_listener_are_rejected(#[case] kind: DeviceKind, #[case] capability: &str) {
    let harness = Harness::new();
    let device = harness.start(kind).await.unwrap();

    let result = device.write_capability(capability, true).await;

    assert!(matches!(result, Err(SdkError::UnknownCapability(name)) if name == capability));
    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_control_events_reach_platform() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::HomePod).await.unwrap();
    let control = harness.connector.latest_control().unwrap();

    control
        .emit(ControlEvent::SetState(SetStateEvent {
            player: PlayerClient::new("com.apple.TVMusic"),
            playback_state: PlaybackState::Playing,
            playback_state_timestamp: None,
            item: Some(NowPlayingItem {
                title: Some("Song A".to_string()),
                artist: Some("Artist".to_string()),
                ..Default::default()
            }),
        }))
        .await;
    control.emit(ControlEvent::VolumeChanged(0.75)).await;

    let platform = harness.platform.clone();
    eventually(move || platform.value(VOLUME_SET) == Some(CapabilityValue::Number(0.75))).await;
    assert_eq!(harness.platform.value(SPEAKER_TRACK), Some(CapabilityValue::from("Song A")));
    assert_eq!(harness.platform.value(SPEAKER_PLAYING), Some(CapabilityValue::Bool(true)));

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_handler_errors_do_not_end_the_stream() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();
    let remote = harness.connector.latest_remote().unwrap();

    remote.emit(RemoteEvent::NowPlayingInfo(b"garbage".to_vec())).await;
    remote.emit(RemoteEvent::SystemStatus(0x01)).await;

    let platform = harness.platform.clone();
    eventually(move || platform.value(ONOFF) == Some(CapabilityValue::Bool(false))).await;
    assert!(device.is_running());

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_disconnect_reconnects() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    harness.connector.latest_control().unwrap().close();

    let platform = harness.platform.clone();
    eventually(move || platform.availability() == Some(false)).await;
    assert!(harness
        .platform
        .calls()
        .contains(&PlatformCall::SetUnavailable("Connection lost, reconnecting".to_string())));

    let connector = harness.connector.clone();
    eventually(move || connector.control_count() == 2).await;
    let platform = harness.platform.clone();
    eventually(move || platform.availability() == Some(true)).await;

    // The new session is attached and serves commands
    device.write_capability(REMOTE_UP, true).await.unwrap();
    assert_eq!(
        harness.connector.latest_remote().unwrap().presses(),
        vec![(Button::Up, PressMode::Tap)]
    );
    assert_eq!(harness.connector.log().count("remote.subscribe(NowPlayingInfo)"), 2);

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_commands_while_reconnecting_are_rejected() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    harness.connector.fail_next_control_connects(5);
    harness.connector.latest_remote().unwrap().close();
    let platform = harness.platform.clone();
    eventually(move || platform.availability() == Some(false)).await;

    let result = device.write_capability(REMOTE_UP, true).await;
    assert!(matches!(result, Err(SdkError::NotConnected)));

    let result = device.launch_app("com.apple.TVMusic").await;
    assert!(matches!(result, Err(SdkError::NotConnected)));

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_reconnect_stops_retrying() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    harness.connector.fail_next_control_connects(u32::MAX);
    harness.connector.latest_control().unwrap().close();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    device.shutdown().await.unwrap();

    let attempts = harness.connector.control_count();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.connector.control_count(), attempts);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_handshake_closes_new_channels() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    harness.connector.stall_control_on("setup_event_stream");
    harness.connector.latest_control().unwrap().close();
    let connector = harness.connector.clone();
    eventually(move || connector.log().count("control.setup_event_stream") == 2).await;

    device.shutdown().await.unwrap();

    let log = harness.connector.log();
    assert_eq!(log.count("control.disconnect"), 2);
    assert_eq!(log.count("remote.disconnect"), 2);
    assert!(!harness.connector.controls()[1].is_connected());
    assert!(!harness.connector.remotes()[1].is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_everything() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    device.write_capability(SPEAKER_PLAYING, true).await.unwrap();
    let control = harness.connector.latest_control().unwrap();
    control
        .emit(ControlEvent::SetState(SetStateEvent {
            player: PlayerClient::new("com.apple.TVMusic"),
            playback_state: PlaybackState::Playing,
            playback_state_timestamp: None,
            item: Some(NowPlayingItem::default()),
        }))
        .await;
    let platform = harness.platform.clone();
    eventually(move || !platform.images().is_empty()).await;

    device.shutdown().await.unwrap();

    let log = harness.connector.log();
    assert_eq!(log.count("control.disconnect"), 1);
    assert_eq!(log.count("remote.disconnect"), 1);
    assert!(harness.platform.images()[0].is_unregistered());
}

#[tokio::test(start_paused = true)]
async fn test_flow_actions() {
    let harness = Harness::new();
    harness.connector.set_launchable_apps(vec![
        LaunchableApp {
            bundle_id: "com.apple.TVMusic".to_string(),
            name: "Music".to_string(),
        },
        LaunchableApp {
            bundle_id: "com.apple.TVAppStore".to_string(),
            name: "App Store".to_string(),
        },
        LaunchableApp {
            bundle_id: "com.netflix.Netflix".to_string(),
            name: "Netflix".to_string(),
        },
    ]);
    harness.connector.set_user_accounts(vec![
        UserAccount {
            account_id: "2".to_string(),
            name: "Sam".to_string(),
        },
        UserAccount {
            account_id: "1".to_string(),
            name: "Alex".to_string(),
        },
    ]);
    let device = harness.start(DeviceKind::AppleTv).await.unwrap();

    let apps = device.autocomplete_apps("").await.unwrap();
    let names: Vec<_> = apps.iter().map(|app| app.name.as_str()).collect();
    assert_eq!(names, vec!["App Store", "Music", "Netflix"]);

    let apps = device.autocomplete_apps("MUS").await.unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].id, "com.apple.TVMusic");
    assert_eq!(apps[0].description.as_deref(), Some("com.apple.TVMusic"));

    let accounts = device.autocomplete_accounts("  ").await.unwrap();
    let ids: Vec<_> = accounts.iter().map(|account| account.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);

    device.launch_app("com.apple.TVMusic").await.unwrap();
    device
        .launch_url(&Url::parse("https://tv.apple.com/show/abc").unwrap())
        .await
        .unwrap();
    device.switch_account("2").await.unwrap();

    let log = harness.connector.log();
    assert_eq!(log.count("remote.launch_app(com.apple.TVMusic)"), 1);
    assert_eq!(log.count("remote.launch_url(https://tv.apple.com/show/abc)"), 1);
    assert_eq!(log.count("remote.switch_user_account(2)"), 1);

    device.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_flow_actions_need_a_remote_channel() {
    let harness = Harness::new();
    let device = harness.start(DeviceKind::HomePod).await.unwrap();

    let result = device.launch_app("com.apple.TVMusic").await;
    assert!(matches!(result, Err(SdkError::Unsupported { kind: DeviceKind::HomePod, .. })));

    let result = device.autocomplete_accounts("").await;
    assert!(matches!(result, Err(SdkError::Unsupported { .. })));

    device.shutdown().await.unwrap();
}
