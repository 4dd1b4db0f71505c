use std::collections::BTreeSet;

use appletv_sdk::{CapabilityListeners, CapabilitySynchronizer, DeviceKind, Platform, SdkError};
use appletv_state::testing::{PlatformCall, RecordingPlatform};
use proptest::prelude::*;

const POOL: &[&str] = &[
    "onoff",
    "speaker_playing",
    "speaker_track",
    "volume_set",
    "volume_mute",
    "remote_up",
    "remote_siri",
    "measure_temperature",
];

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let platform = RecordingPlatform::with_capabilities(["onoff", "alarm_generic"]);
    let declared = DeviceKind::AppleTv.capabilities();

    let first = CapabilitySynchronizer::reconcile(declared, &platform).await.unwrap();
    assert_eq!(first.removed, vec!["alarm_generic".to_string()]);
    assert_eq!(first.added.len(), declared.len() - 1);

    platform.clear_calls();
    let second = CapabilitySynchronizer::reconcile(declared, &platform).await.unwrap();

    assert!(second.is_unchanged());
    assert_eq!(platform.structure_changes(), 0);
}

#[tokio::test]
async fn test_adds_follow_declared_order() {
    let platform = RecordingPlatform::new();

    CapabilitySynchronizer::reconcile(&["onoff", "speaker_playing", "remote_up"], &platform)
        .await
        .unwrap();

    assert_eq!(
        platform.calls(),
        vec![
            PlatformCall::AddCapability("onoff".to_string()),
            PlatformCall::AddCapability("speaker_playing".to_string()),
            PlatformCall::AddCapability("remote_up".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_listener_for_missing_capability_is_an_error() {
    let platform = RecordingPlatform::with_capabilities(["onoff"]);

    let result = CapabilityListeners::register(&platform, ["onoff", "remote_up"]).await;

    assert!(matches!(result, Err(SdkError::UnknownCapability(name)) if name == "remote_up"));
}

#[tokio::test]
async fn test_listeners_after_sync() {
    let platform = RecordingPlatform::new();
    CapabilitySynchronizer::reconcile(DeviceKind::HomePod.capabilities(), &platform)
        .await
        .unwrap();

    let listeners = CapabilityListeners::register(&platform, ["speaker_playing", "volume_set"])
        .await
        .unwrap();

    assert!(listeners.contains("volume_set"));
    assert!(!listeners.contains("speaker_track"));
    assert_eq!(listeners.len(), 2);
}

fn subset() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(POOL.to_vec(), 0..=POOL.len())
}

proptest! {
    /// After one pass the platform holds exactly the declared set, and a
    /// second pass performs no structural changes
    #[test]
    fn prop_reconcile_converges(declared in subset(), current in subset()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        runtime.block_on(async {
            let platform = RecordingPlatform::with_capabilities(current.clone());

            let report = CapabilitySynchronizer::reconcile(&declared, &platform).await.unwrap();
            let now: BTreeSet<_> = platform.capabilities().await.into_iter().collect();
            let expected: BTreeSet<_> = declared.iter().map(|s| s.to_string()).collect();
            prop_assert_eq!(now, expected);
            prop_assert_eq!(report.added.len() + report.removed.len(), platform.structure_changes());

            platform.clear_calls();
            let again = CapabilitySynchronizer::reconcile(&declared, &platform).await.unwrap();
            prop_assert!(again.is_unchanged());
            prop_assert_eq!(platform.structure_changes(), 0);
            Ok(())
        })?;
    }
}
