//! In-memory channel mocks for tests.
//!
//! Every mock records its calls into a [`CallLog`] that can be shared
//! across channels, so tests can assert on cross-channel ordering. Methods
//! can be configured to fail by name.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use appletv_discovery::Endpoint;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::channel::{ChannelConnector, ControlChannel, EventStream, PairSetup, PairingFrame, RemoteChannel};
use crate::control::{ControlEvent, ControlMessage, DeviceInfo, MediaCommand};
use crate::credentials::{Credentials, SessionKeys, StoredCredentials};
use crate::error::{ApiError, Result};
use crate::remote::{AttentionState, Button, LaunchableApp, PressMode, RemoteEvent, Topic, UserAccount};

const EVENT_BUFFER: usize = 64;

/// Ordered record of mock calls, e.g. `"control.connect"` or `"remote.subscribe(TVSystemStatus)"`
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls starting with `prefix`, in order
    pub fn calls_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    /// Index of the first occurrence of `call`
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Fixed credentials for tests
pub fn sample_credentials() -> Credentials {
    Credentials {
        accessory_identifier: "A1B2C3D4-0000-4000-8000-00000000CAFE".to_string(),
        accessory_long_term_public_key: vec![0x11; 32],
        pairing_id: b"controller-1".to_vec(),
        public_key: vec![0x22; 32],
        secret_key: vec![0x33; 32],
    }
}

pub fn sample_stored_credentials() -> StoredCredentials {
    sample_credentials().to_stored()
}

fn sample_keys() -> SessionKeys {
    SessionKeys {
        accessory_to_controller: vec![0xa0; 32],
        controller_to_accessory: vec![0xc0; 32],
        shared_secret: vec![0x5e; 32],
    }
}

fn failure(channel: &str, method: &str) -> ApiError {
    match method {
        "connect" => ApiError::Connection(format!("mock {channel} connect refused")),
        "pair_verify" => ApiError::Authentication(format!("mock {channel} pair-verify rejected")),
        "enable_encryption" => ApiError::Encryption(format!("mock {channel} encryption failure")),
        _ => ApiError::Protocol(format!("mock {channel} {method} failure")),
    }
}

/// Per-mock call recording and failure injection
#[derive(Debug)]
struct Recorder {
    channel: &'static str,
    log: Arc<CallLog>,
    failures: Mutex<HashSet<String>>,
    stalls: Mutex<HashSet<String>>,
}

impl Recorder {
    fn new(channel: &'static str, log: Arc<CallLog>) -> Self {
        Self {
            channel,
            log,
            failures: Mutex::new(HashSet::new()),
            stalls: Mutex::new(HashSet::new()),
        }
    }

    /// Record the call, then never return if `method` is set to stall
    async fn call_or_stall(&self, method: &str) -> Result<()> {
        self.call(method, None)?;
        let stalled = self.stalls.lock().contains(method);
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn call(&self, method: &str, detail: Option<String>) -> Result<()> {
        match detail {
            Some(detail) => self.log.record(format!("{}.{method}({detail})", self.channel)),
            None => self.log.record(format!("{}.{method}", self.channel)),
        }

        if self.failures.lock().contains(method) {
            return Err(failure(self.channel, method));
        }
        Ok(())
    }
}

/// Mock realtime control channel
#[derive(Debug)]
pub struct MockControlChannel {
    recorder: Recorder,
    events: Mutex<Option<mpsc::Sender<ControlEvent>>>,
    exchange_reply: Mutex<Option<ControlMessage>>,
    sent: Mutex<Vec<ControlMessage>>,
    keepalives: AtomicU32,
    endpoint: Option<Endpoint>,
}

impl MockControlChannel {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            recorder: Recorder::new("control", log),
            events: Mutex::new(None),
            exchange_reply: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            keepalives: AtomicU32::new(0),
            endpoint: None,
        }
    }

    fn for_endpoint(log: Arc<CallLog>, endpoint: &Endpoint) -> Self {
        let mut channel = Self::with_log(log);
        channel.endpoint = Some(endpoint.clone());
        channel
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.recorder.log)
    }

    /// Make `method` fail from now on
    pub fn fail_on(&self, method: &str) {
        self.recorder.failures.lock().insert(method.to_string());
    }

    /// Make `method` hang forever from now on (handshake steps only)
    pub fn stall_on(&self, method: &str) {
        self.recorder.stalls.lock().insert(method.to_string());
    }

    /// Reply `exchange` with this message instead of the device-info acknowledgement
    pub fn set_exchange_reply(&self, reply: ControlMessage) {
        *self.exchange_reply.lock() = Some(reply);
    }

    /// Every message passed to `send` or `exchange`, in order
    pub fn sent(&self) -> Vec<ControlMessage> {
        self.sent.lock().clone()
    }

    pub fn keepalive_count(&self) -> u32 {
        self.keepalives.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.events.lock().is_some()
    }

    /// Deliver an inbound event; `false` when not connected
    pub async fn emit(&self, event: ControlEvent) -> bool {
        let sender = self.events.lock().clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Drop the event stream, as a peer close would
    pub fn close(&self) {
        self.events.lock().take();
    }
}

impl Default for MockControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlChannel for MockControlChannel {
    async fn connect(&self) -> Result<EventStream<ControlEvent>> {
        self.recorder.call("connect", None)?;
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        *self.events.lock() = Some(sender);
        Ok(receiver)
    }

    async fn pair_verify(&self, _credentials: &Credentials) -> Result<SessionKeys> {
        self.recorder.call("pair_verify", None)?;
        Ok(sample_keys())
    }

    async fn enable_encryption(&self, _keys: &SessionKeys) -> Result<()> {
        self.recorder.call("enable_encryption", None)
    }

    async fn setup_event_stream(&self, _pairing_id: &[u8], _shared_secret: &[u8]) -> Result<()> {
        self.recorder.call_or_stall("setup_event_stream").await
    }

    async fn setup_data_stream(&self, _shared_secret: &[u8]) -> Result<()> {
        self.recorder.call_or_stall("setup_data_stream").await
    }

    async fn exchange(&self, message: ControlMessage) -> Result<ControlMessage> {
        self.recorder.call("exchange", Some(message.kind().to_string()))?;
        self.sent.lock().push(message.clone());

        if let Some(reply) = self.exchange_reply.lock().clone() {
            return Ok(reply);
        }

        Ok(match message {
            ControlMessage::DeviceInfo(_) => ControlMessage::DeviceInfo(DeviceInfo {
                name: "Mock Accessory".to_string(),
                unique_identifier: "mock-accessory".to_string(),
                system_build_version: "21K69".to_string(),
                protocol_version: 1,
            }),
            other => other,
        })
    }

    async fn send(&self, message: ControlMessage) -> Result<()> {
        self.recorder.call("send", Some(message.kind().to_string()))?;
        self.sent.lock().push(message);
        Ok(())
    }

    async fn send_keepalive(&self) -> Result<()> {
        self.keepalives.fetch_add(1, Ordering::SeqCst);
        self.recorder.call("send_keepalive", None)
    }

    async fn disconnect(&self) -> Result<()> {
        self.close();
        self.recorder.call("disconnect", None)
    }
}

/// Mock remote/input channel
#[derive(Debug)]
pub struct MockRemoteChannel {
    recorder: Recorder,
    events: Mutex<Option<mpsc::Sender<RemoteEvent>>>,
    attention: Mutex<AttentionState>,
    apps: Mutex<Vec<LaunchableApp>>,
    accounts: Mutex<Vec<UserAccount>>,
    presses: Mutex<Vec<(Button, PressMode)>>,
    commands: Mutex<Vec<MediaCommand>>,
    subscriptions: Mutex<Vec<Topic>>,
    endpoint: Option<Endpoint>,
}

impl MockRemoteChannel {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            recorder: Recorder::new("remote", log),
            events: Mutex::new(None),
            attention: Mutex::new(AttentionState::Awake),
            apps: Mutex::new(Vec::new()),
            accounts: Mutex::new(Vec::new()),
            presses: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            endpoint: None,
        }
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.recorder.log)
    }

    pub fn fail_on(&self, method: &str) {
        self.recorder.failures.lock().insert(method.to_string());
    }

    pub fn set_attention_state(&self, state: AttentionState) {
        *self.attention.lock() = state;
    }

    pub fn set_launchable_apps(&self, apps: Vec<LaunchableApp>) {
        *self.apps.lock() = apps;
    }

    pub fn set_user_accounts(&self, accounts: Vec<UserAccount>) {
        *self.accounts.lock() = accounts;
    }

    pub fn presses(&self) -> Vec<(Button, PressMode)> {
        self.presses.lock().clone()
    }

    pub fn commands(&self) -> Vec<MediaCommand> {
        self.commands.lock().clone()
    }

    /// Topics currently subscribed
    pub fn subscriptions(&self) -> Vec<Topic> {
        self.subscriptions.lock().clone()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.events.lock().is_some()
    }

    pub async fn emit(&self, event: RemoteEvent) -> bool {
        let sender = self.events.lock().clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    pub fn close(&self) {
        self.events.lock().take();
    }
}

impl Default for MockRemoteChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteChannel for MockRemoteChannel {
    async fn connect(&self) -> Result<EventStream<RemoteEvent>> {
        self.recorder.call("connect", None)?;
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        *self.events.lock() = Some(sender);
        Ok(receiver)
    }

    async fn pair_verify(&self, _credentials: &Credentials) -> Result<SessionKeys> {
        self.recorder.call("pair_verify", None)?;
        Ok(sample_keys())
    }

    async fn enable_encryption(&self, _keys: &SessionKeys) -> Result<()> {
        self.recorder.call("enable_encryption", None)
    }

    async fn system_info(&self, _pairing_id: &[u8]) -> Result<()> {
        self.recorder.call("system_info", None)
    }

    async fn touch_session_start(&self) -> Result<()> {
        self.recorder.call("touch_session_start", None)
    }

    async fn generic_session_start(&self) -> Result<()> {
        self.recorder.call("generic_session_start", None)
    }

    async fn remote_session_start(&self) -> Result<()> {
        self.recorder.call("remote_session_start", None)
    }

    async fn press_button(&self, button: Button, mode: PressMode) -> Result<()> {
        self.recorder.call("press_button", Some(format!("{button:?}")))?;
        self.presses.lock().push((button, mode));
        Ok(())
    }

    async fn media_control_command(&self, command: MediaCommand) -> Result<()> {
        self.recorder.call("media_control_command", Some(command.to_string()))?;
        self.commands.lock().push(command);
        Ok(())
    }

    async fn attention_state(&self) -> Result<AttentionState> {
        self.recorder.call("attention_state", None)?;
        Ok(*self.attention.lock())
    }

    async fn subscribe(&self, topic: Topic) -> Result<()> {
        self.recorder.call("subscribe", Some(topic.to_string()))?;
        self.subscriptions.lock().push(topic);
        Ok(())
    }

    async fn unsubscribe(&self, topic: Topic) -> Result<()> {
        self.recorder.call("unsubscribe", Some(topic.to_string()))?;
        self.subscriptions.lock().retain(|t| *t != topic);
        Ok(())
    }

    async fn fetch_now_playing_info(&self) -> Result<()> {
        self.recorder.call("fetch_now_playing_info", None)
    }

    async fn launchable_apps(&self) -> Result<Vec<LaunchableApp>> {
        self.recorder.call("launchable_apps", None)?;
        Ok(self.apps.lock().clone())
    }

    async fn launch_app(&self, bundle_id: &str) -> Result<()> {
        self.recorder.call("launch_app", Some(bundle_id.to_string()))
    }

    async fn launch_url(&self, url: &Url) -> Result<()> {
        self.recorder.call("launch_url", Some(url.to_string()))
    }

    async fn user_accounts(&self) -> Result<Vec<UserAccount>> {
        self.recorder.call("user_accounts", None)?;
        Ok(self.accounts.lock().clone())
    }

    async fn switch_user_account(&self, account_id: &str) -> Result<()> {
        self.recorder.call("switch_user_account", Some(account_id.to_string()))
    }

    async fn disconnect(&self) -> Result<()> {
        self.close();
        self.recorder.call("disconnect", None)
    }
}

/// Mock pair-setup client producing deterministic frames
#[derive(Debug)]
pub struct MockPairSetup {
    recorder: Recorder,
    pins: Mutex<Vec<String>>,
    credentials: Mutex<Credentials>,
}

impl MockPairSetup {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            recorder: Recorder::new("pairing", log),
            pins: Mutex::new(Vec::new()),
            credentials: Mutex::new(sample_credentials()),
        }
    }

    pub fn fail_on(&self, method: &str) {
        self.recorder.failures.lock().insert(method.to_string());
    }

    /// Pins passed to `m2`
    pub fn pins(&self) -> Vec<String> {
        self.pins.lock().clone()
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.lock() = credentials;
    }
}

impl Default for MockPairSetup {
    fn default() -> Self {
        Self::new()
    }
}

fn frame(name: &str, previous: &PairingFrame) -> PairingFrame {
    let mut bytes = name.as_bytes().to_vec();
    bytes.extend_from_slice(&previous.0);
    PairingFrame(bytes)
}

#[async_trait]
impl PairSetup for MockPairSetup {
    async fn connect(&self) -> Result<()> {
        self.recorder.call("connect", None)
    }

    async fn start(&self) -> Result<()> {
        self.recorder.call("start", None)
    }

    async fn m1(&self) -> Result<PairingFrame> {
        self.recorder.call("m1", None)?;
        Ok(PairingFrame(b"m1".to_vec()))
    }

    async fn m2(&self, m1: &PairingFrame, pin: &str) -> Result<PairingFrame> {
        self.recorder.call("m2", None)?;
        self.pins.lock().push(pin.to_string());
        Ok(frame("m2", m1))
    }

    async fn m3(&self, m2: &PairingFrame) -> Result<PairingFrame> {
        self.recorder.call("m3", None)?;
        Ok(frame("m3", m2))
    }

    async fn m4(&self, m3: &PairingFrame) -> Result<PairingFrame> {
        self.recorder.call("m4", None)?;
        Ok(frame("m4", m3))
    }

    async fn m5(&self, m4: &PairingFrame) -> Result<PairingFrame> {
        self.recorder.call("m5", None)?;
        Ok(frame("m5", m4))
    }

    async fn m6(&self, _m4: &PairingFrame, _m5: &PairingFrame) -> Result<Credentials> {
        self.recorder.call("m6", None)?;
        Ok(self.credentials.lock().clone())
    }

    async fn disconnect(&self) -> Result<()> {
        self.recorder.call("disconnect", None)
    }
}

/// Mock connector handing out fresh mocks that share one call log.
///
/// Failure settings apply to every channel created after they are set, so
/// reconnect attempts see them too.
#[derive(Debug)]
pub struct MockConnector {
    log: Arc<CallLog>,
    controls: Mutex<Vec<Arc<MockControlChannel>>>,
    remotes: Mutex<Vec<Arc<MockRemoteChannel>>>,
    pair_setups: Mutex<Vec<Arc<MockPairSetup>>>,
    control_failures: Mutex<HashSet<String>>,
    remote_failures: Mutex<HashSet<String>>,
    pairing_failures: Mutex<HashSet<String>>,
    control_stalls: Mutex<HashSet<String>>,
    failing_control_connects: AtomicU32,
    failing_remote_connects: AtomicU32,
    attention: Mutex<AttentionState>,
    apps: Mutex<Vec<LaunchableApp>>,
    accounts: Mutex<Vec<UserAccount>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            log: CallLog::new(),
            controls: Mutex::new(Vec::new()),
            remotes: Mutex::new(Vec::new()),
            pair_setups: Mutex::new(Vec::new()),
            control_failures: Mutex::new(HashSet::new()),
            remote_failures: Mutex::new(HashSet::new()),
            pairing_failures: Mutex::new(HashSet::new()),
            control_stalls: Mutex::new(HashSet::new()),
            failing_control_connects: AtomicU32::new(0),
            failing_remote_connects: AtomicU32::new(0),
            attention: Mutex::new(AttentionState::Awake),
            apps: Mutex::new(Vec::new()),
            accounts: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }

    pub fn fail_control_on(&self, method: &str) {
        self.control_failures.lock().insert(method.to_string());
    }

    pub fn fail_remote_on(&self, method: &str) {
        self.remote_failures.lock().insert(method.to_string());
    }

    pub fn fail_pairing_on(&self, method: &str) {
        self.pairing_failures.lock().insert(method.to_string());
    }

    /// Control channels created from now on hang in `method`
    pub fn stall_control_on(&self, method: &str) {
        self.control_stalls.lock().insert(method.to_string());
    }

    /// Remove all persistent failure and stall settings
    pub fn clear_failures(&self) {
        self.control_stalls.lock().clear();
        self.control_failures.lock().clear();
        self.remote_failures.lock().clear();
        self.pairing_failures.lock().clear();
    }

    /// The next `count` control channels created fail to connect
    pub fn fail_next_control_connects(&self, count: u32) {
        self.failing_control_connects.store(count, Ordering::SeqCst);
    }

    /// The next `count` remote channels created fail to connect
    pub fn fail_next_remote_connects(&self, count: u32) {
        self.failing_remote_connects.store(count, Ordering::SeqCst);
    }

    pub fn set_attention_state(&self, state: AttentionState) {
        *self.attention.lock() = state;
    }

    pub fn set_launchable_apps(&self, apps: Vec<LaunchableApp>) {
        *self.apps.lock() = apps;
    }

    pub fn set_user_accounts(&self, accounts: Vec<UserAccount>) {
        *self.accounts.lock() = accounts;
    }

    pub fn control_count(&self) -> usize {
        self.controls.lock().len()
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.lock().len()
    }

    pub fn latest_control(&self) -> Option<Arc<MockControlChannel>> {
        self.controls.lock().last().cloned()
    }

    pub fn latest_remote(&self) -> Option<Arc<MockRemoteChannel>> {
        self.remotes.lock().last().cloned()
    }

    pub fn latest_pair_setup(&self) -> Option<Arc<MockPairSetup>> {
        self.pair_setups.lock().last().cloned()
    }

    pub fn controls(&self) -> Vec<Arc<MockControlChannel>> {
        self.controls.lock().clone()
    }

    pub fn remotes(&self) -> Vec<Arc<MockRemoteChannel>> {
        self.remotes.lock().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl ChannelConnector for MockConnector {
    fn control_channel(&self, endpoint: &Endpoint) -> Result<Arc<dyn ControlChannel>> {
        let channel = Arc::new(MockControlChannel::for_endpoint(self.log(), endpoint));
        for method in self.control_failures.lock().iter() {
            channel.fail_on(method);
        }
        for method in self.control_stalls.lock().iter() {
            channel.stall_on(method);
        }
        if take_one(&self.failing_control_connects) {
            channel.fail_on("connect");
        }

        self.controls.lock().push(Arc::clone(&channel));
        Ok(channel as Arc<dyn ControlChannel>)
    }

    fn remote_channel(&self, endpoint: &Endpoint) -> Result<Arc<dyn RemoteChannel>> {
        let mut channel = MockRemoteChannel::with_log(self.log());
        channel.endpoint = Some(endpoint.clone());
        channel.set_attention_state(*self.attention.lock());
        channel.set_launchable_apps(self.apps.lock().clone());
        channel.set_user_accounts(self.accounts.lock().clone());

        let channel = Arc::new(channel);
        for method in self.remote_failures.lock().iter() {
            channel.fail_on(method);
        }
        if take_one(&self.failing_remote_connects) {
            channel.fail_on("connect");
        }

        self.remotes.lock().push(Arc::clone(&channel));
        Ok(channel as Arc<dyn RemoteChannel>)
    }

    fn pair_setup(&self, _endpoint: &Endpoint) -> Result<Arc<dyn PairSetup>> {
        let pairing = Arc::new(MockPairSetup::with_log(self.log()));
        for method in self.pairing_failures.lock().iter() {
            pairing.fail_on(method);
        }

        self.pair_setups.lock().push(Arc::clone(&pairing));
        Ok(pairing as Arc<dyn PairSetup>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpoint() -> Endpoint {
        Endpoint {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7000,
            service_metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_connector_shares_one_log() {
        let connector = MockConnector::new();
        let control = connector.control_channel(&endpoint()).unwrap();
        let remote = connector.remote_channel(&endpoint()).unwrap();

        control.connect().await.unwrap();
        remote.subscribe(Topic::SystemStatus).await.unwrap();

        assert_eq!(
            connector.log().calls(),
            vec!["control.connect", "remote.subscribe(TVSystemStatus)"]
        );
    }

    #[tokio::test]
    async fn test_failing_connects_are_consumed_in_order() {
        let connector = MockConnector::new();
        connector.fail_next_control_connects(1);

        let first = connector.control_channel(&endpoint()).unwrap();
        let second = connector.control_channel(&endpoint()).unwrap();

        assert!(matches!(first.connect().await, Err(ApiError::Connection(_))));
        assert!(second.connect().await.is_ok());
        assert_eq!(connector.control_count(), 2);
    }

    #[tokio::test]
    async fn test_close_ends_event_stream() {
        let channel = MockControlChannel::new();
        let mut events = channel.connect().await.unwrap();

        assert!(channel.emit(ControlEvent::VolumeChanged(0.5)).await);
        channel.close();

        assert_eq!(events.recv().await, Some(ControlEvent::VolumeChanged(0.5)));
        assert_eq!(events.recv().await, None);
        assert!(!channel.emit(ControlEvent::VolumeChanged(0.1)).await);
    }

    #[tokio::test]
    async fn test_exchange_acknowledges_device_info() {
        let channel = MockControlChannel::new();
        let reply = channel
            .exchange(ControlMessage::DeviceInfo(DeviceInfo {
                name: "Bridge".to_string(),
                unique_identifier: "bridge".to_string(),
                system_build_version: "1".to_string(),
                protocol_version: 1,
            }))
            .await
            .unwrap();

        assert!(matches!(reply, ControlMessage::DeviceInfo(_)));
        assert_eq!(channel.log().calls(), vec!["control.exchange(DeviceInfo)"]);
    }
}
