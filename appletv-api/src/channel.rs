//! Channel client traits
//!
//! Handshake cryptography, record-layer encryption and wire framing live
//! behind these traits. Everything above them only sequences calls and
//! consumes typed events.

use std::fmt;
use std::sync::Arc;

use appletv_discovery::{Endpoint, ServiceKind};
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::control::{ControlEvent, ControlMessage, MediaCommand};
use crate::credentials::{Credentials, SessionKeys};
use crate::error::Result;
use crate::remote::{AttentionState, Button, LaunchableApp, PressMode, RemoteEvent, Topic, UserAccount};

/// Inbound events of a connected channel.
///
/// The stream ending without an explicit `disconnect` means the peer closed
/// the connection or the transport failed.
pub type EventStream<E> = mpsc::Receiver<E>;

/// The two accessory channel kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    RealtimeControl,
    RemoteInput,
}

impl ChannelKind {
    /// Discovery service the channel's endpoint is advertised under
    pub fn service(&self) -> ServiceKind {
        match self {
            ChannelKind::RealtimeControl => ServiceKind::RealtimeControl,
            ChannelKind::RemoteInput => ServiceKind::RemoteInput,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::RealtimeControl => f.write_str("realtime control"),
            ChannelKind::RemoteInput => f.write_str("remote input"),
        }
    }
}

/// Client for the realtime media-remote control channel
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Open the socket and start delivering inbound events
    async fn connect(&self) -> Result<EventStream<ControlEvent>>;

    async fn pair_verify(&self, credentials: &Credentials) -> Result<SessionKeys>;

    async fn enable_encryption(&self, keys: &SessionKeys) -> Result<()>;

    async fn setup_event_stream(&self, pairing_id: &[u8], shared_secret: &[u8]) -> Result<()>;

    async fn setup_data_stream(&self, shared_secret: &[u8]) -> Result<()>;

    /// Send a message and wait for the accessory's response to it
    async fn exchange(&self, message: ControlMessage) -> Result<ControlMessage>;

    async fn send(&self, message: ControlMessage) -> Result<()>;

    async fn send_keepalive(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}

/// Client for the remote/input channel
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    async fn connect(&self) -> Result<EventStream<RemoteEvent>>;

    async fn pair_verify(&self, credentials: &Credentials) -> Result<SessionKeys>;

    async fn enable_encryption(&self, keys: &SessionKeys) -> Result<()>;

    async fn system_info(&self, pairing_id: &[u8]) -> Result<()>;

    async fn touch_session_start(&self) -> Result<()>;

    async fn generic_session_start(&self) -> Result<()>;

    async fn remote_session_start(&self) -> Result<()>;

    async fn press_button(&self, button: Button, mode: PressMode) -> Result<()>;

    async fn media_control_command(&self, command: MediaCommand) -> Result<()>;

    async fn attention_state(&self) -> Result<AttentionState>;

    async fn subscribe(&self, topic: Topic) -> Result<()>;

    async fn unsubscribe(&self, topic: Topic) -> Result<()>;

    /// Ask the accessory to push the current `NowPlayingInfo` blob
    async fn fetch_now_playing_info(&self) -> Result<()>;

    async fn launchable_apps(&self) -> Result<Vec<LaunchableApp>>;

    async fn launch_app(&self, bundle_id: &str) -> Result<()>;

    async fn launch_url(&self, url: &Url) -> Result<()>;

    async fn user_accounts(&self) -> Result<Vec<UserAccount>>;

    async fn switch_user_account(&self, account_id: &str) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}

/// Opaque pair-setup message
#[derive(Clone, PartialEq, Eq)]
pub struct PairingFrame(pub Vec<u8>);

impl fmt::Debug for PairingFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingFrame({} bytes)", self.0.len())
    }
}

/// Client side of the pin-based pair-setup ceremony
#[async_trait]
pub trait PairSetup: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn start(&self) -> Result<()>;

    async fn m1(&self) -> Result<PairingFrame>;

    async fn m2(&self, m1: &PairingFrame, pin: &str) -> Result<PairingFrame>;

    async fn m3(&self, m2: &PairingFrame) -> Result<PairingFrame>;

    async fn m4(&self, m3: &PairingFrame) -> Result<PairingFrame>;

    async fn m5(&self, m4: &PairingFrame) -> Result<PairingFrame>;

    /// Finish the ceremony, yielding long-term credentials
    async fn m6(&self, m4: &PairingFrame, m5: &PairingFrame) -> Result<Credentials>;

    async fn disconnect(&self) -> Result<()>;
}

/// Builds unconnected channel clients for resolved endpoints
pub trait ChannelConnector: Send + Sync {
    fn control_channel(&self, endpoint: &Endpoint) -> Result<Arc<dyn ControlChannel>>;

    fn remote_channel(&self, endpoint: &Endpoint) -> Result<Arc<dyn RemoteChannel>>;

    fn pair_setup(&self, endpoint: &Endpoint) -> Result<Arc<dyn PairSetup>>;
}
