//! Ordered connect sequence and the reconnect loop

use std::sync::Arc;

use appletv_api::{
    ChannelConnector, ChannelKind, ClientUpdatesConfig, ConnectionState, ControlChannel, ControlEvent,
    ControlMessage, Credentials, DeviceIdentity, DeviceInfo, EventStream, RemoteChannel, RemoteEvent,
    SessionKeys,
};
use appletv_discovery::{resolve_endpoint, DiscoveryResolver, Endpoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::ChannelAdapter;
use crate::config::SessionConfig;
use crate::error::{ConnectStage, Result, SessionError};
use crate::keepalive::KeepaliveTask;
use crate::session::{ControlSession, RemoteSession, Session};

/// Build identifier announced in the device-info exchange
const SYSTEM_BUILD_VERSION: &str = "18M60";
const PROTOCOL_VERSION: u32 = 1;

/// A channel opened by an attempt, tracked so a failed attempt can close it
enum OpenedChannel {
    Control(Arc<dyn ControlChannel>),
    Remote(Arc<dyn RemoteChannel>),
}

type VerifiedControl = (Arc<dyn ControlChannel>, EventStream<ControlEvent>, SessionKeys);
type VerifiedRemote = (Arc<dyn RemoteChannel>, EventStream<RemoteEvent>, SessionKeys);

/// Turns a device identity into a connected [`Session`].
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = SessionOrchestrator::new(identity, ChannelAdapter::Both, resolver, connector);
/// let mut session = orchestrator.connect().await?;
/// let event = session.next_event().await;
/// ```
pub struct SessionOrchestrator {
    identity: DeviceIdentity,
    adapter: ChannelAdapter,
    resolver: Arc<dyn DiscoveryResolver>,
    connector: Arc<dyn ChannelConnector>,
    config: SessionConfig,
}

impl SessionOrchestrator {
    pub fn new(
        identity: DeviceIdentity,
        adapter: ChannelAdapter,
        resolver: Arc<dyn DiscoveryResolver>,
        connector: Arc<dyn ChannelConnector>,
    ) -> Self {
        Self::with_config(identity, adapter, resolver, connector, SessionConfig::default())
    }

    pub fn with_config(
        identity: DeviceIdentity,
        adapter: ChannelAdapter,
        resolver: Arc<dyn DiscoveryResolver>,
        connector: Arc<dyn ChannelConnector>,
        config: SessionConfig,
    ) -> Self {
        Self {
            identity,
            adapter,
            resolver,
            connector,
            config,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn adapter(&self) -> ChannelAdapter {
        self.adapter
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the full connect sequence once.
    ///
    /// Endpoints are resolved first, then every channel is opened and
    /// verified, then encrypted, then the remote/input bring-up runs, then
    /// the realtime control handshake. Any channel opened by a failing
    /// attempt is disconnected before the error is returned.
    pub async fn connect(&self) -> Result<Session> {
        self.attempt(&CancellationToken::new()).await
    }

    /// Retry [`Self::connect`] every `reconnect_delay` until it succeeds.
    ///
    /// Returns `None` once `cancel` fires, whether during the delay or
    /// during an attempt. Channels opened by a cancelled attempt are closed
    /// before returning.
    pub async fn reconnect(&self, cancel: &CancellationToken) -> Option<Session> {
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(device = %self.identity.id, "Reconnect cancelled");
                    return None;
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }

            attempt = attempt.saturating_add(1);
            info!(device = %self.identity.id, attempt, "Reconnecting");

            match self.attempt(cancel).await {
                Ok(session) => return Some(session),
                Err(SessionError::Cancelled) => {
                    info!(device = %self.identity.id, "Reconnect cancelled");
                    return None;
                }
                Err(err) => {
                    warn!(device = %self.identity.id, attempt, error = %err, "Reconnect attempt failed");
                }
            }
        }
    }

    /// One connect attempt that stops early when `cancel` fires
    async fn attempt(&self, cancel: &CancellationToken) -> Result<Session> {
        let credentials =
            Credentials::from_stored(&self.identity.credentials).map_err(SessionError::Credentials)?;

        let endpoints = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            endpoints = self.resolve_endpoints() => endpoints?,
        };

        // Owned here so the channels survive a cancelled `establish`
        let mut opened = Vec::new();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            result = self.establish(&credentials, &endpoints, &mut opened) => result,
        };

        match result {
            Ok(session) => {
                info!(device = %self.identity.id, adapter = ?self.adapter, "Session established");
                Ok(session)
            }
            Err(err) => {
                match &err {
                    SessionError::Cancelled => debug!(device = %self.identity.id, "Connect attempt cancelled"),
                    _ => warn!(device = %self.identity.id, error = %err, "Connect attempt failed"),
                }
                close_opened(opened).await;
                Err(err)
            }
        }
    }

    async fn resolve_endpoints(&self) -> Result<Vec<(ChannelKind, Endpoint)>> {
        let mut endpoints = Vec::with_capacity(2);
        for kind in self.adapter.channel_kinds() {
            let endpoint = resolve_endpoint(
                self.resolver.as_ref(),
                kind.service(),
                &self.identity.id,
                self.config.resolve_timeout,
            )
            .await?;
            debug!(device = %self.identity.id, %kind, address = %endpoint.socket_addr(), "Resolved endpoint");
            endpoints.push((*kind, endpoint));
        }
        Ok(endpoints)
    }

    async fn establish(
        &self,
        credentials: &Credentials,
        endpoints: &[(ChannelKind, Endpoint)],
        opened: &mut Vec<OpenedChannel>,
    ) -> Result<Session> {
        let mut control: Option<VerifiedControl> = None;
        let mut remote: Option<VerifiedRemote> = None;

        for (kind, endpoint) in endpoints {
            match kind {
                ChannelKind::RealtimeControl => {
                    let channel = self
                        .connector
                        .control_channel(endpoint)
                        .map_err(SessionError::channel(*kind, ConnectStage::Open))?;
                    opened.push(OpenedChannel::Control(Arc::clone(&channel)));

                    let events = channel
                        .connect()
                        .await
                        .map_err(SessionError::channel(*kind, ConnectStage::Connect))?;
                    let keys = channel
                        .pair_verify(credentials)
                        .await
                        .map_err(SessionError::channel(*kind, ConnectStage::PairVerify))?;
                    control = Some((channel, events, keys));
                }
                ChannelKind::RemoteInput => {
                    let channel = self
                        .connector
                        .remote_channel(endpoint)
                        .map_err(SessionError::channel(*kind, ConnectStage::Open))?;
                    opened.push(OpenedChannel::Remote(Arc::clone(&channel)));

                    let events = channel
                        .connect()
                        .await
                        .map_err(SessionError::channel(*kind, ConnectStage::Connect))?;
                    let keys = channel
                        .pair_verify(credentials)
                        .await
                        .map_err(SessionError::channel(*kind, ConnectStage::PairVerify))?;
                    remote = Some((channel, events, keys));
                }
            }
            debug!(device = %self.identity.id, %kind, "Pair-verify complete");
        }

        if let Some((channel, _, keys)) = &control {
            channel
                .enable_encryption(keys)
                .await
                .map_err(SessionError::channel(ChannelKind::RealtimeControl, ConnectStage::EnableEncryption))?;
        }
        if let Some((channel, _, keys)) = &remote {
            channel
                .enable_encryption(keys)
                .await
                .map_err(SessionError::channel(ChannelKind::RemoteInput, ConnectStage::EnableEncryption))?;
        }

        if let Some((channel, _, _)) = &remote {
            remote_bring_up(channel.as_ref(), credentials).await?;
        }

        if let Some((channel, _, keys)) = &control {
            self.control_handshake(channel.as_ref(), credentials, keys).await?;
        }

        let keepalive = match (&control, self.config.keepalive_interval) {
            (Some((channel, _, _)), Some(interval)) => Some(KeepaliveTask::spawn(Arc::clone(channel), interval)),
            _ => None,
        };

        Ok(Session {
            control: control.map(|(channel, events, keys)| ControlSession { channel, events, keys }),
            remote: remote.map(|(channel, events, keys)| RemoteSession { channel, events, keys }),
            keepalive,
        })
    }

    async fn control_handshake(
        &self,
        channel: &dyn ControlChannel,
        credentials: &Credentials,
        keys: &SessionKeys,
    ) -> Result<()> {
        let kind = ChannelKind::RealtimeControl;

        channel
            .setup_event_stream(&credentials.pairing_id, &keys.shared_secret)
            .await
            .map_err(SessionError::channel(kind, ConnectStage::SetupEventStream))?;
        channel
            .setup_data_stream(&keys.shared_secret)
            .await
            .map_err(SessionError::channel(kind, ConnectStage::SetupDataStream))?;

        let response = channel
            .exchange(ControlMessage::DeviceInfo(self.device_info(credentials)))
            .await
            .map_err(SessionError::channel(kind, ConnectStage::DeviceInfoExchange))?;

        match response {
            ControlMessage::DeviceInfo(accessory) => {
                debug!(accessory = %accessory.name, build = %accessory.system_build_version, "Device info acknowledged");
            }
            other => {
                return Err(SessionError::Handshake(format!(
                    "expected device info acknowledgement, got {}",
                    other.kind()
                )));
            }
        }

        channel
            .send(ControlMessage::SetConnectionState(ConnectionState::Connected))
            .await
            .map_err(SessionError::channel(kind, ConnectStage::ConnectionState))?;
        channel
            .send(ControlMessage::ClientUpdatesConfig(ClientUpdatesConfig::default()))
            .await
            .map_err(SessionError::channel(kind, ConnectStage::ClientUpdatesConfig))?;

        Ok(())
    }

    fn device_info(&self, credentials: &Credentials) -> DeviceInfo {
        DeviceInfo {
            name: self.config.client_name.clone(),
            unique_identifier: String::from_utf8_lossy(&credentials.pairing_id).into_owned(),
            system_build_version: SYSTEM_BUILD_VERSION.to_string(),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

async fn remote_bring_up(channel: &dyn RemoteChannel, credentials: &Credentials) -> Result<()> {
    let kind = ChannelKind::RemoteInput;

    channel
        .system_info(&credentials.pairing_id)
        .await
        .map_err(SessionError::channel(kind, ConnectStage::SystemInfo))?;
    channel
        .touch_session_start()
        .await
        .map_err(SessionError::channel(kind, ConnectStage::TouchSessionStart))?;
    channel
        .generic_session_start()
        .await
        .map_err(SessionError::channel(kind, ConnectStage::GenericSessionStart))?;
    channel
        .remote_session_start()
        .await
        .map_err(SessionError::channel(kind, ConnectStage::RemoteSessionStart))?;

    Ok(())
}

async fn close_opened(opened: Vec<OpenedChannel>) {
    for channel in opened {
        let result = match &channel {
            OpenedChannel::Control(channel) => channel.disconnect().await,
            OpenedChannel::Remote(channel) => channel.disconnect().await,
        };
        if let Err(err) = result {
            debug!(error = %err, "Ignoring disconnect failure after failed attempt");
        }
    }
}
