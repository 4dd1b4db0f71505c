//! A live set of encrypted channels for one device

use std::future;
use std::sync::Arc;

use appletv_api::{
    ChannelKind, ControlChannel, ControlEvent, EventStream, RemoteChannel, RemoteEvent, SessionKeys,
};
use tracing::{debug, info, warn};

use crate::keepalive::KeepaliveTask;

/// Encrypted realtime control channel and its inbound events
pub struct ControlSession {
    pub(crate) channel: Arc<dyn ControlChannel>,
    pub(crate) events: EventStream<ControlEvent>,
    pub(crate) keys: SessionKeys,
}

/// Encrypted remote/input channel and its inbound events
pub struct RemoteSession {
    pub(crate) channel: Arc<dyn RemoteChannel>,
    pub(crate) events: EventStream<RemoteEvent>,
    pub(crate) keys: SessionKeys,
}

/// Anything a session can report to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Control(ControlEvent),
    Remote(RemoteEvent),
    /// A channel's event stream ended without an explicit disconnect
    Disconnected(ChannelKind),
}

/// Result of a successful connect.
///
/// Holds at most one channel per kind; dropping the session stops its
/// keepalive but leaves the sockets to their owners, so tear it down with
/// [`Session::disconnect`].
pub struct Session {
    pub(crate) control: Option<ControlSession>,
    pub(crate) remote: Option<RemoteSession>,
    pub(crate) keepalive: Option<KeepaliveTask>,
}

impl Session {
    pub fn control(&self) -> Option<&Arc<dyn ControlChannel>> {
        self.control.as_ref().map(|session| &session.channel)
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteChannel>> {
        self.remote.as_ref().map(|session| &session.channel)
    }

    pub fn keys(&self, kind: ChannelKind) -> Option<&SessionKeys> {
        match kind {
            ChannelKind::RealtimeControl => self.control.as_ref().map(|s| &s.keys),
            ChannelKind::RemoteInput => self.remote.as_ref().map(|s| &s.keys),
        }
    }

    pub fn has_keepalive(&self) -> bool {
        self.keepalive.as_ref().is_some_and(KeepaliveTask::is_running)
    }

    /// Wait for the next inbound event from any channel.
    ///
    /// Cancel safe, so it can sit in a `select!` next to other sources.
    pub async fn next_event(&mut self) -> SessionEvent {
        let control = self.control.as_mut().map(|s| &mut s.events);
        let remote = self.remote.as_mut().map(|s| &mut s.events);

        tokio::select! {
            event = recv_or_pending(control) => match event {
                Some(event) => SessionEvent::Control(event),
                None => SessionEvent::Disconnected(ChannelKind::RealtimeControl),
            },
            event = recv_or_pending(remote) => match event {
                Some(event) => SessionEvent::Remote(event),
                None => SessionEvent::Disconnected(ChannelKind::RemoteInput),
            },
        }
    }

    /// Expected teardown: stop the keepalive, then close every channel
    pub async fn disconnect(mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.stop().await;
        }

        if let Some(control) = self.control.take() {
            if let Err(err) = control.channel.disconnect().await {
                warn!(error = %err, "Failed to disconnect realtime control channel");
            }
        }

        if let Some(remote) = self.remote.take() {
            if let Err(err) = remote.channel.disconnect().await {
                warn!(error = %err, "Failed to disconnect remote input channel");
            }
        }

        info!("Session disconnected");
    }
}

async fn recv_or_pending<E>(events: Option<&mut EventStream<E>>) -> Option<E> {
    match events {
        Some(events) => events.recv().await,
        None => {
            debug!("No channel of this kind in session");
            future::pending().await
        }
    }
}
