//! One running accessory: startup, the event loop, and its handle

use std::sync::Arc;

use appletv_api::{ChannelConnector, DeviceIdentity, Topic};
use appletv_discovery::DiscoveryResolver;
use appletv_session::{Session, SessionEvent, SessionOrchestrator};
use appletv_state::{CapabilityValue, MediaStateReconciler, Platform};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::actions::{
    self, account_suggestions, app_suggestions, ActionOutcome, AutocompleteItem, FlowAction,
};
use crate::capabilities::{CapabilityListeners, CapabilitySynchronizer};
use crate::commands;
use crate::config::DeviceConfig;
use crate::error::{Result, SdkError};
use crate::kind::DeviceKind;

/// Reason reported to the platform while a dropped session is re-established
const RECONNECTING: &str = "Connection lost, reconnecting";

enum DeviceCommand {
    WriteCapability {
        name: String,
        value: CapabilityValue,
        reply: oneshot::Sender<Result<()>>,
    },
    Action {
        action: FlowAction,
        reply: oneshot::Sender<Result<ActionOutcome>>,
    },
}

impl DeviceCommand {
    fn reject(self, err: SdkError) {
        // A caller that stopped waiting has nothing to be told
        match self {
            DeviceCommand::WriteCapability { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            DeviceCommand::Action { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

/// Collaborators a device is started with
#[derive(Clone)]
pub struct DeviceContext {
    pub platform: Arc<dyn Platform>,
    pub resolver: Arc<dyn DiscoveryResolver>,
    pub connector: Arc<dyn ChannelConnector>,
}

/// A bridged accessory.
///
/// Start it with [`Device::start`]; the returned [`DeviceHandle`] is the
/// only way to talk to it afterwards.
pub struct Device;

impl Device {
    /// Bring a device up.
    ///
    /// Capabilities are synchronised first, then listeners registered,
    /// then the session connected. If the initial connect fails the
    /// platform marks the device unavailable with the error and no retry
    /// happens. Once connected, the device reconnects on its own whenever
    /// a channel drops, until [`DeviceHandle::shutdown`].
    pub async fn start(
        kind: DeviceKind,
        identity: DeviceIdentity,
        context: DeviceContext,
        config: DeviceConfig,
    ) -> Result<DeviceHandle> {
        config.validate()?;
        let DeviceContext {
            platform,
            resolver,
            connector,
        } = context;
        let id = identity.id.clone();
        info!(device = %id, %kind, "Device initializing");

        CapabilitySynchronizer::reconcile(kind.capabilities(), platform.as_ref()).await?;
        let listeners =
            CapabilityListeners::register(platform.as_ref(), commands::command_capabilities(kind))
                .await?;

        let orchestrator = SessionOrchestrator::with_config(
            identity,
            kind.adapter(),
            resolver,
            connector,
            config.session.clone(),
        );
        let mut reconciler = MediaStateReconciler::new(
            Arc::clone(&platform),
            kind.capabilities().iter().copied(),
            config.reconciler.clone(),
        );

        let session = match connect_and_attach(&orchestrator, &mut reconciler).await {
            Ok(session) => session,
            Err(err) => {
                error!(device = %id, error = %err, "Initial connect failed");
                if let Err(platform_err) = platform.set_unavailable(&err.to_string()).await {
                    warn!(device = %id, error = %platform_err, "Failed to mark device unavailable");
                }
                return Err(err);
            }
        };
        if let Err(err) = platform.set_available().await {
            session.disconnect().await;
            return Err(err.into());
        }
        info!(device = %id, "Device connected");

        let (commands, receiver) = mpsc::channel(config.command_buffer);
        let cancel = CancellationToken::new();
        let runtime = DeviceRuntime {
            kind,
            id: id.clone(),
            platform,
            orchestrator,
            reconciler,
            listeners,
            session: Some(session),
            commands: receiver,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(runtime.run());

        Ok(DeviceHandle {
            kind,
            id,
            commands,
            cancel,
            task: Some(task),
        })
    }
}

/// Connect once and subscribe the remote topics the reconciler consumes
async fn connect_and_attach(
    orchestrator: &SessionOrchestrator,
    reconciler: &mut MediaStateReconciler,
) -> Result<Session> {
    let session = orchestrator.connect().await?;
    match attach(&session, reconciler).await {
        Ok(()) => Ok(session),
        Err(err) => {
            session.disconnect().await;
            Err(err)
        }
    }
}

/// Initial remote/input state: power, then the topics, then a now-playing fetch
async fn attach(session: &Session, reconciler: &mut MediaStateReconciler) -> Result<()> {
    let Some(remote) = session.remote() else {
        return Ok(());
    };

    let state = remote.attention_state().await?;
    reconciler.apply_attention_state(state).await?;

    remote.subscribe(Topic::NowPlayingInfo).await?;
    remote.subscribe(Topic::SystemStatus).await?;
    remote.unsubscribe(Topic::MediaControl).await?;
    remote.fetch_now_playing_info().await?;
    Ok(())
}

/// Everything owned by the device task
struct DeviceRuntime {
    kind: DeviceKind,
    id: String,
    platform: Arc<dyn Platform>,
    orchestrator: SessionOrchestrator,
    reconciler: MediaStateReconciler,
    listeners: CapabilityListeners,
    session: Option<Session>,
    commands: mpsc::Receiver<DeviceCommand>,
    cancel: CancellationToken,
}

enum Step {
    Stop,
    Command(DeviceCommand),
    Event(SessionEvent),
}

impl DeviceRuntime {
    async fn run(mut self) {
        loop {
            if self.session.is_none() {
                match self.reconnect().await {
                    Some(session) => self.session = Some(session),
                    None => break,
                }
            }
            let Some(session) = self.session.as_mut() else {
                continue;
            };

            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Stop,
                command = self.commands.recv() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Stop,
                },
                event = session.next_event() => Step::Event(event),
            };

            match step {
                Step::Stop => break,
                Step::Command(command) => self.handle_command(command).await,
                Step::Event(event) => self.handle_event(event).await,
            }
        }

        self.teardown().await;
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Control(event) => {
                let Some(control) = self.session.as_ref().and_then(|s| s.control().cloned()) else {
                    return;
                };
                if let Err(err) = self.reconciler.handle_control_event(event, control.as_ref()).await {
                    error!(device = %self.id, error = %err, "Failed to apply control event");
                }
            }
            SessionEvent::Remote(event) => {
                if let Err(err) = self.reconciler.handle_remote_event(event).await {
                    error!(device = %self.id, error = %err, "Failed to apply remote event");
                }
            }
            SessionEvent::Disconnected(kind) => {
                warn!(device = %self.id, channel = %kind, "Channel closed unexpectedly");
                if let Some(session) = self.session.take() {
                    session.disconnect().await;
                }
                if let Err(err) = self.platform.set_unavailable(RECONNECTING).await {
                    warn!(device = %self.id, error = %err, "Failed to mark device unavailable");
                }
            }
        }
    }

    async fn handle_command(&mut self, command: DeviceCommand) {
        match command {
            DeviceCommand::WriteCapability { name, value, reply } => {
                let result = self.write_capability(&name, &value).await;
                if let Err(err) = &result {
                    error!(device = %self.id, capability = %name, error = %err, "Capability write failed");
                }
                let _ = reply.send(result);
            }
            DeviceCommand::Action { action, reply } => {
                let name = action.name();
                let result = match self.session.as_ref().and_then(Session::remote) {
                    Some(remote) => actions::run(remote.as_ref(), action).await,
                    None => Err(SdkError::NotConnected),
                };
                if let Err(err) = &result {
                    error!(device = %self.id, action = name, error = %err, "Flow action failed");
                }
                let _ = reply.send(result);
            }
        }
    }

    async fn write_capability(&self, name: &str, value: &CapabilityValue) -> Result<()> {
        if !self.listeners.contains(name) {
            return Err(SdkError::UnknownCapability(name.to_string()));
        }
        let Some(invocation) = commands::translate(self.kind, name, value)? else {
            debug!(capability = name, %value, "Write needs no command");
            return Ok(());
        };
        let session = self.session.as_ref().ok_or(SdkError::NotConnected)?;
        commands::dispatch(session, invocation).await
    }

    /// Re-establish the session, answering commands with `NotConnected` meanwhile
    async fn reconnect(&mut self) -> Option<Session> {
        info!(device = %self.id, "Reconnecting");

        loop {
            let session = {
                let attempt = self.orchestrator.reconnect(&self.cancel);
                tokio::pin!(attempt);
                loop {
                    tokio::select! {
                        session = &mut attempt => break session?,
                        Some(command) = self.commands.recv() => command.reject(SdkError::NotConnected),
                    }
                }
            };

            match attach(&session, &mut self.reconciler).await {
                Ok(()) => {
                    if let Err(err) = self.platform.set_available().await {
                        warn!(device = %self.id, error = %err, "Failed to mark device available");
                    }
                    info!(device = %self.id, "Reconnected");
                    return Some(session);
                }
                Err(err) => {
                    warn!(device = %self.id, error = %err, "Reattaching after reconnect failed");
                    session.disconnect().await;
                }
            }
        }
    }

    async fn teardown(mut self) {
        if let Err(err) = self.reconciler.shutdown().await {
            warn!(device = %self.id, error = %err, "Failed to release artwork");
        }
        if let Some(session) = self.session.take() {
            session.disconnect().await;
        }
        while let Ok(command) = self.commands.try_recv() {
            command.reject(SdkError::DeviceStopped);
        }
        info!(device = %self.id, "Device stopped");
    }
}

/// Handle to a running device.
///
/// Dropping the handle stops the device without waiting for it; prefer
/// [`DeviceHandle::shutdown`].
pub struct DeviceHandle {
    kind: DeviceKind,
    id: String,
    commands: mpsc::Sender<DeviceCommand>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DeviceHandle {
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Deliver a platform capability write to the device
    pub async fn write_capability(&self, name: &str, value: impl Into<CapabilityValue>) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(DeviceCommand::WriteCapability {
            name: name.to_string(),
            value: value.into(),
            reply,
        })
        .await?;
        response.await.map_err(|_| SdkError::DeviceStopped)?
    }

    pub async fn launch_app(&self, bundle_id: &str) -> Result<()> {
        self.action(FlowAction::LaunchApp(bundle_id.to_string())).await.map(drop)
    }

    pub async fn launch_url(&self, url: &Url) -> Result<()> {
        self.action(FlowAction::LaunchUrl(url.clone())).await.map(drop)
    }

    pub async fn switch_account(&self, account_id: &str) -> Result<()> {
        self.action(FlowAction::SwitchAccount(account_id.to_string())).await.map(drop)
    }

    /// Launchable apps matching `query`, for the launch-app argument
    pub async fn autocomplete_apps(&self, query: &str) -> Result<Vec<AutocompleteItem>> {
        match self.action(FlowAction::ListApps).await? {
            ActionOutcome::Apps(apps) => Ok(app_suggestions(apps, query)),
            _ => Ok(Vec::new()),
        }
    }

    /// User accounts matching `query`, for the switch-account argument
    pub async fn autocomplete_accounts(&self, query: &str) -> Result<Vec<AutocompleteItem>> {
        match self.action(FlowAction::ListAccounts).await? {
            ActionOutcome::Accounts(accounts) => Ok(account_suggestions(accounts, query)),
            _ => Ok(Vec::new()),
        }
    }

    /// Stop the device: cancels any reconnect, releases the artwork image
    /// and disconnects every channel before returning.
    pub async fn shutdown(mut self) -> Result<()> {
        info!(device = %self.id, "Shutting down device");
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(device = %self.id, error = %err, "Device task panicked");
            }
        }
        Ok(())
    }

    async fn action(&self, action: FlowAction) -> Result<ActionOutcome> {
        if !self.kind.has_remote() {
            return Err(SdkError::Unsupported {
                kind: self.kind,
                action: action.name(),
            });
        }

        let (reply, response) = oneshot::channel();
        self.send(DeviceCommand::Action { action, reply }).await?;
        response.await.map_err(|_| SdkError::DeviceStopped)?
    }

    async fn send(&self, command: DeviceCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SdkError::DeviceStopped)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
