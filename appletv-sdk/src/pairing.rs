//! Pairing wizard
//!
//! Drives the host's pairing screens through explicit messages instead of
//! callbacks: every log line, error and view change is sent on a bounded
//! channel the host reads from.
//!
//! ```text
//! discover ──► list_devices ──► authenticate ──► add_device
//!                   ▲                 │
//!                   └── no selection ─┘
//! ```

use std::fmt;
use std::sync::Arc;

use appletv_api::{ChannelConnector, DeviceIdentity, PairSetup, PairingFrame, StoredCredentials};
use appletv_discovery::{DiscoveryResolver, DiscoveryResult};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::PairingConfig;
use crate::error::{Result, SdkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingView {
    Discover,
    ListDevices,
    Authenticate,
    AddDevice,
}

impl PairingView {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairingView::Discover => "discover",
            PairingView::ListDevices => "list_devices",
            PairingView::Authenticate => "authenticate",
            PairingView::AddDevice => "add_device",
        }
    }
}

impl fmt::Display for PairingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the wizard tells the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingMessage {
    Log(String),
    Error(String),
    ViewTransition(PairingView),
}

/// One row of the device list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceListing {
    pub name: String,
    pub id: String,
}

/// The device being paired; carries credentials once pairing finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingDevice {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<StoredCredentials>,
}

impl PairingDevice {
    /// Identity to store for the new device, once paired
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.credentials.clone().map(|credentials| DeviceIdentity {
            id: self.id.clone(),
            credentials,
        })
    }
}

/// Started pair-setup ceremony waiting for the pin
struct Ceremony {
    client: Arc<dyn PairSetup>,
    m1: PairingFrame,
}

pub struct PairingSession {
    resolver: Arc<dyn DiscoveryResolver>,
    connector: Arc<dyn ChannelConnector>,
    config: PairingConfig,
    messages: mpsc::Sender<PairingMessage>,
    devices: Vec<DiscoveryResult>,
    selected: Option<PairingDevice>,
    ceremony: Option<Ceremony>,
}

impl PairingSession {
    /// Create a wizard and the receiving end of its message channel
    pub fn new(
        resolver: Arc<dyn DiscoveryResolver>,
        connector: Arc<dyn ChannelConnector>,
        config: PairingConfig,
    ) -> Result<(Self, mpsc::Receiver<PairingMessage>)> {
        config.validate()?;
        let (messages, receiver) = mpsc::channel(config.message_buffer);

        let session = Self {
            resolver,
            connector,
            config,
            messages,
            devices: Vec::new(),
            selected: None,
            ceremony: None,
        };
        Ok((session, receiver))
    }

    /// Handle the host showing `view`
    pub async fn show_view(&mut self, view: PairingView) -> Result<()> {
        debug!(%view, "Pairing view shown");
        match view {
            PairingView::Discover => {
                self.discover().await;
                Ok(())
            }
            PairingView::Authenticate => self.authenticate().await,
            PairingView::ListDevices | PairingView::AddDevice => Ok(()),
        }
    }

    pub fn list_devices(&self) -> Vec<DeviceListing> {
        self.devices
            .iter()
            .map(|device| DeviceListing {
                name: device.name.clone(),
                id: device.id.clone(),
            })
            .collect()
    }

    /// Pick the device to pair from the listed ones
    pub fn select_device(&mut self, id: &str) -> Result<()> {
        let device = self
            .find(id)
            .ok_or_else(|| SdkError::UnknownDevice(id.to_string()))?;

        self.selected = Some(PairingDevice {
            id: device.id.clone(),
            name: device.name.clone(),
            credentials: None,
        });
        Ok(())
    }

    /// Finish the ceremony with the pin shown on the accessory
    pub async fn submit_pin(&mut self, pin: &str) -> Result<PairingDevice> {
        if pin.is_empty() || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(SdkError::InvalidPin("pin must be digits only".to_string()));
        }
        let Some(selected) = self.selected.clone() else {
            return Err(self.fail(SdkError::NoDeviceSelected).await);
        };
        let Some(ceremony) = self.ceremony.take() else {
            return Err(self
                .fail(SdkError::Pairing("pairing client should not be null".to_string()))
                .await);
        };

        self.log(format!("Pincode submitted for {}", selected.name)).await;

        let credentials = match finish_ceremony(&ceremony, pin).await {
            Ok(credentials) => credentials,
            Err(err) => {
                close_client(ceremony.client.as_ref()).await;
                return Err(self.fail(err).await);
            }
        };
        close_client(ceremony.client.as_ref()).await;

        let paired = PairingDevice {
            credentials: Some(credentials),
            ..selected
        };
        self.selected = Some(paired.clone());

        info!(device = %paired.id, "Device paired");
        self.transition(PairingView::AddDevice).await;
        Ok(paired)
    }

    /// The selected device, with credentials once pairing finished
    pub fn device(&self) -> Result<PairingDevice> {
        self.selected.clone().ok_or(SdkError::NoDeviceSelected)
    }

    async fn discover(&mut self) {
        let service = self.config.service;
        let mut results = self.resolver.subscribe(service);
        self.devices.clear();
        for result in self.resolver.results(service) {
            self.remember(result);
        }

        let window = tokio::time::sleep(self.config.discover_window);
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut window => break,
                result = results.recv() => match result {
                    Ok(result) => self.remember(result),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Discovery results lagged, re-reading cache");
                        for result in self.resolver.results(service) {
                            self.remember(result);
                        }
                    }
                    Err(RecvError::Closed) => {
                        window.as_mut().await;
                        break;
                    }
                },
            }
        }

        self.log(format!("Discovered {} device(s)", self.devices.len())).await;
        if !self.devices.is_empty() {
            self.transition(PairingView::ListDevices).await;
        }
    }

    async fn authenticate(&mut self) -> Result<()> {
        let Some(selected) = self.selected.clone() else {
            self.transition(PairingView::ListDevices).await;
            return Err(self.fail(SdkError::NoDeviceSelected).await);
        };
        let Some(device) = self.find(&selected.id) else {
            self.transition(PairingView::ListDevices).await;
            return Err(self.fail(SdkError::UnknownDevice(selected.id)).await);
        };
        let endpoint = device.endpoint();

        if let Some(previous) = self.ceremony.take() {
            close_client(previous.client.as_ref()).await;
        }

        let started = async {
            let client = self.connector.pair_setup(&endpoint)?;
            client.connect().await?;
            client.start().await?;
            let m1 = client.m1().await?;
            Ok::<_, SdkError>(Ceremony { client, m1 })
        }
        .await;

        match started {
            Ok(ceremony) => {
                self.ceremony = Some(ceremony);
                self.log(format!("Pairing started with {}", selected.name)).await;
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    fn find(&self, id: &str) -> Option<&DiscoveryResult> {
        self.devices.iter().find(|device| device.id == id)
    }

    fn remember(&mut self, result: DiscoveryResult) {
        match self.devices.iter_mut().find(|device| device.id == result.id) {
            Some(existing) => *existing = result,
            None => self.devices.push(result),
        }
    }

    async fn transition(&self, view: PairingView) {
        self.emit(PairingMessage::ViewTransition(view)).await;
    }

    async fn log(&self, line: String) {
        debug!("{line}");
        self.emit(PairingMessage::Log(line)).await;
    }

    /// Report `err` to the host and hand it back
    async fn fail(&self, err: SdkError) -> SdkError {
        warn!(error = %err, "Pairing step failed");
        self.emit(PairingMessage::Error(err.to_string())).await;
        err
    }

    async fn emit(&self, message: PairingMessage) {
        if self.messages.send(message).await.is_err() {
            debug!("Pairing message receiver dropped");
        }
    }
}

async fn finish_ceremony(ceremony: &Ceremony, pin: &str) -> Result<StoredCredentials> {
    let client = ceremony.client.as_ref();
    let m2 = client.m2(&ceremony.m1, pin).await?;
    let m3 = client.m3(&m2).await?;
    let m4 = client.m4(&m3).await?;
    let m5 = client.m5(&m4).await?;
    let credentials = client.m6(&m4, &m5).await?;
    Ok(credentials.to_stored())
}

async fn close_client(client: &dyn PairSetup) {
    if let Err(err) = client.disconnect().await {
        warn!(error = %err, "Failed to close pairing client");
    }
}
