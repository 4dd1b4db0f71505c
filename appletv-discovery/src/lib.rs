//! Discovery result resolution for Apple TV and HomePod accessories
//!
//! The host application owns mDNS browsing. This crate only consumes its
//! results: the host feeds each resolved service into a [`DiscoveryCache`],
//! and connection code asks for the endpoint of a specific device through
//! the [`DiscoveryResolver`] trait.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use appletv_discovery::{resolve_endpoint, DiscoveryCache, ServiceKind};
//!
//! # async fn example() -> appletv_discovery::Result<()> {
//! let cache = DiscoveryCache::new();
//! let endpoint = resolve_endpoint(
//!     &cache,
//!     ServiceKind::RealtimeControl,
//!     "AA:BB:CC:DD:EE:FF",
//!     Duration::from_secs(30),
//! )
//! .await?;
//! println!("Connecting to {}", endpoint.socket_addr());
//! # Ok(())
//! # }
//! ```

mod error;
mod cache;
mod resolve;

pub use cache::DiscoveryCache;
pub use error::{DiscoveryError, Result};
pub use resolve::{resolve_endpoint, DiscoveryResolver};

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// The two mDNS service types an accessory advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Realtime media-remote control channel
    RealtimeControl,
    /// Remote/input channel (buttons, apps, accounts)
    RemoteInput,
}

impl ServiceKind {
    /// All service kinds, in connect order
    pub const ALL: [ServiceKind; 2] = [ServiceKind::RealtimeControl, ServiceKind::RemoteInput];

    /// The mDNS service type string browsed for this kind
    pub fn service_type(&self) -> &'static str {
        match self {
            ServiceKind::RealtimeControl => "_mediaremotetv._tcp",
            ServiceKind::RemoteInput => "_companion-link._tcp",
        }
    }

    /// Map a browsed service type back to its kind
    pub fn from_service_type(service_type: &str) -> Option<Self> {
        let trimmed = service_type.trim_end_matches('.').trim_end_matches(".local");
        Self::ALL.into_iter().find(|kind| kind.service_type() == trimmed)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_type())
    }
}

/// A resolved mDNS service instance, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Stable device identifier (matches the id stored at pairing time)
    pub id: String,
    /// Friendly name, e.g. "Living Room"
    pub name: String,
    pub address: IpAddr,
    pub port: u16,
    pub service: ServiceKind,
    /// TXT record entries
    #[serde(default)]
    pub txt: BTreeMap<String, String>,
}

impl DiscoveryResult {
    /// The connectable part of this result
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            address: self.address,
            port: self.port,
            service_metadata: self.txt.clone(),
        }
    }
}

/// Network endpoint of one accessory channel.
///
/// Resolved fresh on every connect attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: IpAddr,
    pub port: u16,
    pub service_metadata: BTreeMap<String, String>,
}

impl Endpoint {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}
