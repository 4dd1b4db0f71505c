//! Resolver seam and the cache-then-wait endpoint lookup

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::error::{DiscoveryError, Result};
use crate::{DiscoveryResult, Endpoint, ServiceKind};

/// Source of discovery results.
///
/// Implemented by [`crate::DiscoveryCache`]; hosts with their own browser
/// can implement it directly.
pub trait DiscoveryResolver: Send + Sync {
    /// The most recent result for a device, if one has been seen
    fn result(&self, service: ServiceKind, id: &str) -> Option<DiscoveryResult>;

    /// Every result currently known for a service kind
    fn results(&self, service: ServiceKind) -> Vec<DiscoveryResult>;

    /// Stream of results for a service kind as they arrive
    fn subscribe(&self, service: ServiceKind) -> broadcast::Receiver<DiscoveryResult>;
}

/// Resolve the endpoint of device `id` for `service`.
///
/// A cached result wins immediately. Otherwise this waits for a matching
/// result to be published, bounded by `timeout`.
pub async fn resolve_endpoint<R>(
    resolver: &R,
    service: ServiceKind,
    id: &str,
    timeout: Duration,
) -> Result<Endpoint>
where
    R: DiscoveryResolver + ?Sized,
{
    // Subscribe before checking the cache so a result published in between is not missed
    let mut receiver = resolver.subscribe(service);

    if let Some(result) = resolver.result(service, id) {
        debug!(%service, id, "Resolved endpoint from cache");
        return Ok(result.endpoint());
    }

    debug!(%service, id, ?timeout, "Waiting for discovery result");

    let wait = async {
        loop {
            match receiver.recv().await {
                Ok(result) if result.service == service && result.id == id => {
                    return Ok(result.endpoint());
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%service, skipped, "Discovery subscriber lagged, re-checking cache");
                    if let Some(result) = resolver.result(service, id) {
                        return Ok(result.endpoint());
                    }
                }
                Err(RecvError::Closed) => return Err(DiscoveryError::Closed { service }),
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(resolved) => resolved,
        Err(_) => Err(DiscoveryError::Timeout {
            service,
            id: id.to_string(),
            timeout,
        }),
    }
}
