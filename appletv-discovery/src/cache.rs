//! In-memory result store fed by the host's mDNS browser

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::resolve::DiscoveryResolver;
use crate::{DiscoveryResult, ServiceKind};

/// Capacity of each per-service result channel
const RESULT_CHANNEL_CAPACITY: usize = 64;

/// Thread-safe cache of the latest result per `(service, id)`.
///
/// Every insert is also broadcast to subscribers of that service kind, so
/// callers waiting for a device that has not been seen yet wake up as soon
/// as the host reports it.
#[derive(Debug)]
pub struct DiscoveryCache {
    results: RwLock<HashMap<(ServiceKind, String), DiscoveryResult>>,
    senders: HashMap<ServiceKind, broadcast::Sender<DiscoveryResult>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        let senders = ServiceKind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(RESULT_CHANNEL_CAPACITY).0))
            .collect();

        Self {
            results: RwLock::new(HashMap::new()),
            senders,
        }
    }

    /// Record a result and notify subscribers. Returns the result it replaced.
    pub fn insert(&self, result: DiscoveryResult) -> Option<DiscoveryResult> {
        debug!(
            service = %result.service,
            id = %result.id,
            address = %result.address,
            port = result.port,
            "Discovery result"
        );

        let previous = self
            .results
            .write()
            .insert((result.service, result.id.clone()), result.clone());

        if let Some(sender) = self.senders.get(&result.service) {
            // No subscribers is fine
            let _ = sender.send(result);
        }

        previous
    }

    /// Forget a result, e.g. when the host reports the service as gone
    pub fn remove(&self, service: ServiceKind, id: &str) -> Option<DiscoveryResult> {
        self.results.write().remove(&(service, id.to_string()))
    }

    pub fn clear(&self) {
        self.results.write().clear();
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryResolver for DiscoveryCache {
    fn result(&self, service: ServiceKind, id: &str) -> Option<DiscoveryResult> {
        self.results.read().get(&(service, id.to_string())).cloned()
    }

    fn results(&self, service: ServiceKind) -> Vec<DiscoveryResult> {
        let mut results: Vec<_> = self
            .results
            .read()
            .values()
            .filter(|result| result.service == service)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        results
    }

    fn subscribe(&self, service: ServiceKind) -> broadcast::Receiver<DiscoveryResult> {
        match self.senders.get(&service) {
            Some(sender) => sender.subscribe(),
            // Every kind gets a sender in `new`; keep the type total anyway
            None => broadcast::channel(1).1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn result(id: &str, name: &str, service: ServiceKind) -> DiscoveryResult {
        DiscoveryResult {
            id: id.to_string(),
            name: name.to_string(),
            address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            port: 7000,
            service,
            txt: BTreeMap::new(),
        }
    }

    #[test]
    fn test_insert_replaces_previous_result() {
        let cache = DiscoveryCache::new();
        assert!(cache.insert(result("a", "Kitchen", ServiceKind::RealtimeControl)).is_none());

        let mut moved = result("a", "Kitchen", ServiceKind::RealtimeControl);
        moved.port = 7100;
        let previous = cache.insert(moved).unwrap();

        assert_eq!(previous.port, 7000);
        assert_eq!(cache.result(ServiceKind::RealtimeControl, "a").unwrap().port, 7100);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_results_are_scoped_by_service_and_sorted() {
        let cache = DiscoveryCache::new();
        cache.insert(result("b", "Office", ServiceKind::RemoteInput));
        cache.insert(result("a", "Bedroom", ServiceKind::RemoteInput));
        cache.insert(result("c", "Attic", ServiceKind::RealtimeControl));

        let names: Vec<_> = cache
            .results(ServiceKind::RemoteInput)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Bedroom", "Office"]);
        assert!(cache.result(ServiceKind::RealtimeControl, "a").is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = DiscoveryCache::new();
        cache.insert(result("a", "Den", ServiceKind::RemoteInput));
        cache.insert(result("b", "Hall", ServiceKind::RemoteInput));

        assert!(cache.remove(ServiceKind::RemoteInput, "a").is_some());
        assert!(cache.remove(ServiceKind::RemoteInput, "a").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_only_see_their_service() {
        let cache = DiscoveryCache::new();
        let mut control = cache.subscribe(ServiceKind::RealtimeControl);

        cache.insert(result("x", "Porch", ServiceKind::RemoteInput));
        cache.insert(result("y", "Patio", ServiceKind::RealtimeControl));

        let seen = control.recv().await.unwrap();
        assert_eq!(seen.id, "y");
        assert!(control.try_recv().is_err());
    }
}
