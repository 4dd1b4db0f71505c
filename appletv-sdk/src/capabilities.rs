//! Bringing the platform's capability set in line with a device kind

use std::collections::BTreeSet;

use appletv_state::Platform;
use tracing::{debug, info};

use crate::error::{Result, SdkError};

/// What a synchronisation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SyncReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct CapabilitySynchronizer;

impl CapabilitySynchronizer {
    /// Add every declared capability the platform lacks, then remove every
    /// platform capability that is not declared.
    ///
    /// Running it again with the same declaration changes nothing.
    pub async fn reconcile(declared: &[&str], platform: &dyn Platform) -> Result<SyncReport> {
        let current = platform.capabilities().await;
        let mut report = SyncReport::default();

        for name in declared {
            if current.iter().any(|c| c == name) {
                continue;
            }
            platform.add_capability(name).await?;
            report.added.push(name.to_string());
        }

        for name in &current {
            if declared.contains(&name.as_str()) {
                continue;
            }
            platform.remove_capability(name).await?;
            report.removed.push(name.clone());
        }

        if report.is_unchanged() {
            debug!("Capabilities already in sync");
        } else {
            info!(added = ?report.added, removed = ?report.removed, "Capabilities synchronised");
        }
        Ok(report)
    }
}

/// Capabilities whose platform writes the device acts on
#[derive(Debug, Clone, Default)]
pub struct CapabilityListeners {
    names: BTreeSet<String>,
}

impl CapabilityListeners {
    /// Register listeners for `names`.
    ///
    /// Every name must already exist on the platform, so this runs after
    /// [`CapabilitySynchronizer::reconcile`].
    pub async fn register<'a, I>(platform: &dyn Platform, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present = platform.capabilities().await;
        let mut listeners = Self::default();

        for name in names {
            if !present.iter().any(|c| c == name) {
                return Err(SdkError::UnknownCapability(name.to_string()));
            }
            listeners.names.insert(name.to_string());
        }

        debug!(count = listeners.names.len(), "Capability listeners registered");
        Ok(listeners)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
