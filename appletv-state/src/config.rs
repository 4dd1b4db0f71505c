//! Reconciler configuration

use crate::error::{Result, StateError};

/// How to treat state events that arrive out of order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalenessGuard {
    /// Apply every event in arrival order
    Disabled,
    /// Drop a state event whose playback-state timestamp is older than the last applied one
    #[default]
    DiscardOlder,
}

/// Configuration for a [`crate::MediaStateReconciler`]
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Default: `StalenessGuard::DiscardOlder`
    pub staleness_guard: StalenessGuard,

    /// Artwork size requested with playback-queue requests
    /// Default: 600x600
    pub artwork_width: u32,
    pub artwork_height: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            staleness_guard: StalenessGuard::default(),
            artwork_width: 600,
            artwork_height: 600,
        }
    }
}

impl ReconcilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.artwork_width == 0 || self.artwork_height == 0 {
            return Err(StateError::Configuration(
                "Artwork dimensions must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_staleness_guard(mut self, guard: StalenessGuard) -> Self {
        self.staleness_guard = guard;
        self
    }

    pub fn with_artwork_size(mut self, width: u32, height: u32) -> Self {
        self.artwork_width = width;
        self.artwork_height = height;
        self
    }
}
