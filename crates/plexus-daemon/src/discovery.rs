//! Read-only introspection over a running daemon.
//!
//! Transports and operator tooling answer "what is registered right
//! now" through this surface without touching the mutating APIs.

use crate::daemon::Pipeline;
use crate::router::HandlerInfo;
use crate::transform::RuleInfo;
use plexus_capability::CapabilityRegistry;
use plexus_state::{StateStore, StoreStats};
use std::sync::Arc;

/// Snapshot access to the daemon's registries.
///
/// Every accessor reads live registry state; nothing here caches.
pub struct Discovery {
    pipeline: Arc<Pipeline>,
    capabilities: Arc<CapabilityRegistry>,
    store: Arc<StateStore>,
}

impl Discovery {
    pub(crate) fn new(
        pipeline: Arc<Pipeline>,
        capabilities: Arc<CapabilityRegistry>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            pipeline,
            capabilities,
            store,
        }
    }

    /// Registered event handlers, highest priority first.
    #[must_use]
    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.pipeline.router.list()
    }

    /// Registered transformer rules, highest priority first.
    #[must_use]
    pub fn transformers(&self) -> Vec<RuleInfo> {
        self.pipeline.transforms.list()
    }

    /// Names of the loaded capability profiles, sorted.
    #[must_use]
    pub fn profiles(&self) -> Vec<String> {
        self.capabilities.profile_names()
    }

    /// Entity counts in the state store.
    #[must_use]
    pub fn state_stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Number of unresolved async chains.
    #[must_use]
    pub fn pending_responses(&self) -> usize {
        self.pipeline.pending.len()
    }
}
