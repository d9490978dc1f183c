//! Event context — the correlation chain metadata carried by every event.

use chrono::{DateTime, Utc};
use plexus_types::{CorrelationId, EventId};
use serde::{Deserialize, Serialize};

/// Context carried by every event through the router.
///
/// Contexts descend monotonically: children always inherit and extend,
/// never fork. [`EventContext::descend`] is the only way a child
/// context is produced, and it runs synchronously before any dispatch
/// suspension, so causal order per correlation id is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// Chain identifier, minted at the root and never regenerated.
    pub correlation_id: CorrelationId,

    /// The directly triggering event, if any.
    pub parent_event_id: Option<EventId>,

    /// The event that started this chain. `None` only on a root event
    /// (whose own id is the root).
    pub root_event_id: Option<EventId>,

    /// Chain depth: 0 for roots, parent depth + 1 for children.
    pub depth: u32,

    /// The external client this chain originated from, used to route
    /// error events back to the originator. `None` for internal
    /// daemon-to-daemon chains.
    pub client_id: Option<String>,

    /// Wall-clock emission time.
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    /// Creates a root context with a fresh correlation id.
    #[must_use]
    pub fn root() -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            parent_event_id: None,
            root_event_id: None,
            depth: 0,
            client_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the originating client.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Derives a child context from a parent event's id and context.
    ///
    /// Inherits correlation id, root event id (the parent's own id if
    /// the parent was the root), and client id; increments depth and
    /// stamps the current time.
    #[must_use]
    pub fn descend(parent_id: EventId, parent: &Self) -> Self {
        Self {
            correlation_id: parent.correlation_id,
            parent_event_id: Some(parent_id),
            root_event_id: Some(parent.root_event_id.unwrap_or(parent_id)),
            depth: parent.depth.saturating_add(1),
            client_id: parent.client_id.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Returns `true` if this chain originated from an external client.
    #[must_use]
    pub fn is_client_originated(&self) -> bool {
        self.client_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_context_starts_at_depth_zero() {
        let ctx = EventContext::root();
        assert_eq!(ctx.depth, 0);
        assert!(ctx.parent_event_id.is_none());
        assert!(ctx.root_event_id.is_none());
        assert!(ctx.client_id.is_none());
    }

    #[test]
    fn descend_inherits_correlation() {
        let root = EventContext::root().with_client_id("cli-1");
        let root_id = EventId::new();

        let child = EventContext::descend(root_id, &root);
        assert_eq!(child.correlation_id, root.correlation_id);
        assert_eq!(child.parent_event_id, Some(root_id));
        assert_eq!(child.root_event_id, Some(root_id));
        assert_eq!(child.depth, 1);
        assert_eq!(child.client_id.as_deref(), Some("cli-1"));
    }

    #[test]
    fn descend_preserves_root_across_generations() {
        let root = EventContext::root();
        let root_id = EventId::new();

        let child = EventContext::descend(root_id, &root);
        let child_id = EventId::new();
        let grandchild = EventContext::descend(child_id, &child);

        // Root never forks: grandchild still points at the chain root.
        assert_eq!(grandchild.root_event_id, Some(root_id));
        assert_eq!(grandchild.parent_event_id, Some(child_id));
        assert_eq!(grandchild.correlation_id, root.correlation_id);
        assert_eq!(grandchild.depth, 2);
    }

    #[test]
    fn serde_roundtrip() {
        let ctx = EventContext::root().with_client_id("client-7");
        let json = serde_json::to_string(&ctx).expect("EventContext should serialize");
        let restored: EventContext =
            serde_json::from_str(&json).expect("EventContext should deserialize");
        assert_eq!(ctx, restored);
    }
}
