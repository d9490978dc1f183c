//! Routing-decision audit trail.
//!
//! Every emit appends one immutable `routing_decision` entity to the
//! state store. The trail is for introspection only; nothing in the
//! dispatch path reads it back.

use super::DispatchResult;
use plexus_event::Event;
use plexus_state::StateStore;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Entity type under which routing decisions are stored.
pub const AUDIT_ENTITY_TYPE: &str = "routing_decision";

/// Append-only recorder for routing decisions.
pub struct RoutingAudit {
    store: Arc<StateStore>,
}

impl RoutingAudit {
    /// Creates a recorder over the shared store.
    #[must_use]
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Records one routing decision.
    ///
    /// A storage failure is logged and swallowed: the audit trail
    /// must never take the dispatch path down with it.
    pub fn record(&self, event: &Event, results: &[DispatchResult]) {
        let key = match self
            .store
            .create_entity(AUDIT_ENTITY_TYPE, event.id.to_string())
        {
            Ok(key) => key,
            Err(e) => {
                warn!(event = %event.name, error = %e, "Failed to create audit entity");
                return;
            }
        };

        let matched: Vec<&str> = results.iter().map(|r| r.origin.as_str()).collect();
        let failures = results.iter().filter(|r| !r.outcome.is_ok()).count();
        let outcome = if results.is_empty() {
            "no_match"
        } else if failures == 0 {
            "delivered"
        } else {
            "partial"
        };

        let attributes = [
            ("event_name", json!(event.name)),
            ("correlation_id", json!(event.context.correlation_id)),
            ("depth", json!(event.context.depth)),
            ("matched", json!(matched)),
            ("outcome", json!(outcome)),
        ];
        for (name, value) in attributes {
            if let Err(e) = self.store.set_attribute(&key, name, value) {
                warn!(event = %event.name, attribute = name, error = %e, "Failed to record audit attribute");
            }
        }
    }
}
