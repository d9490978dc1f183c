//! The event type dispatched by the router.

use crate::EventContext;
use plexus_types::EventId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event flowing through the router.
///
/// Events are transient: they exist for the duration of dispatch (plus
/// an audit record). Identity is immutable post-emission: the id is
/// assigned at construction and the struct is never mutated by
/// dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identity.
    pub id: EventId,
    /// Namespaced name, `ns:verb`.
    pub name: String,
    /// Structured payload.
    pub payload: Value,
    /// Correlation chain context.
    pub context: EventContext,
}

impl Event {
    /// Creates a root event with a fresh context.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            payload,
            context: EventContext::root(),
        }
    }

    /// Creates an event with an explicit context (used by intake
    /// normalization and by transformers carrying a derived context).
    #[must_use]
    pub fn with_context(name: impl Into<String>, payload: Value, context: EventContext) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            payload,
            context,
        }
    }

    /// Derives a child event from this one.
    ///
    /// The child inherits the correlation chain (see
    /// [`EventContext::descend`]); depth increments by one.
    #[must_use]
    pub fn derive(&self, name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            payload,
            context: EventContext::descend(self.id, &self.context),
        }
    }

    /// Returns the namespace part of the event name, if well-formed.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.name.split_once(':').map(|(ns, _)| ns)
    }
}
