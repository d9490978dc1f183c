//! Identifier types for Plexus.
//!
//! All identifiers are UUID-based so they stay unique across processes
//! and can be logged, persisted, and compared without coordination.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Plexus namespace UUID for deterministic UUID v5 generation.
///
/// Used as the namespace when deriving builtin agent identities so the
/// same name always maps to the same UUID across processes.
const PLEXUS_NAMESPACE: Uuid = uuid!("7c0d3a9e-51b2-4f84-9d6a-2e80cf1b5a37");

/// Identifier for a single emitted event.
///
/// Event identity is immutable post-emission: the id is assigned once
/// when the event is constructed and never reused.
///
/// # Example
///
/// ```
/// use plexus_types::EventId;
///
/// let a = EventId::new();
/// let b = EventId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new [`EventId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt:{}", self.0)
    }
}

/// Identifier linking a causally related chain of events.
///
/// A correlation id is minted exactly once, at the root of a chain, and
/// inherited by every descendant event. It is never regenerated
/// mid-chain; async response routing keys its pending-reply table on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - see below
impl CorrelationId {
    /// Mints a fresh correlation id for a new event chain.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

// NOTE: CorrelationId intentionally does NOT implement Default.
// A defaulted correlation id would fork a chain that should have
// inherited its parent's id. Chains mint ids via EventContext::root().

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "corr:{}", self.0)
    }
}

/// Identifier for an agent connected to the daemon.
///
/// Agents originate events and are bound to a capability profile at
/// spawn time. Builtin daemon-side agents use deterministic UUID v5 so
/// routing tables survive restarts; external agents get random v4 ids.
///
/// # Example
///
/// ```
/// use plexus_types::AgentId;
///
/// let a = AgentId::builtin("completion");
/// let b = AgentId::builtin("completion");
/// assert_eq!(a, b); // Same name, same identity
///
/// let x = AgentId::new("worker");
/// let y = AgentId::new("worker");
/// assert_ne!(x, y); // External agents are unique per spawn
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId {
    /// Globally unique identifier.
    pub uuid: Uuid,
    /// Human-readable agent name.
    pub name: String,
}

impl AgentId {
    /// Creates an agent id with a random UUID v4.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
        }
    }

    /// Creates a builtin agent id with a deterministic UUID v5.
    ///
    /// The UUID is derived from the Plexus namespace UUID and the agent
    /// name, so the same name always produces the same identity.
    #[must_use]
    pub fn builtin(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: Uuid::new_v5(&PLEXUS_NAMESPACE, name.as_bytes()),
            name,
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent:{}@{}", self.name, self.uuid)
    }
}

/// Identifier for a handler registration in the event router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub Uuid);

#[allow(clippy::new_without_default)] // Generated internally by EventRouter::register()
impl RegistrationId {
    /// Creates a new [`RegistrationId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reg:{}", self.0)
    }
}

/// Identifier for a transformer rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

#[allow(clippy::new_without_default)] // Generated internally at rule registration
impl RuleId {
    /// Creates a new [`RuleId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule:{}", self.0)
    }
}

/// Composite key addressing an entity in the state store.
///
/// Entity ids are unique within their type, not globally, so lookups
/// always carry both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Entity type (e.g. `"agent"`, `"routing_decision"`).
    pub entity_type: String,
    /// Entity id, unique within `entity_type`.
    pub id: String,
}

impl EntityKey {
    /// Creates a new entity key.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.id)
    }
}
