//! Handler registry.
//!
//! Registrations are kept in dispatch order: priority descending,
//! ties broken by registration sequence (FIFO). `matching()` returns
//! a snapshot so dispatch never holds the lock across an await.

use super::EventHandler;
use crate::RouterError;
use plexus_event::EventPattern;
use plexus_types::RegistrationId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A registered handler with metadata.
struct Registration {
    id: RegistrationId,
    pattern: EventPattern,
    handler: Arc<dyn EventHandler>,
    priority: i32,
    /// Owning module, for bulk unregistration at module shutdown.
    owner: String,
}

/// Listing entry for introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerInfo {
    /// Registration id.
    pub id: RegistrationId,
    /// Pattern string.
    pub pattern: String,
    /// Handler name.
    pub name: String,
    /// Dispatch priority.
    pub priority: i32,
    /// Owning module.
    pub owner: String,
}

/// A dispatch-ready snapshot entry.
pub(crate) struct MatchedHandler {
    pub name: String,
    pub handler: Arc<dyn EventHandler>,
}

/// Priority-ordered handler registry.
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Registers a handler for a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] for a malformed
    /// pattern string.
    pub fn register(
        &mut self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
        priority: i32,
        owner: impl Into<String>,
    ) -> Result<RegistrationId, RouterError> {
        let pattern = EventPattern::parse(pattern)?;
        let id = RegistrationId::new();
        let owner = owner.into();

        // Insert keeping priority-descending order, FIFO within a
        // priority.
        let pos = self
            .registrations
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(self.registrations.len());

        debug!(
            id = %id,
            pattern = %pattern,
            handler = handler.name(),
            priority,
            owner = %owner,
            "Registered handler"
        );

        self.registrations.insert(
            pos,
            Registration {
                id,
                pattern,
                handler,
                priority,
                owner,
            },
        );
        Ok(id)
    }

    /// Unregisters by id. Returns `true` if found and removed.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() < before
    }

    /// Unregisters every handler owned by `owner`.
    ///
    /// Returns the number removed.
    pub fn unregister_by_owner(&mut self, owner: &str) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.owner != owner);
        before - self.registrations.len()
    }

    /// Returns the handlers matching an event name, in dispatch
    /// order.
    pub(crate) fn matching(&self, event_name: &str) -> Vec<MatchedHandler> {
        self.registrations
            .iter()
            .filter(|r| r.pattern.matches(event_name))
            .map(|r| MatchedHandler {
                name: r.handler.name().to_string(),
                handler: Arc::clone(&r.handler),
            })
            .collect()
    }

    /// Lists all registrations for introspection.
    #[must_use]
    pub fn list(&self) -> Vec<HandlerInfo> {
        self.registrations
            .iter()
            .map(|r| HandlerInfo {
                id: r.id,
                pattern: r.pattern.to_string(),
                name: r.handler.name().to_string(),
                priority: r.priority,
                owner: r.owner.clone(),
            })
            .collect()
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
