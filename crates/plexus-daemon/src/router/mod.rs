//! Event router — pattern-matched fan-out dispatch.
//!
//! ```text
//!   emit(event)
//!       │
//!       ▼
//!   HandlerRegistry ──▶ matching handlers (priority desc, FIFO ties)
//!       │
//!       ▼
//!   tokio::spawn per handler, per-handler timeout
//!       │
//!       ▼
//!   Vec<DispatchResult>  (one entry per handler, failures included)
//! ```
//!
//! One handler's failure or timeout never aborts its siblings; every
//! outcome is collected independently. Zero matches is an empty
//! result list, not an error.

mod audit;
mod handler;
mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use audit::{RoutingAudit, AUDIT_ENTITY_TYPE};
pub use handler::{DispatchOutcome, DispatchResult, EventHandler};
pub use registry::{HandlerInfo, HandlerRegistry};

use crate::RouterError;
use parking_lot::RwLock;
use plexus_event::Event;
use plexus_types::{ErrorCode, RegistrationId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pattern-matched event dispatcher.
///
/// Registration is synchronous under a `parking_lot` lock; dispatch
/// snapshots the matching handlers first, so no task ever observes a
/// partially mutated registry.
pub struct EventRouter {
    registry: RwLock<HandlerRegistry>,
    handler_timeout: Duration,
}

impl EventRouter {
    /// Creates a router with the given per-handler timeout.
    #[must_use]
    pub fn new(handler_timeout: Duration) -> Self {
        Self {
            registry: RwLock::new(HandlerRegistry::new()),
            handler_timeout,
        }
    }

    /// Registers a handler for a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] for a malformed
    /// pattern.
    pub fn register(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
        priority: i32,
        owner: impl Into<String>,
    ) -> Result<RegistrationId, RouterError> {
        self.registry
            .write()
            .register(pattern, handler, priority, owner)
    }

    /// Unregisters by id. Returns `true` if found and removed.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        self.registry.write().unregister(id)
    }

    /// Unregisters every handler owned by `owner`. Returns the
    /// number removed.
    pub fn unregister_by_owner(&self, owner: &str) -> usize {
        self.registry.write().unregister_by_owner(owner)
    }

    /// Lists all registrations for introspection.
    #[must_use]
    pub fn list(&self) -> Vec<HandlerInfo> {
        self.registry.read().list()
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    /// Fans an event out to all matching handlers.
    ///
    /// Handlers run as concurrently spawned tasks; the call suspends
    /// until every one completed or hit the per-handler timeout.
    /// Results come back in dispatch order.
    pub async fn dispatch(&self, event: &Event) -> Vec<DispatchResult> {
        let matches = self.registry.read().matching(&event.name);
        if matches.is_empty() {
            debug!(event = %event.name, "No matching handlers");
            return Vec::new();
        }

        let timeout = self.handler_timeout;
        let mut tasks = Vec::with_capacity(matches.len());
        for matched in matches {
            let event = event.clone();
            tasks.push((
                matched.name.clone(),
                tokio::spawn(async move {
                    tokio::time::timeout(timeout, matched.handler.handle(event)).await
                }),
            ));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            let outcome = match task.await {
                Ok(Ok(Ok(value))) => DispatchOutcome::Ok { value },
                Ok(Ok(Err(e))) => DispatchOutcome::Failed {
                    code: e.code().to_string(),
                    message: e.to_string(),
                },
                Ok(Err(_elapsed)) => {
                    let timeout_ms = timeout.as_millis() as u64;
                    warn!(
                        event = %event.name,
                        handler = %name,
                        timeout_ms,
                        "Handler timed out"
                    );
                    DispatchOutcome::TimedOut { timeout_ms }
                }
                Err(join_err) => DispatchOutcome::Failed {
                    code: "ROUTER_HANDLER_FAILED".to_string(),
                    message: format!("handler task aborted: {join_err}"),
                },
            };
            results.push(DispatchResult {
                origin: name,
                event: event.name.clone(),
                outcome,
            });
        }

        debug!(
            event = %event.name,
            handlers = results.len(),
            failures = results.iter().filter(|r| !r.outcome.is_ok()).count(),
            "Dispatched event"
        );
        results
    }
}
