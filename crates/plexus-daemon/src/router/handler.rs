//! Handler trait and dispatch results.

use crate::RouterError;
use async_trait::async_trait;
use plexus_event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event handler.
///
/// Handlers run as spawned tasks during fan-out; implementations must
/// be `Send + Sync` and tolerate concurrent invocations.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable handler name, used in dispatch results and listings.
    fn name(&self) -> &str;

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// A returned error is captured as a per-handler failure in the
    /// emit result list; it never aborts sibling handlers.
    async fn handle(&self, event: Event) -> Result<Value, RouterError>;
}

/// Terminal state of one handler (or transformer) invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Handler completed and returned a value.
    Ok {
        /// Handler return value.
        value: Value,
    },
    /// Handler returned an error.
    Failed {
        /// Error code of the failure.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// Handler exceeded the per-handler timeout and was aborted.
    TimedOut {
        /// Configured timeout.
        timeout_ms: u64,
    },
}

impl DispatchOutcome {
    /// Returns true for a successful invocation.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// One entry in an emit's result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Handler name, or `transform:<rule>` for transformer outcomes.
    pub origin: String,

    /// Event name that was handled.
    pub event: String,

    /// How the invocation ended.
    pub outcome: DispatchOutcome,
}
