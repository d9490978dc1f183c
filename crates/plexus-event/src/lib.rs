//! Event system for the Plexus daemon kernel.
//!
//! This crate provides the event types that flow through the router,
//! the `ns:verb` pattern language used by handler registrations,
//! transformer rules, and capability profiles, and the wire intake
//! normalization for external producers.
//!
//! # Event Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        External producers                        │
//! │        (agents, CLI, completion service, LLM tool calls)         │
//! └──────────────────────────────────────────────────────────────────┘
//!                │ wire JSON (two accepted shapes)
//!                ▼
//!       Envelope::normalize() ── one internal Event
//!                │
//!                ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          EventRouter                             │
//! │   - transformer consultation                                     │
//! │   - capability gate (agent-originated only)                      │
//! │   - concurrent handler fan-out                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Correlation chains
//!
//! Every event carries an [`EventContext`]. Contexts descend
//! monotonically: a child inherits the correlation id and root event id
//! and increments depth. The correlation id is minted once at the root
//! and never regenerated mid-chain, which is what async response
//! routing keys on.
//!
//! ```
//! use plexus_event::Event;
//! use serde_json::json;
//!
//! let order = Event::new("order:placed", json!({"sku": "X1"}));
//! let reserve = order.derive("inventory:reserve", json!({"sku": "X1"}));
//!
//! assert_eq!(
//!     reserve.context.correlation_id,
//!     order.context.correlation_id,
//! );
//! assert_eq!(reserve.context.parent_event_id, Some(order.id));
//! assert_eq!(reserve.context.depth, 1);
//! ```
//!
//! # Patterns
//!
//! ```
//! use plexus_event::EventPattern;
//!
//! let p = EventPattern::parse("state:*").expect("valid pattern");
//! assert!(p.matches("state:get"));
//! assert!(!p.matches("agent:spawn"));
//! ```

mod context;
mod envelope;
mod error;
mod event;
mod pattern;

pub use context::EventContext;
pub use envelope::{Envelope, TOOL_CALL_TYPE};
pub use error::EventError;
pub use event::Event;
pub use pattern::{validate_event_name, EventPattern};

// Re-export from plexus_types for convenience
pub use plexus_types::{CorrelationId, EventId};
