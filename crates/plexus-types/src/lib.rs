//! Core types for the Plexus daemon kernel.
//!
//! This crate provides the identifier types and the unified error
//! contract shared by every other Plexus crate.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Kernel foundation                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  plexus-types      : ID types, ErrorCode  ◄── HERE          │
//! │  plexus-event      : Event, EventContext, EventPattern      │
//! │  plexus-state      : EAV state store                        │
//! │  plexus-capability : permission profiles and resolution     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  plexus-daemon     : router, transformer engine, discovery  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identity model
//!
//! All identifiers are UUID-backed. Builtin agents use deterministic
//! UUID v5 so the same agent name resolves to the same identity across
//! processes; everything else is random v4.
//!
//! - [`EventId`] — one per emitted event, immutable post-emission
//! - [`CorrelationId`] — links a causally related chain of events; never
//!   regenerated mid-chain
//! - [`AgentId`] — an agent bound to a capability profile
//! - [`RegistrationId`] — a handler registration in the router
//! - [`RuleId`] — a transformer rule
//!
//! # Error contract
//!
//! Every Plexus error type implements [`ErrorCode`]:
//!
//! ```
//! use plexus_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError { Timeout }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str { "MY_TIMEOUT" }
//!     fn is_recoverable(&self) -> bool { true }
//! }
//!
//! assert_eq!(MyError::Timeout.code(), "MY_TIMEOUT");
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{AgentId, CorrelationId, EntityKey, EventId, RegistrationId, RuleId};
