//! Orchestration daemon kernel.
//!
//! The daemon routes named events between agents. Four subsystems
//! cooperate under one [`Daemon`] context object:
//!
//! - **Router** ([`router`]): pattern-matched handler dispatch with
//!   per-handler timeouts and failure isolation.
//! - **Transforms** ([`transform`]): declarative rules loaded from
//!   TOML that rewrite one event into others, with cycle detection
//!   and async completion tracking.
//! - **Capabilities**: agent events pass a profile-based permission
//!   gate before routing (see `plexus-capability`).
//! - **State**: an entity-attribute store backing both application
//!   data and the routing audit trail (see `plexus-state`).
//!
//! ```text
//!   agent ──▶ emit_as ──▶ gate ──▶ transform ──▶ dispatch ──▶ audit
//! ```
//!
//! Build one with [`Daemon::builder`]:
//!
//! ```
//! use plexus_daemon::{config::DaemonConfig, Daemon};
//!
//! let daemon = Daemon::builder()
//!     .config(DaemonConfig::default())
//!     .build()
//!     .expect("defaults are valid");
//! assert!(daemon.discovery().handlers().is_empty());
//! ```

pub mod config;
mod daemon;
mod discovery;
mod error;
pub mod router;
pub mod transform;

pub use daemon::{Daemon, DaemonBuilder, SYSTEM_ERROR_EVENT};
pub use discovery::Discovery;
pub use error::{ConfigError, DaemonError, RouterError, TransformError};
