//! Capability profiles and permission resolution.
//!
//! Agents do not get ambient authority. Each agent is bound to a
//! named profile whose grant and denial patterns decide which events
//! it may emit:
//!
//! ```text
//!   *.toml ──▶ ProfileStore ──▶ CapabilityRegistry ──▶ BoundCapabilities
//!   (disk)     (search dirs)    (resolve extends)      (per-agent snapshot)
//! ```
//!
//! Resolution walks the single-parent `extends` chain, unions grants
//! ancestor-first, and applies denials last; a denial anywhere in the
//! chain beats every grant. Binding freezes the resolved set for the
//! agent's lifetime.
//!
//! # Example
//!
//! ```
//! use plexus_capability::{CapabilityRegistry, ProfileDef};
//! use plexus_types::AgentId;
//!
//! let registry = CapabilityRegistry::new();
//! registry
//!     .register_profile(
//!         ProfileDef::from_toml(
//!             r#"
//! [profile]
//! name = "reader"
//!
//! [permissions]
//! events = ["state:get"]
//! "#,
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let agent = AgentId::new("alpha");
//! registry.bind(&agent, "reader").unwrap();
//! assert!(registry.check_permission(&agent, "state:get").is_ok());
//! assert!(registry.check_permission(&agent, "state:set").is_err());
//! ```

mod error;
mod profile;
mod resolver;

pub use error::CapabilityError;
pub use profile::{Permissions, ProfileDef, ProfileEntry, ProfileMeta, ProfileStore, PROFILES_DIR};
pub use resolver::{BoundCapabilities, CapabilityRegistry, ResolvedCapabilities};
