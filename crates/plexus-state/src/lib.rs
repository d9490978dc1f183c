//! EAV state store for the Plexus daemon kernel.
//!
//! Every other kernel subsystem — capability registry snapshots,
//! transformer rule indexes, discovery caches, agent bookkeeping,
//! routing-decision audit — persists and queries through this store.
//! No subsystem bypasses it with direct file or database access.
//!
//! # Storage model
//!
//! Entity-Attribute-Value: entities are typed, ids are unique within
//! their type, and attributes are multi-valued ordered sets. New
//! attribute names require no schema migration.
//!
//! ```
//! use plexus_state::StateStore;
//! use serde_json::json;
//!
//! let store = StateStore::new();
//! let key = store.create_entity("agent", "a-1").expect("fresh id");
//!
//! // Appending never overwrites: both tags stay queryable.
//! store.set_attribute(&key, "tag", json!("a")).expect("entity exists");
//! store.set_attribute(&key, "tag", json!("b")).expect("entity exists");
//!
//! let hits = store.query_by_attribute("agent", "tag", &json!("a"));
//! assert!(hits.contains("a-1"));
//! ```
//!
//! # Consistency model
//!
//! Single-writer-per-entity by caller discipline. The store serializes
//! individual operations behind a `parking_lot::RwLock`, but performs
//! no optimistic concurrency control across operations: two tasks
//! interleaving writes to the same attribute must coordinate
//! themselves. This is a deliberate, documented trade-off, not a
//! hidden gap.

mod entity;
mod error;
mod store;

pub use entity::{Entity, Relationship};
pub use error::StateError;
pub use store::{StateStore, StoreStats};

// Re-export from plexus_types for convenience
pub use plexus_types::EntityKey;
