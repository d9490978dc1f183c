//! Entity and relationship types.

use chrono::{DateTime, Utc};
use plexus_types::EntityKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A typed directed edge to another entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The target entity.
    pub to: EntityKey,
    /// Relationship type (e.g. `"spawned_by"`, `"observes"`).
    pub rel_type: String,
    /// Arbitrary edge properties.
    pub properties: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A stored entity.
///
/// Attributes are multi-valued ordered sets: appending a value an
/// attribute already holds is a no-op, and appending never displaces
/// earlier values. Overwriting requires an explicit replace operation
/// on the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type.
    pub entity_type: String,
    /// Id, unique within `entity_type`.
    pub id: String,
    /// Attribute name → ordered value set.
    pub attributes: BTreeMap<String, Vec<Value>>,
    /// Outgoing relationships.
    pub relationships: Vec<Relationship>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Creates an empty entity.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            attributes: BTreeMap::new(),
            relationships: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns this entity's key.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type.clone(), self.id.clone())
    }

    /// Appends a value to an attribute's ordered set.
    ///
    /// Duplicate values are ignored; insertion order of distinct
    /// values is preserved.
    pub fn append_attribute(&mut self, name: impl Into<String>, value: Value) {
        let bag = self.attributes.entry(name.into()).or_default();
        if !bag.contains(&value) {
            bag.push(value);
        }
        self.updated_at = Utc::now();
    }

    /// Replaces an attribute's entire value set with a single value.
    pub fn replace_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), vec![value]);
        self.updated_at = Utc::now();
    }

    /// Returns `true` if the attribute holds the given value.
    #[must_use]
    pub fn has_attribute_value(&self, name: &str, value: &Value) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|bag| bag.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_preserves_order_and_dedups() {
        let mut e = Entity::new("agent", "a-1");
        e.append_attribute("tag", json!("a"));
        e.append_attribute("tag", json!("b"));
        e.append_attribute("tag", json!("a")); // duplicate, ignored

        assert_eq!(e.attributes["tag"], vec![json!("a"), json!("b")]);
    }

    #[test]
    fn replace_overwrites_the_bag() {
        let mut e = Entity::new("agent", "a-1");
        e.append_attribute("status", json!("spawning"));
        e.append_attribute("status", json!("ready"));
        e.replace_attribute("status", json!("terminated"));

        assert_eq!(e.attributes["status"], vec![json!("terminated")]);
    }

    #[test]
    fn has_attribute_value() {
        let mut e = Entity::new("agent", "a-1");
        e.append_attribute("tag", json!("a"));

        assert!(e.has_attribute_value("tag", &json!("a")));
        assert!(!e.has_attribute_value("tag", &json!("b")));
        assert!(!e.has_attribute_value("missing", &json!("a")));
    }

    #[test]
    fn key_matches_fields() {
        let e = Entity::new("agent", "a-1");
        let key = e.key();
        assert_eq!(key.entity_type, "agent");
        assert_eq!(key.id, "a-1");
    }

    #[test]
    fn serde_roundtrip() {
        let mut e = Entity::new("agent", "a-1");
        e.append_attribute("tag", json!("a"));
        let json = serde_json::to_string(&e).expect("Entity should serialize");
        let restored: Entity = serde_json::from_str(&json).expect("Entity should deserialize");
        assert_eq!(e, restored);
    }
}
