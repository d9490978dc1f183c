//! The state store.

use crate::{Entity, Relationship, StateError};
use chrono::Utc;
use parking_lot::RwLock;
use plexus_types::EntityKey;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// Entity map: type → (id → entity).
type Entities = HashMap<String, HashMap<String, Entity>>;

/// Per-type entity counts for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Entity count per type.
    pub by_type: BTreeMap<String, usize>,
}

impl StoreStats {
    /// Total entity count across all types.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_type.values().sum()
    }
}

/// The EAV state store.
///
/// Individual operations are serialized behind a `RwLock`; cross-
/// operation write ordering on the same entity is the caller's
/// responsibility (single-writer-per-entity discipline).
pub struct StateStore {
    entities: RwLock<Entities>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateEntity`] if the type/id pair
    /// already exists — entity ids are unique within their type.
    pub fn create_entity(
        &self,
        entity_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<EntityKey, StateError> {
        let entity_type = entity_type.into();
        let id = id.into();
        let mut entities = self.entities.write();

        let by_id = entities.entry(entity_type.clone()).or_default();
        if by_id.contains_key(&id) {
            return Err(StateError::DuplicateEntity(EntityKey::new(entity_type, id)));
        }

        by_id.insert(id.clone(), Entity::new(entity_type.clone(), id.clone()));
        Ok(EntityKey::new(entity_type, id))
    }

    /// Appends a value to an entity attribute (multi-valued; never
    /// overwrites earlier values).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EntityNotFound`] if the entity does not
    /// exist.
    pub fn set_attribute(
        &self,
        key: &EntityKey,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), StateError> {
        let mut entities = self.entities.write();
        let entity = lookup_mut(&mut entities, key)?;
        entity.append_attribute(name, value);
        Ok(())
    }

    /// Replaces an attribute's value set with a single value.
    ///
    /// This is the explicit overwrite path; [`set_attribute`]
    /// (Self::set_attribute) never does this implicitly.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EntityNotFound`] if the entity does not
    /// exist.
    pub fn replace_attribute(
        &self,
        key: &EntityKey,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), StateError> {
        let mut entities = self.entities.write();
        let entity = lookup_mut(&mut entities, key)?;
        entity.replace_attribute(name, value);
        Ok(())
    }

    /// Returns all attributes of an entity.
    ///
    /// The full multi-valued map is returned — never a reduced or
    /// filtered view.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EntityNotFound`] if the entity does not
    /// exist.
    pub fn get_attributes(
        &self,
        key: &EntityKey,
    ) -> Result<BTreeMap<String, Vec<Value>>, StateError> {
        let entities = self.entities.read();
        let entity = lookup(&entities, key)?;
        Ok(entity.attributes.clone())
    }

    /// Returns a full copy of an entity, if present.
    #[must_use]
    pub fn get_entity(&self, key: &EntityKey) -> Option<Entity> {
        let entities = self.entities.read();
        entities.get(&key.entity_type)?.get(&key.id).cloned()
    }

    /// Returns the ids of entities of `entity_type` holding `value`
    /// in attribute `name`.
    #[must_use]
    pub fn query_by_attribute(
        &self,
        entity_type: &str,
        name: &str,
        value: &Value,
    ) -> BTreeSet<String> {
        let entities = self.entities.read();
        entities
            .get(entity_type)
            .map(|by_id| {
                by_id
                    .values()
                    .filter(|e| e.has_attribute_value(name, value))
                    .map(|e| e.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Conjunctive multi-attribute query: the intersection of the
    /// per-attribute result sets.
    #[must_use]
    pub fn query_by_attributes(
        &self,
        entity_type: &str,
        filters: &[(&str, Value)],
    ) -> BTreeSet<String> {
        let mut result: Option<BTreeSet<String>> = None;
        for (name, value) in filters {
            let hits = self.query_by_attribute(entity_type, name, value);
            result = Some(match result {
                None => hits,
                Some(acc) => acc.intersection(&hits).cloned().collect(),
            });
            // Short-circuit: an empty intersection stays empty.
            if result.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }
        result.unwrap_or_default()
    }

    /// Creates a typed directed relationship between two entities.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EntityNotFound`] if `from` does not exist
    /// and [`StateError::TargetNotFound`] if `to` does not.
    pub fn create_relationship(
        &self,
        from: &EntityKey,
        to: &EntityKey,
        rel_type: impl Into<String>,
        properties: Value,
    ) -> Result<(), StateError> {
        let mut entities = self.entities.write();

        let target_exists = entities
            .get(&to.entity_type)
            .is_some_and(|by_id| by_id.contains_key(&to.id));
        if !target_exists {
            return Err(StateError::TargetNotFound(to.clone()));
        }

        let entity = lookup_mut(&mut entities, from)?;
        entity.relationships.push(Relationship {
            to: to.clone(),
            rel_type: rel_type.into(),
            properties,
            created_at: Utc::now(),
        });
        entity.updated_at = Utc::now();
        Ok(())
    }

    /// Returns the outgoing relationships of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EntityNotFound`] if the entity does not
    /// exist.
    pub fn relationships_from(&self, key: &EntityKey) -> Result<Vec<Relationship>, StateError> {
        let entities = self.entities.read();
        let entity = lookup(&entities, key)?;
        Ok(entity.relationships.clone())
    }

    /// Deletes an entity. Relationships pointing at it are left
    /// dangling; there is no implicit garbage collection.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EntityNotFound`] if the entity does not
    /// exist.
    pub fn delete_entity(&self, key: &EntityKey) -> Result<(), StateError> {
        let mut entities = self.entities.write();
        let removed = entities
            .get_mut(&key.entity_type)
            .and_then(|by_id| by_id.remove(&key.id));
        match removed {
            Some(_) => Ok(()),
            None => Err(StateError::EntityNotFound(key.clone())),
        }
    }

    /// Returns per-type entity counts.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let entities = self.entities.read();
        StoreStats {
            by_type: entities
                .iter()
                .map(|(t, by_id)| (t.clone(), by_id.len()))
                .collect(),
        }
    }

    // === Snapshot persistence ===

    /// Writes a JSON snapshot of the full store.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] or [`StateError::Serialization`].
    pub fn save_to(&self, path: &Path) -> Result<(), StateError> {
        let entities = self.entities.read();
        let json = serde_json::to_string_pretty(&*entities)?;
        std::fs::write(path, json).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "state snapshot written");
        Ok(())
    }

    /// Loads a store from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] or [`StateError::Serialization`].
    pub fn load_from(path: &Path) -> Result<Self, StateError> {
        let content = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entities: Entities = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "state snapshot loaded");
        Ok(Self {
            entities: RwLock::new(entities),
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(entities: &'a Entities, key: &EntityKey) -> Result<&'a Entity, StateError> {
    entities
        .get(&key.entity_type)
        .and_then(|by_id| by_id.get(&key.id))
        .ok_or_else(|| StateError::EntityNotFound(key.clone()))
}

fn lookup_mut<'a>(entities: &'a mut Entities, key: &EntityKey) -> Result<&'a mut Entity, StateError> {
    entities
        .get_mut(&key.entity_type)
        .and_then(|by_id| by_id.get_mut(&key.id))
        .ok_or_else(|| StateError::EntityNotFound(key.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Entity lifecycle ─────────────────────────────────────

    #[test]
    fn create_and_get() {
        let store = StateStore::new();
        let key = store
            .create_entity("agent", "a-1")
            .expect("fresh entity should be created");

        let entity = store.get_entity(&key).expect("entity should exist");
        assert_eq!(entity.entity_type, "agent");
        assert_eq!(entity.id, "a-1");
    }

    #[test]
    fn duplicate_id_within_type_rejected() {
        let store = StateStore::new();
        store
            .create_entity("agent", "a-1")
            .expect("first create should succeed");

        let err = store
            .create_entity("agent", "a-1")
            .expect_err("duplicate id within type should be rejected");
        assert!(matches!(err, StateError::DuplicateEntity(_)));
    }

    #[test]
    fn same_id_across_types_allowed() {
        let store = StateStore::new();
        store
            .create_entity("agent", "x")
            .expect("agent/x should be created");
        store
            .create_entity("session", "x")
            .expect("session/x should be created: ids are unique per type only");
    }

    #[test]
    fn delete_entity() {
        let store = StateStore::new();
        let key = store.create_entity("agent", "a-1").expect("should create");

        store.delete_entity(&key).expect("delete should succeed");
        assert!(store.get_entity(&key).is_none());
        assert!(matches!(
            store.delete_entity(&key),
            Err(StateError::EntityNotFound(_))
        ));
    }

    // ── Multi-valued attributes ──────────────────────────────

    #[test]
    fn set_attribute_appends_not_overwrites() {
        let store = StateStore::new();
        let key = store.create_entity("agent", "e").expect("should create");

        store
            .set_attribute(&key, "tag", json!("a"))
            .expect("first append should succeed");
        store
            .set_attribute(&key, "tag", json!("b"))
            .expect("second append should succeed");

        // "a" is still queryable after "b" was appended.
        let hits = store.query_by_attribute("agent", "tag", &json!("a"));
        assert!(hits.contains("e"));
        let hits = store.query_by_attribute("agent", "tag", &json!("b"));
        assert!(hits.contains("e"));
    }

    #[test]
    fn replace_attribute_is_explicit_overwrite() {
        let store = StateStore::new();
        let key = store.create_entity("agent", "e").expect("should create");

        store
            .set_attribute(&key, "status", json!("ready"))
            .expect("append should succeed");
        store
            .replace_attribute(&key, "status", json!("gone"))
            .expect("replace should succeed");

        assert!(store
            .query_by_attribute("agent", "status", &json!("ready"))
            .is_empty());
        assert!(store
            .query_by_attribute("agent", "status", &json!("gone"))
            .contains("e"));
    }

    #[test]
    fn get_attributes_returns_full_map() {
        let store = StateStore::new();
        let key = store.create_entity("agent", "e").expect("should create");
        store
            .set_attribute(&key, "tag", json!("a"))
            .expect("append should succeed");
        store
            .set_attribute(&key, "tag", json!("b"))
            .expect("append should succeed");
        store
            .set_attribute(&key, "model", json!("sonnet"))
            .expect("append should succeed");

        let attrs = store
            .get_attributes(&key)
            .expect("attributes should be returned");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["tag"], vec![json!("a"), json!("b")]);
    }

    #[test]
    fn attribute_on_missing_entity_fails() {
        let store = StateStore::new();
        let key = EntityKey::new("agent", "ghost");
        assert!(matches!(
            store.set_attribute(&key, "tag", json!("a")),
            Err(StateError::EntityNotFound(_))
        ));
        assert!(matches!(
            store.get_attributes(&key),
            Err(StateError::EntityNotFound(_))
        ));
    }

    // ── Queries ──────────────────────────────────────────────

    #[test]
    fn query_unknown_type_is_empty() {
        let store = StateStore::new();
        assert!(store
            .query_by_attribute("nope", "tag", &json!("a"))
            .is_empty());
    }

    #[test]
    fn conjunctive_query_intersects() {
        let store = StateStore::new();
        for (id, role, zone) in [("a", "worker", "eu"), ("b", "worker", "us"), ("c", "lead", "eu")]
        {
            let key = store.create_entity("agent", id).expect("should create");
            store
                .set_attribute(&key, "role", json!(role))
                .expect("append should succeed");
            store
                .set_attribute(&key, "zone", json!(zone))
                .expect("append should succeed");
        }

        let hits =
            store.query_by_attributes("agent", &[("role", json!("worker")), ("zone", json!("eu"))]);
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["a".to_string()]);
    }

    #[test]
    fn conjunctive_query_with_no_filters_is_empty() {
        let store = StateStore::new();
        store.create_entity("agent", "a").expect("should create");
        assert!(store.query_by_attributes("agent", &[]).is_empty());
    }

    // ── Relationships ────────────────────────────────────────

    #[test]
    fn create_and_list_relationships() {
        let store = StateStore::new();
        let parent = store
            .create_entity("agent", "parent")
            .expect("should create");
        let child = store
            .create_entity("agent", "child")
            .expect("should create");

        store
            .create_relationship(&child, &parent, "spawned_by", json!({"at": "boot"}))
            .expect("relationship should be created");

        let rels = store
            .relationships_from(&child)
            .expect("relationships should list");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, "spawned_by");
        assert_eq!(rels[0].to, parent);
        assert_eq!(rels[0].properties, json!({"at": "boot"}));
    }

    #[test]
    fn relationship_requires_both_ends() {
        let store = StateStore::new();
        let a = store.create_entity("agent", "a").expect("should create");
        let ghost = EntityKey::new("agent", "ghost");

        assert!(matches!(
            store.create_relationship(&a, &ghost, "observes", json!({})),
            Err(StateError::TargetNotFound(_))
        ));
        assert!(matches!(
            store.create_relationship(&ghost, &a, "observes", json!({})),
            Err(StateError::EntityNotFound(_))
        ));
    }

    // ── Stats ────────────────────────────────────────────────

    #[test]
    fn stats_count_per_type() {
        let store = StateStore::new();
        store.create_entity("agent", "a").expect("should create");
        store.create_entity("agent", "b").expect("should create");
        store.create_entity("session", "s").expect("should create");

        let stats = store.stats();
        assert_eq!(stats.by_type["agent"], 2);
        assert_eq!(stats.by_type["session"], 1);
        assert_eq!(stats.total(), 3);
    }

    // ── Snapshot persistence ─────────────────────────────────

    #[test]
    fn snapshot_roundtrip() {
        let temp = tempfile::TempDir::new().expect("should create temp dir for snapshot test");
        let path = temp.path().join("state.json");

        let store = StateStore::new();
        let key = store.create_entity("agent", "a-1").expect("should create");
        store
            .set_attribute(&key, "tag", json!("a"))
            .expect("append should succeed");

        store.save_to(&path).expect("snapshot should be written");

        let restored = StateStore::load_from(&path).expect("snapshot should load");
        let attrs = restored
            .get_attributes(&key)
            .expect("restored entity should have attributes");
        assert_eq!(attrs["tag"], vec![json!("a")]);
    }

    #[test]
    fn load_missing_snapshot_fails() {
        let temp = tempfile::TempDir::new().expect("should create temp dir");
        let result = StateStore::load_from(&temp.path().join("missing.json"));
        assert!(matches!(result, Err(StateError::Io { .. })));
    }
}
