//! Capability resolution and agent binding.
//!
//! The registry holds profile definitions and answers two questions:
//!
//! 1. `resolve(name)`: what may a profile do, after walking its
//!    `extends` chain? Grants are unioned ancestor-first; denials
//!    from anywhere in the chain override every grant.
//! 2. `check_permission(agent, event)`: may a bound agent emit this
//!    event? Agents carry an immutable snapshot taken at bind time,
//!    so later profile edits never change a live agent's rights.

use crate::{CapabilityError, ProfileDef, ProfileStore};
use parking_lot::RwLock;
use plexus_event::EventPattern;
use plexus_types::AgentId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The effective permission set of a profile after inheritance.
#[derive(Debug, Clone)]
pub struct ResolvedCapabilities {
    /// Profile the resolution started from.
    pub profile: String,

    /// Inheritance chain, ancestor-first (root parent down to
    /// `profile` itself).
    pub chain: Vec<String>,

    grants: Vec<EventPattern>,
    denials: Vec<EventPattern>,
}

impl ResolvedCapabilities {
    /// Returns true if the event is granted and not denied.
    ///
    /// Denials are checked first: a deny anywhere in the chain wins
    /// over every grant.
    #[must_use]
    pub fn allows(&self, event_name: &str) -> bool {
        if self.denials.iter().any(|p| p.matches(event_name)) {
            return false;
        }
        self.grants.iter().any(|p| p.matches(event_name))
    }

    /// Effective grant patterns, ancestor-first.
    #[must_use]
    pub fn grants(&self) -> &[EventPattern] {
        &self.grants
    }

    /// Effective denial patterns.
    #[must_use]
    pub fn denials(&self) -> &[EventPattern] {
        &self.denials
    }
}

/// An agent's capability snapshot, frozen at bind time.
#[derive(Debug)]
pub struct BoundCapabilities {
    /// The bound agent.
    pub agent: AgentId,

    /// The resolved permission set at the moment of binding.
    pub resolved: ResolvedCapabilities,
}

/// Profile registry with agent bindings.
///
/// Mutations are synchronous under a `parking_lot` lock, so readers
/// never observe a half-registered profile.
pub struct CapabilityRegistry {
    profiles: RwLock<HashMap<String, ProfileDef>>,
    bindings: RwLock<HashMap<AgentId, Arc<BoundCapabilities>>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a profile definition.
    ///
    /// Every grant and denial entry must parse as an event pattern.
    /// Re-registering a name replaces the stored definition (already
    /// bound agents keep their snapshot).
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidPattern`] on a malformed
    /// grant or denial entry.
    pub fn register_profile(&self, def: ProfileDef) -> Result<(), CapabilityError> {
        let name = def.name().to_string();

        for entry in def.permissions.events.iter().chain(&def.permissions.deny) {
            EventPattern::parse(entry).map_err(|source| CapabilityError::InvalidPattern {
                profile: name.clone(),
                pattern: entry.clone(),
                source,
            })?;
        }

        let mut profiles = self.profiles.write();
        if profiles.insert(name.clone(), def).is_some() {
            warn!(profile = %name, "Replaced existing profile definition");
        } else {
            debug!(profile = %name, "Registered profile");
        }
        Ok(())
    }

    /// Loads and registers every profile a [`ProfileStore`] can see.
    ///
    /// Errors are collected, not first-only: all loadable profiles
    /// are registered even when some fail.
    pub fn load_all(&self, store: &ProfileStore) -> Vec<CapabilityError> {
        let mut errors = Vec::new();
        for entry in store.list() {
            let result =
                ProfileStore::load_from_path(&entry.path).and_then(|def| self.register_profile(def));
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors
    }

    /// Returns the registered profile names, sorted.
    #[must_use]
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves a profile's effective permission set.
    ///
    /// Walks the `extends` chain to the root, then unions grants
    /// ancestor-first and denials from every link. Resolution is pure
    /// over the current registry contents: calling it twice without
    /// an intervening registration returns the same set.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::ProfileNotFound`] for an unknown
    /// name anywhere in the chain and
    /// [`CapabilityError::CircularInheritance`] if the chain loops.
    pub fn resolve(&self, name: &str) -> Result<ResolvedCapabilities, CapabilityError> {
        let profiles = self.profiles.read();

        // Walk child -> parent, collecting the chain.
        let mut chain = Vec::new();
        let mut cursor = Some(name.to_string());
        while let Some(current) = cursor {
            if chain.contains(&current) {
                return Err(CapabilityError::CircularInheritance {
                    name: current,
                    chain,
                });
            }
            let def = profiles
                .get(&current)
                .ok_or_else(|| CapabilityError::ProfileNotFound {
                    name: current.clone(),
                    searched: Vec::new(),
                })?;
            cursor = def.extends().map(str::to_string);
            chain.push(current);
        }
        chain.reverse();

        // Union ancestor-first so a child's grants append after its
        // parents'. Duplicate pattern strings collapse.
        let mut grants = Vec::new();
        let mut denials = Vec::new();
        let mut seen_grants = std::collections::HashSet::new();
        let mut seen_denials = std::collections::HashSet::new();
        for link in &chain {
            let def = &profiles[link];
            for entry in &def.permissions.events {
                if seen_grants.insert(entry.clone()) {
                    grants.push(pattern(link, entry)?);
                }
            }
            for entry in &def.permissions.deny {
                if seen_denials.insert(entry.clone()) {
                    denials.push(pattern(link, entry)?);
                }
            }
        }

        Ok(ResolvedCapabilities {
            profile: name.to_string(),
            chain,
            grants,
            denials,
        })
    }

    /// Binds an agent to a profile, snapshotting its resolved set.
    ///
    /// The snapshot is immutable for the agent's lifetime. Binding an
    /// already-bound agent is refused; a fresh agent identity is the
    /// only way to change profiles.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::AlreadyBound`] or any resolution
    /// error.
    pub fn bind(
        &self,
        agent: &AgentId,
        profile: &str,
    ) -> Result<Arc<BoundCapabilities>, CapabilityError> {
        let resolved = self.resolve(profile)?;

        let mut bindings = self.bindings.write();
        if let Some(existing) = bindings.get(agent) {
            return Err(CapabilityError::AlreadyBound {
                agent: agent.clone(),
                profile: existing.resolved.profile.clone(),
            });
        }

        let bound = Arc::new(BoundCapabilities {
            agent: agent.clone(),
            resolved,
        });
        bindings.insert(agent.clone(), Arc::clone(&bound));
        debug!(agent = %agent, profile = %profile, "Bound agent capabilities");
        Ok(bound)
    }

    /// Removes an agent's binding when the agent is torn down.
    ///
    /// Returns the released snapshot, if one existed.
    pub fn release(&self, agent: &AgentId) -> Option<Arc<BoundCapabilities>> {
        self.bindings.write().remove(agent)
    }

    /// Returns the agent's snapshot, if bound.
    #[must_use]
    pub fn binding(&self, agent: &AgentId) -> Option<Arc<BoundCapabilities>> {
        self.bindings.read().get(agent).cloned()
    }

    /// Checks whether a bound agent may emit the given event.
    ///
    /// Fails fast with a typed error; never a silent drop.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotBound`] for an unbound agent and
    /// [`CapabilityError::PermissionDenied`] for a refused event.
    pub fn check_permission(
        &self,
        agent: &AgentId,
        event_name: &str,
    ) -> Result<(), CapabilityError> {
        let bound = self
            .binding(agent)
            .ok_or_else(|| CapabilityError::NotBound {
                agent: agent.clone(),
            })?;

        if bound.resolved.allows(event_name) {
            Ok(())
        } else {
            Err(CapabilityError::PermissionDenied {
                agent: agent.clone(),
                event: event_name.to_string(),
                profile: bound.resolved.profile.clone(),
            })
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn pattern(profile: &str, entry: &str) -> Result<EventPattern, CapabilityError> {
    EventPattern::parse(entry).map_err(|source| CapabilityError::InvalidPattern {
        profile: profile.to_string(),
        pattern: entry.to_string(),
        source,
    })
}
