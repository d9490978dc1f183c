//! Transformer engine — declarative event rewriting.
//!
//! Rules are validated, conflict-checked, and cycle-checked at
//! registration, so matching at emit time can assume a consistent
//! rule set. Matching picks the highest-priority satisfied rule;
//! mapping failures surface as typed errors, never as partially
//! resolved events.

use super::condition::Condition;
use super::rule::{RuleSet, TransformerRule};
use super::template::{resolve_mapping, scope_of};
use crate::TransformError;
use parking_lot::RwLock;
use plexus_event::{Event, EventPattern};
use plexus_types::RuleId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Bound on multi-hop cycle probing at registration.
pub const MAX_ROUTE_DEPTH: u32 = 8;

struct RegisteredRule {
    id: RuleId,
    rule: TransformerRule,
    source: EventPattern,
    condition: Option<Condition>,
    origin: String,
    expires_at: Option<Instant>,
}

/// Listing entry for introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleInfo {
    /// Registration id.
    pub id: RuleId,
    /// Rule label (declared id or `<anonymous>`).
    pub label: String,
    /// Source pattern string.
    pub source: String,
    /// Target event names.
    pub targets: Vec<String>,
    /// Selection priority.
    pub priority: i64,
    /// Whether targets are emitted from a spawned task.
    pub is_async: bool,
    /// Whether a satisfied match short-circuits handler dispatch.
    pub exclusive: bool,
    /// Whether the rule participates in matching.
    pub enabled: bool,
    /// Source tag: rule file stem, or `api` for direct registration.
    pub origin: String,
}

/// Outcome of matching one event against the rule set.
#[derive(Debug)]
pub struct TransformResult {
    /// The winning rule.
    pub rule_id: RuleId,
    /// Its label, for diagnostics and result origins.
    pub label: String,
    /// Derived target events, context already descended.
    pub events: Vec<Event>,
    /// Whether handler dispatch for the source event is skipped.
    pub exclusive: bool,
    /// Whether targets are emitted from a spawned task.
    pub is_async: bool,
    /// Pending-response TTL override declared by the rule.
    pub ttl: Option<Duration>,
}

/// Per-rule report from loading a rule file.
#[derive(Debug)]
pub struct LoadReport {
    /// Source tag the loaded rules are registered under.
    pub origin: String,
    /// Rules registered successfully.
    pub loaded: Vec<RuleId>,
    /// Rules refused, by label.
    pub errors: Vec<(String, TransformError)>,
}

/// Origin tag for rules registered through the API.
pub const API_ORIGIN: &str = "api";

/// Priority-ordered transformer rule set with hot reload.
pub struct TransformEngine {
    rules: RwLock<Vec<RegisteredRule>>,
    max_route_depth: u32,
}

impl TransformEngine {
    /// Creates an empty engine with the default cycle-probe bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_route_depth(MAX_ROUTE_DEPTH)
    }

    /// Creates an empty engine with an explicit cycle-probe bound.
    #[must_use]
    pub fn with_max_route_depth(max_route_depth: u32) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            max_route_depth,
        }
    }

    /// Registers one rule under the `api` origin.
    ///
    /// # Errors
    ///
    /// See [`register_tagged`](Self::register_tagged).
    pub fn register(&self, rule: TransformerRule) -> Result<RuleId, TransformError> {
        self.register_tagged(rule, API_ORIGIN)
    }

    /// Registers one rule tagged with its origin.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed rules,
    /// [`TransformError::DuplicateRule`] when a rule with the same
    /// source and priority exists, and
    /// [`TransformError::CircularRouting`] when the rule would close
    /// a routing cycle. Cycles are rejected here, never at runtime.
    pub fn register_tagged(
        &self,
        rule: TransformerRule,
        origin: &str,
    ) -> Result<RuleId, TransformError> {
        rule.validate()?;
        let source = EventPattern::parse(&rule.source)?;
        let condition = rule
            .condition
            .as_deref()
            .map(Condition::parse)
            .transpose()?;

        let mut rules = self.rules.write();
        Self::prune_expired_locked(&mut rules);

        if let Some(existing) = rules
            .iter()
            .find(|r| r.rule.source == rule.source && r.rule.priority == rule.priority)
        {
            debug!(
                existing = existing.rule.label(),
                refused = rule.label(),
                source = %rule.source,
                priority = rule.priority,
                "Refusing duplicate rule"
            );
            return Err(TransformError::DuplicateRule {
                pattern: rule.source.clone(),
                priority: rule.priority,
            });
        }

        for existing in rules.iter() {
            if existing.source.overlaps(&source)
                && existing
                    .rule
                    .target_names()
                    .iter()
                    .any(|t| rule.target_names().contains(t))
            {
                warn!(
                    existing = existing.rule.label(),
                    new = rule.label(),
                    "Overlapping rules share a target; both will be kept"
                );
            }
        }

        self.check_cycles(&rules, &source, &rule)?;

        let id = RuleId::new();
        let expires_at = rule.ttl.map(|secs| Instant::now() + Duration::from_secs(secs));

        // Priority descending, FIFO within a priority.
        let pos = rules
            .iter()
            .position(|r| r.rule.priority < rule.priority)
            .unwrap_or(rules.len());

        debug!(
            id = %id,
            label = rule.label(),
            source = %rule.source,
            priority = rule.priority,
            origin,
            "Registered transformer rule"
        );

        rules.insert(
            pos,
            RegisteredRule {
                id,
                rule,
                source,
                condition,
                origin: origin.to_string(),
                expires_at,
            },
        );
        Ok(id)
    }

    /// Probes for routing cycles the candidate rule would close.
    ///
    /// Follows target names through existing sources up to the
    /// configured depth; a path re-entering the candidate's source
    /// is a cycle.
    fn check_cycles(
        &self,
        rules: &[RegisteredRule],
        candidate_source: &EventPattern,
        candidate: &TransformerRule,
    ) -> Result<(), TransformError> {
        let mut stack: Vec<(String, Vec<String>)> = candidate
            .target_names()
            .iter()
            .map(|t| ((*t).to_string(), vec![candidate.source.clone(), (*t).to_string()]))
            .collect();

        while let Some((name, chain)) = stack.pop() {
            if candidate_source.matches(&name) {
                return Err(TransformError::CircularRouting { chain });
            }
            if chain.len() > self.max_route_depth as usize {
                continue;
            }
            for rule in rules.iter().filter(|r| r.rule.enabled) {
                if rule.source.matches(&name) {
                    for target in rule.rule.target_names() {
                        if candidate_source.matches(target) {
                            let mut cycle = chain.clone();
                            cycle.push(target.to_string());
                            return Err(TransformError::CircularRouting { chain: cycle });
                        }
                        // chain[0] is the candidate's own source; only
                        // later hops mark a pre-existing loop that can
                        // be skipped.
                        if chain.iter().skip(1).any(|hop| hop == target) {
                            continue;
                        }
                        let mut next = chain.clone();
                        next.push(target.to_string());
                        stack.push((target.to_string(), next));
                    }
                }
            }
        }
        Ok(())
    }

    /// Unregisters by id. Returns `true` if found and removed.
    pub fn unregister(&self, id: RuleId) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        rules.len() < before
    }

    /// Removes every rule registered under `origin`. Returns the
    /// number removed.
    pub fn unload_source(&self, origin: &str) -> usize {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.origin != origin);
        let removed = before - rules.len();
        debug!(origin, removed, "Unloaded rule source");
        removed
    }

    /// Loads a TOML rule file, registering each rule tagged with the
    /// file stem.
    ///
    /// Individual rule failures land in the report; the file itself
    /// failing to read or parse is an error.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::ReadFile`] or
    /// [`TransformError::ParseToml`].
    pub fn load_file(&self, path: &Path) -> Result<LoadReport, TransformError> {
        let content = std::fs::read_to_string(path).map_err(|source| TransformError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let set = RuleSet::from_toml(&content).map_err(|source| TransformError::ParseToml {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        let origin = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("rules")
            .to_string();

        let mut report = LoadReport {
            origin: origin.clone(),
            loaded: Vec::new(),
            errors: Vec::new(),
        };
        for rule in set.transformers {
            let label = rule.label().to_string();
            match self.register_tagged(rule, &origin) {
                Ok(id) => report.loaded.push(id),
                Err(e) => report.errors.push((label, e)),
            }
        }

        debug!(
            origin = %report.origin,
            loaded = report.loaded.len(),
            refused = report.errors.len(),
            "Loaded rule file"
        );
        Ok(report)
    }

    /// Matches an event against the rule set.
    ///
    /// Candidates are enabled, unexpired rules whose source matches;
    /// the highest-priority satisfied rule wins (ties by registration
    /// time). A condition over a missing field skips the rule, never
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::TemplateUnresolved`] when the
    /// winning rule's mapping references an absent field.
    pub fn apply(&self, event: &Event) -> Result<Option<TransformResult>, TransformError> {
        let rules = self.rules.read();
        let now = Instant::now();
        let scope = scope_of(event);

        for registered in rules.iter() {
            if !registered.rule.enabled {
                continue;
            }
            if registered.expires_at.is_some_and(|at| at <= now) {
                continue;
            }
            if !registered.source.matches(&event.name) {
                continue;
            }
            if let Some(condition) = &registered.condition {
                if !condition.eval(&scope) {
                    continue;
                }
            }

            let mut events = Vec::new();
            for target in registered.rule.target_names() {
                let payload = resolve_mapping(&registered.rule.mapping, event)?;
                events.push(event.derive(target, payload));
            }

            debug!(
                event = %event.name,
                rule = registered.rule.label(),
                targets = events.len(),
                exclusive = registered.rule.exclusive,
                "Transformer rule matched"
            );
            return Ok(Some(TransformResult {
                rule_id: registered.id,
                label: registered.rule.label().to_string(),
                events,
                exclusive: registered.rule.exclusive,
                is_async: registered.rule.is_async,
                ttl: registered.rule.ttl.map(Duration::from_secs),
            }));
        }

        Ok(None)
    }

    /// Removes expired rules. Returns the number pruned.
    pub fn prune_expired(&self) -> usize {
        Self::prune_expired_locked(&mut self.rules.write())
    }

    fn prune_expired_locked(rules: &mut Vec<RegisteredRule>) -> usize {
        let now = Instant::now();
        let before = rules.len();
        rules.retain(|r| r.expires_at.is_none_or(|at| at > now));
        let pruned = before - rules.len();
        if pruned > 0 {
            debug!(pruned, "Pruned expired transformer rules");
        }
        pruned
    }

    /// Lists all rules in selection order.
    #[must_use]
    pub fn list(&self) -> Vec<RuleInfo> {
        self.rules
            .read()
            .iter()
            .map(|r| RuleInfo {
                id: r.id,
                label: r.rule.label().to_string(),
                source: r.rule.source.clone(),
                targets: r
                    .rule
                    .target_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                priority: r.rule.priority,
                is_async: r.rule.is_async,
                exclusive: r.rule.exclusive,
                enabled: r.rule.enabled,
                origin: r.origin.clone(),
            })
            .collect()
    }

    /// Number of registered rules, expired included until pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns `true` when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn rule(source: &str, target: &str) -> TransformerRule {
        TransformerRule {
            source: source.to_string(),
            target: Some(target.to_string()),
            ..Default::default()
        }
    }

    fn mapped(source: &str, target: &str, mapping: &[(&str, &str)]) -> TransformerRule {
        TransformerRule {
            mapping: mapping
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..rule(source, target)
        }
    }

    // ── Registration conflicts ───────────────────────────────

    #[test]
    fn duplicate_source_and_priority_refused() {
        let engine = TransformEngine::new();
        engine
            .register(rule("order:placed", "inventory:reserve"))
            .expect("first rule should register");

        let err = engine
            .register(rule("order:placed", "audit:order"))
            .expect_err("same source and priority must be refused");
        assert!(matches!(err, TransformError::DuplicateRule { .. }));
    }

    #[test]
    fn same_source_different_priority_allowed() {
        let engine = TransformEngine::new();
        engine
            .register(rule("order:placed", "inventory:reserve"))
            .expect("first rule should register");

        let mut second = rule("order:placed", "audit:order");
        second.priority = 2000;
        engine
            .register(second)
            .expect("different priority should be allowed");
    }

    // ── Cycle detection ──────────────────────────────────────

    #[test]
    fn self_loop_rejected() {
        let engine = TransformEngine::new();
        let err = engine
            .register(rule("loop:event", "loop:event"))
            .expect_err("self loop must be rejected");
        assert!(matches!(err, TransformError::CircularRouting { .. }));
    }

    #[test]
    fn cycles_up_to_depth_five_rejected_at_registration() {
        // a -> b -> c -> d -> e, then closing e -> a must fail.
        let engine = TransformEngine::new();
        let hops = ["ns:a", "ns:b", "ns:c", "ns:d", "ns:e"];
        for pair in hops.windows(2) {
            engine
                .register(rule(pair[0], pair[1]))
                .expect("chain link should register");
        }

        let err = engine
            .register(rule("ns:e", "ns:a"))
            .expect_err("closing the cycle must be rejected");
        assert!(matches!(err, TransformError::CircularRouting { .. }));
    }

    #[test]
    fn two_rule_cycle_rejected_at_registration() {
        let engine = TransformEngine::new();
        engine
            .register(rule("a:one", "b:two"))
            .expect("first rule should register");
        let err = engine
            .register(rule("b:two", "a:one"))
            .expect_err("closing the pair must be rejected");
        assert!(matches!(err, TransformError::CircularRouting { .. }));
    }

    #[test]
    fn wildcard_source_cycle_rejected() {
        let engine = TransformEngine::new();
        let err = engine
            .register(rule("order:*", "order:derived"))
            .expect_err("wildcard re-entering its own namespace must be rejected");
        assert!(matches!(err, TransformError::CircularRouting { .. }));
    }

    #[test]
    fn acyclic_chain_registers() {
        let engine = TransformEngine::new();
        engine
            .register(rule("order:placed", "inventory:reserve"))
            .expect("should register");
        engine
            .register(rule("inventory:reserve", "shipping:schedule"))
            .expect("acyclic continuation should register");
    }

    // ── Matching ─────────────────────────────────────────────

    #[test]
    fn order_placed_maps_to_inventory_reserve() {
        let engine = TransformEngine::new();
        engine
            .register(mapped(
                "order:placed",
                "inventory:reserve",
                &[("sku", "{{data.item.sku}}"), ("qty", "{{data.quantity}}")],
            ))
            .expect("mapping rule should register");

        let event = Event::new(
            "order:placed",
            json!({"item": {"sku": "X1"}, "quantity": 3}),
        );
        let result = engine
            .apply(&event)
            .expect("apply should succeed")
            .expect("rule should match");

        assert_eq!(result.events.len(), 1);
        let target = &result.events[0];
        assert_eq!(target.name, "inventory:reserve");
        assert_eq!(target.payload, json!({"sku": "X1", "qty": 3}));
        // Context descends monotonically into the derived event.
        assert_eq!(
            target.context.correlation_id,
            event.context.correlation_id
        );
        assert_eq!(target.context.parent_event_id, Some(event.id));
        assert_eq!(target.context.depth, 1);
    }

    #[test]
    fn no_matching_rule_is_none() {
        let engine = TransformEngine::new();
        engine
            .register(rule("order:placed", "inventory:reserve"))
            .expect("should register");

        let outcome = engine
            .apply(&Event::new("payment:settled", json!({})))
            .expect("apply should succeed");
        assert!(outcome.is_none());
    }

    #[test]
    fn highest_priority_satisfied_rule_wins() {
        let engine = TransformEngine::new();
        let mut low = rule("order:placed", "audit:order");
        low.priority = 100;
        let mut high = rule("order:placed", "inventory:reserve");
        high.priority = 9000;
        engine.register(low).expect("low should register");
        engine.register(high).expect("high should register");

        let result = engine
            .apply(&Event::new("order:placed", json!({})))
            .expect("apply should succeed")
            .expect("a rule should match");
        assert_eq!(result.events[0].name, "inventory:reserve");
    }

    #[test]
    fn condition_on_missing_field_skips_without_error() {
        let engine = TransformEngine::new();
        let mut guarded = rule("order:placed", "inventory:reserve");
        guarded.condition = Some("data.quantity > 0".into());
        engine.register(guarded).expect("should register");

        let outcome = engine
            .apply(&Event::new("order:placed", json!({"note": "no quantity"})))
            .expect("missing condition field must not error");
        assert!(outcome.is_none());
    }

    #[test]
    fn unsatisfied_condition_falls_through_to_lower_priority() {
        let engine = TransformEngine::new();
        let mut bulk = rule("order:placed", "warehouse:bulk");
        bulk.priority = 5000;
        bulk.condition = Some("data.quantity >= 100".into());
        let mut normal = rule("order:placed", "inventory:reserve");
        normal.priority = 1000;
        engine.register(bulk).expect("bulk should register");
        engine.register(normal).expect("normal should register");

        let result = engine
            .apply(&Event::new("order:placed", json!({"quantity": 3})))
            .expect("apply should succeed")
            .expect("fallback rule should match");
        assert_eq!(result.events[0].name, "inventory:reserve");
    }

    #[test]
    fn mapping_missing_field_is_a_template_error() {
        let engine = TransformEngine::new();
        engine
            .register(mapped(
                "order:placed",
                "inventory:reserve",
                &[("sku", "{{data.item.sku}}")],
            ))
            .expect("should register");

        let err = engine
            .apply(&Event::new("order:placed", json!({"quantity": 3})))
            .expect_err("unresolved mapping must error, never echo the template");
        assert!(matches!(err, TransformError::TemplateUnresolved { .. }));
    }

    #[test]
    fn disabled_rule_never_matches() {
        let engine = TransformEngine::new();
        let mut disabled = rule("order:placed", "inventory:reserve");
        disabled.enabled = false;
        engine.register(disabled).expect("should register");

        let outcome = engine
            .apply(&Event::new("order:placed", json!({})))
            .expect("apply should succeed");
        assert!(outcome.is_none());
    }

    #[test]
    fn fanout_rule_derives_every_target() {
        let engine = TransformEngine::new();
        engine
            .register(TransformerRule {
                source: "order:placed".into(),
                targets: vec!["audit:order".into(), "metrics:order".into()],
                exclusive: false,
                ..Default::default()
            })
            .expect("fan-out rule should register");

        let result = engine
            .apply(&Event::new("order:placed", json!({"sku": "X1"})))
            .expect("apply should succeed")
            .expect("rule should match");
        assert!(!result.exclusive);
        let names: Vec<&str> = result.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["audit:order", "metrics:order"]);
        // Empty mapping passes the payload through to each target.
        assert_eq!(result.events[0].payload, json!({"sku": "X1"}));
    }

    // ── TTL pruning ──────────────────────────────────────────

    #[test]
    fn ttl_rule_matches_before_expiry() {
        let engine = TransformEngine::new();
        let mut ephemeral = rule("order:placed", "inventory:reserve");
        ephemeral.ttl = Some(1);
        engine.register(ephemeral).expect("should register");
        assert_eq!(engine.len(), 1);

        // Not expired yet: still matches.
        let outcome = engine
            .apply(&Event::new("order:placed", json!({})))
            .expect("apply should succeed");
        assert!(outcome.is_some());
    }

    // ── Hot reload ───────────────────────────────────────────

    #[test]
    fn load_file_and_unload_source() {
        let temp = tempfile::TempDir::new().expect("should create temp dir for rule file");
        let path = temp.path().join("orders.toml");
        std::fs::write(
            &path,
            r#"
[[transformers]]
id = "reserve"
source = "order:placed"
target = "inventory:reserve"

[[transformers]]
id = "broken"
source = "order:cancelled"
"#,
        )
        .expect("should write rule file");

        let engine = TransformEngine::new();
        let report = engine.load_file(&path).expect("file should load");
        assert_eq!(report.origin, "orders");
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, "broken");

        assert_eq!(engine.unload_source("orders"), 1);
        assert!(engine.is_empty());
    }

    #[test]
    fn load_missing_file_fails() {
        let engine = TransformEngine::new();
        let err = engine
            .load_file(Path::new("/nonexistent/rules.toml"))
            .expect_err("missing file should fail");
        assert!(matches!(err, TransformError::ReadFile { .. }));
    }

    // ── Listing ──────────────────────────────────────────────

    #[test]
    fn list_reports_origin_and_flags() {
        let engine = TransformEngine::new();
        engine
            .register_tagged(
                TransformerRule {
                    id: Some("audit".into()),
                    is_async: true,
                    exclusive: false,
                    ..rule("order:placed", "audit:order")
                },
                "orders",
            )
            .expect("should register");

        let infos = engine.list();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].label, "audit");
        assert_eq!(infos[0].origin, "orders");
        assert!(infos[0].is_async);
        assert!(!infos[0].exclusive);
    }
}
