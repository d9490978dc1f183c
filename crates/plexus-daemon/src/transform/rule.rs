//! Declarative transformer rules.
//!
//! Rules are TOML-serializable and loaded from rule files at startup
//! or hot-reloaded at runtime.
//!
//! # Example TOML
//!
//! ```toml
//! [[transformers]]
//! source = "order:placed"
//! target = "inventory:reserve"
//! condition = "data.quantity > 0"
//! priority = 2000
//!
//! [transformers.mapping]
//! sku = "{{data.item.sku}}"
//! qty = "{{data.quantity}}"
//!
//! [[transformers]]
//! source = "order:*"
//! targets = ["audit:order", "metrics:order"]
//! async = true
//! ttl = 300
//! ```

use crate::transform::Condition;
use plexus_event::{validate_event_name, EventPattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Priority assigned when a rule omits one.
pub const DEFAULT_RULE_PRIORITY: i64 = 1000;

/// Inclusive priority bounds.
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 0..=10_000;

/// Top-level rule file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleSet {
    /// Declarative transformer rules.
    pub transformers: Vec<TransformerRule>,
}

/// A single transformer rule.
///
/// Exactly one of `target` or `targets` must be specified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransformerRule {
    /// Optional stable id. Auto-generated if not specified.
    pub id: Option<String>,

    /// Source pattern: which events this rule rewrites.
    pub source: String,

    /// Single target event name.
    pub target: Option<String>,

    /// Fan-out target event names.
    pub targets: Vec<String>,

    /// Field templates for the target payload. Empty mapping passes
    /// the source payload through unmodified.
    pub mapping: BTreeMap<String, String>,

    /// Guard expression over `data.*` / `context.*`. A missing field
    /// makes the condition false, never an error.
    pub condition: Option<String>,

    /// Emit targets from a spawned task instead of inline.
    #[serde(rename = "async")]
    pub is_async: bool,

    /// Selection priority. Highest satisfied rule wins.
    pub priority: i64,

    /// Seconds until the rule expires and is pruned. Must be > 0.
    pub ttl: Option<u64>,

    /// Whether a satisfied match short-circuits handler dispatch.
    pub exclusive: bool,

    /// Whether the rule participates in matching.
    pub enabled: bool,
}

impl Default for TransformerRule {
    fn default() -> Self {
        Self {
            id: None,
            source: String::new(),
            target: None,
            targets: Vec::new(),
            mapping: BTreeMap::new(),
            condition: None,
            is_async: false,
            priority: DEFAULT_RULE_PRIORITY,
            ttl: None,
            exclusive: true,
            enabled: true,
        }
    }
}

/// Errors from validating a [`TransformerRule`].
#[derive(Debug, Error)]
pub enum RuleValidationError {
    /// Neither `target` nor `targets` is specified.
    #[error("rule '{label}': neither 'target' nor 'targets' specified")]
    NoTarget {
        /// Rule id or `<anonymous>`.
        label: String,
    },

    /// Both `target` and `targets` are specified.
    #[error("rule '{label}': both 'target' and 'targets' specified (use one)")]
    BothTargets {
        /// Rule id or `<anonymous>`.
        label: String,
    },

    /// Source pattern failed to parse.
    #[error("rule '{label}': {source}")]
    InvalidSource {
        /// Rule id or `<anonymous>`.
        label: String,
        /// Underlying parse error.
        source: plexus_event::EventError,
    },

    /// A target is not a valid concrete event name.
    #[error("rule '{label}': target '{target}': {source}")]
    InvalidTarget {
        /// Rule id or `<anonymous>`.
        label: String,
        /// The offending target.
        target: String,
        /// Underlying parse error.
        source: plexus_event::EventError,
    },

    /// Priority is outside the allowed range.
    #[error("rule '{label}': priority {priority} outside {}..={}", PRIORITY_RANGE.start(), PRIORITY_RANGE.end())]
    PriorityOutOfRange {
        /// Rule id or `<anonymous>`.
        label: String,
        /// The rejected priority.
        priority: i64,
    },

    /// TTL must be positive when present.
    #[error("rule '{label}': ttl must be > 0")]
    ZeroTtl {
        /// Rule id or `<anonymous>`.
        label: String,
    },

    /// Condition expression was rejected.
    #[error("rule '{label}': condition rejected: {message}")]
    InvalidCondition {
        /// Rule id or `<anonymous>`.
        label: String,
        /// Rejection reason.
        message: String,
    },
}

impl TransformerRule {
    /// Rule id or `<anonymous>` for diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<anonymous>")
    }

    /// Target event names, regardless of which field declared them.
    #[must_use]
    pub fn target_names(&self) -> Vec<&str> {
        match &self.target {
            Some(t) => vec![t.as_str()],
            None => self.targets.iter().map(String::as_str).collect(),
        }
    }

    /// Validates this rule.
    ///
    /// Checks target exclusivity, source pattern syntax, target name
    /// syntax, priority range, TTL positivity, and condition syntax
    /// (including the forbidden-construct scan).
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        let label = self.label().to_string();

        match (&self.target, self.targets.is_empty()) {
            (None, true) => return Err(RuleValidationError::NoTarget { label }),
            (Some(_), false) => return Err(RuleValidationError::BothTargets { label }),
            _ => {}
        }

        EventPattern::parse(&self.source).map_err(|e| RuleValidationError::InvalidSource {
            label: label.clone(),
            source: e,
        })?;

        for target in self.target_names() {
            validate_event_name(target).map_err(|e| RuleValidationError::InvalidTarget {
                label: label.clone(),
                target: target.to_string(),
                source: e,
            })?;
        }

        if !PRIORITY_RANGE.contains(&self.priority) {
            return Err(RuleValidationError::PriorityOutOfRange {
                label,
                priority: self.priority,
            });
        }

        if self.ttl == Some(0) {
            return Err(RuleValidationError::ZeroTtl { label });
        }

        if let Some(expr) = &self.condition {
            Condition::parse(expr).map_err(|e| RuleValidationError::InvalidCondition {
                label,
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl RuleSet {
    /// Parses a rule set from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another rule set into this one.
    ///
    /// Rules accumulate across layers. A rule in `other` whose `id`
    /// matches an existing rule replaces it (override semantics);
    /// anonymous rules always append.
    pub fn merge(&mut self, other: &Self) {
        for rule in &other.transformers {
            if let Some(id) = &rule.id {
                self.transformers.retain(|r| r.id.as_deref() != Some(id));
            }
            self.transformers.push(rule.clone());
        }
    }

    /// Validates all rules, returning every error (not just the
    /// first).
    pub fn validate_all(&self) -> Vec<RuleValidationError> {
        self.transformers
            .iter()
            .filter_map(|r| r.validate().err())
            .collect()
    }
}
