//! Event pattern matching.
//!
//! Patterns address events by their namespaced name:
//!
//! ```text
//! pattern := <ns> ":" <verb>     exact match
//!          | <ns> ":" "*"        any event in the namespace
//!          | "*"                 any event
//! ```
//!
//! A wildcard is only legal as the entire trailing segment. Mid-pattern
//! wildcards (`*:verb`, `ns:*:x`, `ns:ver*`) are rejected at parse
//! time so registration failures surface synchronously, never during
//! dispatch.

use crate::EventError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed event pattern.
///
/// # Examples
///
/// ```text
/// "state:get"   → Exact("state:get")
/// "state:*"     → Namespace("state")
/// "*"           → Any
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventPattern {
    /// Matches exactly the given event name.
    Exact(String),
    /// Matches any event whose namespace equals the given string.
    Namespace(String),
    /// Matches any event.
    Any,
}

impl EventPattern {
    /// Parses a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPattern`] if the string is empty,
    /// lacks a `:` separator (and is not the bare `*`), has empty
    /// segments, or places a wildcard anywhere but the trailing
    /// segment.
    pub fn parse(pattern: &str) -> Result<Self, EventError> {
        if pattern.is_empty() {
            return Err(EventError::InvalidPattern("empty pattern".into()));
        }

        if pattern == "*" {
            return Ok(Self::Any);
        }

        let Some(sep) = pattern.find(':') else {
            return Err(EventError::InvalidPattern(format!(
                "missing ':' separator in '{pattern}'"
            )));
        };

        let ns = &pattern[..sep];
        let rest = &pattern[sep + 1..];

        if ns.is_empty() {
            return Err(EventError::InvalidPattern(format!(
                "empty namespace in '{pattern}'"
            )));
        }
        if rest.is_empty() {
            return Err(EventError::InvalidPattern(format!(
                "empty verb in '{pattern}'"
            )));
        }
        if ns.contains('*') {
            return Err(EventError::InvalidPattern(format!(
                "wildcard in namespace position in '{pattern}'"
            )));
        }

        if rest == "*" {
            return Ok(Self::Namespace(ns.to_string()));
        }

        if rest.contains('*') {
            return Err(EventError::InvalidPattern(format!(
                "wildcard must be the entire trailing segment in '{pattern}'"
            )));
        }

        Ok(Self::Exact(pattern.to_string()))
    }

    /// Returns `true` if this pattern matches the given event name.
    ///
    /// `Namespace("ns")` matches every name whose namespace part (the
    /// text before the first `:`) equals `ns`, and never crosses into
    /// another namespace.
    #[must_use]
    pub fn matches(&self, event_name: &str) -> bool {
        match self {
            Self::Exact(name) => name == event_name,
            Self::Namespace(ns) => event_name
                .split_once(':')
                .is_some_and(|(event_ns, _)| event_ns == ns),
            Self::Any => true,
        }
    }

    /// Returns `true` if this pattern can match any name the other
    /// pattern matches.
    ///
    /// Used for low-severity overlap warnings at transformer
    /// registration; exactness is not required, only one-sided
    /// coverage.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Namespace(ns), Self::Exact(name))
            | (Self::Exact(name), Self::Namespace(ns)) => {
                name.split_once(':').is_some_and(|(n, _)| n == ns)
            }
            (Self::Namespace(a), Self::Namespace(b)) => a == b,
        }
    }

    /// Returns `true` if this pattern contains a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Namespace(ns) => write!(f, "{ns}:*"),
            Self::Any => f.write_str("*"),
        }
    }
}

/// Validates a concrete event name: `ns:verb` with non-empty segments
/// and no wildcards.
///
/// Names may carry further `:`-separated segments (`state:entity:get`);
/// only the first separator is structural.
///
/// # Errors
///
/// Returns [`EventError::InvalidName`] on violation.
pub fn validate_event_name(name: &str) -> Result<(), EventError> {
    if name.is_empty() {
        return Err(EventError::InvalidName("empty name".into()));
    }
    if name.contains('*') {
        return Err(EventError::InvalidName(format!(
            "wildcard in event name '{name}'"
        )));
    }
    let Some((ns, verb)) = name.split_once(':') else {
        return Err(EventError::InvalidName(format!(
            "missing ':' separator in '{name}'"
        )));
    };
    if ns.is_empty() || verb.is_empty() {
        return Err(EventError::InvalidName(format!(
            "empty segment in '{name}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Parsing ──────────────────────────────────────────────

    #[test]
    fn parse_exact() {
        let p = EventPattern::parse("state:get").expect("exact pattern should parse");
        assert_eq!(p, EventPattern::Exact("state:get".into()));
    }

    #[test]
    fn parse_namespace_wildcard() {
        let p = EventPattern::parse("state:*").expect("namespace wildcard should parse");
        assert_eq!(p, EventPattern::Namespace("state".into()));
    }

    #[test]
    fn parse_any() {
        let p = EventPattern::parse("*").expect("bare '*' should parse");
        assert_eq!(p, EventPattern::Any);
    }

    // ── Parse errors ─────────────────────────────────────────

    #[test]
    fn parse_empty() {
        assert!(EventPattern::parse("").is_err());
    }

    #[test]
    fn parse_missing_separator() {
        assert!(EventPattern::parse("stateget").is_err());
    }

    #[test]
    fn parse_empty_namespace() {
        assert!(EventPattern::parse(":get").is_err());
    }

    #[test]
    fn parse_empty_verb() {
        assert!(EventPattern::parse("state:").is_err());
    }

    #[test]
    fn parse_wildcard_namespace_rejected() {
        assert!(EventPattern::parse("*:get").is_err());
    }

    #[test]
    fn parse_mid_pattern_wildcard_rejected() {
        assert!(EventPattern::parse("state:*:extra").is_err());
        assert!(EventPattern::parse("state:ge*").is_err());
        assert!(EventPattern::parse("st*te:get").is_err());
    }

    // ── Matching ─────────────────────────────────────────────

    #[test]
    fn exact_matches_only_itself() {
        let p = EventPattern::parse("state:get").expect("pattern should parse for matching");
        assert!(p.matches("state:get"));
        assert!(!p.matches("state:set"));
        assert!(!p.matches("agent:get"));
    }

    #[test]
    fn namespace_wildcard_stays_in_namespace() {
        let p = EventPattern::parse("state:*").expect("pattern should parse for matching");
        assert!(p.matches("state:get"));
        assert!(p.matches("state:anything"));
        assert!(p.matches("state:entity:create"));
        assert!(!p.matches("other:anything"));
        assert!(!p.matches("state"));
    }

    #[test]
    fn any_matches_everything() {
        let p = EventPattern::Any;
        assert!(p.matches("state:get"));
        assert!(p.matches("agent:spawn"));
    }

    // ── Overlap ──────────────────────────────────────────────

    #[test]
    fn overlap_detection() {
        let exact = EventPattern::parse("state:get").expect("should parse");
        let ns = EventPattern::parse("state:*").expect("should parse");
        let other = EventPattern::parse("agent:*").expect("should parse");

        assert!(exact.overlaps(&ns));
        assert!(ns.overlaps(&exact));
        assert!(!exact.overlaps(&other));
        assert!(!ns.overlaps(&other));
        assert!(EventPattern::Any.overlaps(&exact));
    }

    // ── Display roundtrip ────────────────────────────────────

    #[test]
    fn display_roundtrip() {
        for &s in &["state:get", "state:*", "*"] {
            let p = EventPattern::parse(s).expect("pattern should parse for roundtrip");
            assert_eq!(p.to_string(), s, "display roundtrip failed for {s}");
        }
    }

    // ── Event name validation ────────────────────────────────

    #[test]
    fn valid_event_names() {
        assert!(validate_event_name("state:get").is_ok());
        assert!(validate_event_name("state:entity:create").is_ok());
    }

    #[test]
    fn invalid_event_names() {
        assert!(validate_event_name("").is_err());
        assert!(validate_event_name("state").is_err());
        assert!(validate_event_name(":get").is_err());
        assert!(validate_event_name("state:").is_err());
        assert!(validate_event_name("state:*").is_err());
    }

    // ── Serde ────────────────────────────────────────────────

    #[test]
    fn serde_roundtrip() {
        let p = EventPattern::parse("state:*").expect("pattern should parse for serde roundtrip");
        let json = serde_json::to_string(&p).expect("EventPattern should serialize");
        let restored: EventPattern =
            serde_json::from_str(&json).expect("EventPattern should deserialize");
        assert_eq!(p, restored);
    }
}
