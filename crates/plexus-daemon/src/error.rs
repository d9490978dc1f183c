//! Daemon error types.
//!
//! Each subsystem keeps its own `thiserror` enum; [`DaemonError`]
//! wraps them at the daemon surface. Registration errors return
//! synchronously; dispatch errors are captured per-handler inside
//! [`DispatchOutcome`](crate::DispatchOutcome) so one failing handler
//! never aborts its siblings.

use crate::transform::RuleValidationError;
use plexus_types::{CorrelationId, ErrorCode};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from handler registration and dispatch.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Registration pattern failed to parse.
    #[error(transparent)]
    InvalidPattern(#[from] plexus_event::EventError),

    /// A handler returned a failure.
    #[error("handler '{handler}' failed: {message}")]
    HandlerFailed {
        /// Handler name.
        handler: String,
        /// Failure description.
        message: String,
    },

    /// A handler exceeded the per-handler timeout and was aborted.
    /// Only the slow handler is affected.
    #[error("handler '{handler}' timed out after {timeout_ms}ms")]
    HandlerTimeout {
        /// Handler name.
        handler: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
}

impl ErrorCode for RouterError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPattern(_) => "ROUTER_INVALID_PATTERN",
            Self::HandlerFailed { .. } => "ROUTER_HANDLER_FAILED",
            Self::HandlerTimeout { .. } => "ROUTER_HANDLER_TIMEOUT",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A timed-out handler can be retried on the next emit.
        matches!(self, Self::HandlerTimeout { .. })
    }
}

/// Errors from transformer registration, matching, and mapping.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Rule failed structural validation.
    #[error(transparent)]
    InvalidRule(#[from] RuleValidationError),

    /// A rule's source pattern failed to parse.
    #[error(transparent)]
    Pattern(#[from] plexus_event::EventError),

    /// A rule with the same source and priority already exists.
    #[error("duplicate rule: source '{pattern}' at priority {priority} is already registered")]
    DuplicateRule {
        /// Source pattern of the refused rule.
        pattern: String,
        /// Conflicting priority.
        priority: i64,
    },

    /// Registering the rule would close a routing cycle.
    #[error("circular routing: {chain:?}")]
    CircularRouting {
        /// Event names along the detected cycle.
        chain: Vec<String>,
    },

    /// A mapping template references a path absent from the event.
    #[error("unresolved template variable '{{{{{variable}}}}}' in '{template}'")]
    TemplateUnresolved {
        /// The full template string.
        template: String,
        /// The dotted path that did not resolve.
        variable: String,
    },

    /// A condition expression failed to parse or uses a forbidden
    /// construct.
    #[error("condition '{expr}' rejected: {message}")]
    Condition {
        /// The condition expression.
        expr: String,
        /// What was wrong with it.
        message: String,
    },

    /// A pending response was not resolved before its TTL elapsed.
    #[error("pending response {correlation_id} timed out")]
    PendingTimeout {
        /// Correlation id of the abandoned chain.
        correlation_id: CorrelationId,
    },

    /// Failed to read a rule file.
    #[error("failed to read rule file {path}: {source}")]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a rule file as TOML.
    #[error("failed to parse rule file {path}: {source}")]
    ParseToml {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        source: Box<toml::de::Error>,
    },
}

impl ErrorCode for TransformError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRule(_) => "TRANSFORM_INVALID_RULE",
            Self::Pattern(_) => "TRANSFORM_INVALID_PATTERN",
            Self::DuplicateRule { .. } => "TRANSFORM_DUPLICATE_RULE",
            Self::CircularRouting { .. } => "TRANSFORM_CIRCULAR_ROUTING",
            Self::TemplateUnresolved { .. } => "TRANSFORM_TEMPLATE_UNRESOLVED",
            Self::Condition { .. } => "TRANSFORM_CONDITION_EVAL",
            Self::PendingTimeout { .. } => "TRANSFORM_PENDING_TIMEOUT",
            Self::ReadFile { .. } => "TRANSFORM_READ_FILE",
            Self::ParseToml { .. } => "TRANSFORM_PARSE_TOML",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Waiters can retry after a pending-response timeout.
        matches!(self, Self::PendingTimeout { .. })
    }
}

/// Errors from daemon configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the config file as TOML.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        source: Box<toml::de::Error>,
    },

    /// Config values failed validation. All issues are collected,
    /// not just the first.
    #[error("invalid configuration: {}", issues.join("; "))]
    Invalid {
        /// Every validation failure found.
        issues: Vec<String>,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::Invalid { .. } => "CONFIG_INVALID",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Top-level daemon error.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Router failure.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// Transformer failure.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Capability failure.
    #[error(transparent)]
    Capability(#[from] plexus_capability::CapabilityError),

    /// State store failure.
    #[error(transparent)]
    State(#[from] plexus_state::StateError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Wire intake failure.
    #[error(transparent)]
    Event(#[from] plexus_event::EventError),
}

impl ErrorCode for DaemonError {
    fn code(&self) -> &'static str {
        match self {
            Self::Router(e) => e.code(),
            Self::Transform(e) => e.code(),
            Self::Capability(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::Event(e) => e.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Router(e) => e.is_recoverable(),
            Self::Transform(e) => e.is_recoverable(),
            Self::Capability(e) => e.is_recoverable(),
            Self::State(e) => e.is_recoverable(),
            Self::Config(e) => e.is_recoverable(),
            Self::Event(e) => e.is_recoverable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_types::assert_error_codes;

    #[test]
    fn router_codes_use_router_prefix() {
        let errors = [
            RouterError::HandlerFailed {
                handler: "h".into(),
                message: "boom".into(),
            },
            RouterError::HandlerTimeout {
                handler: "h".into(),
                timeout_ms: 100,
            },
        ];
        assert_error_codes(&errors, "ROUTER_");
    }

    #[test]
    fn transform_codes_use_transform_prefix() {
        let errors = [
            TransformError::Pattern(plexus_event::EventError::InvalidPattern("a:*:b".into())),
            TransformError::DuplicateRule {
                pattern: "a:b".into(),
                priority: 1000,
            },
            TransformError::CircularRouting {
                chain: vec!["a:b".into(), "b:c".into()],
            },
            TransformError::TemplateUnresolved {
                template: "{{data.x}}".into(),
                variable: "data.x".into(),
            },
            TransformError::Condition {
                expr: "data.x ==".into(),
                message: "truncated".into(),
            },
            TransformError::PendingTimeout {
                correlation_id: CorrelationId::new(),
            },
        ];
        assert_error_codes(&errors, "TRANSFORM_");
    }

    #[test]
    fn timeout_variants_are_recoverable() {
        assert!(RouterError::HandlerTimeout {
            handler: "h".into(),
            timeout_ms: 100,
        }
        .is_recoverable());
        assert!(TransformError::PendingTimeout {
            correlation_id: CorrelationId::new(),
        }
        .is_recoverable());
        assert!(!TransformError::DuplicateRule {
            pattern: "a:b".into(),
            priority: 1,
        }
        .is_recoverable());
    }

    #[test]
    fn daemon_error_delegates_code() {
        let err: DaemonError = RouterError::HandlerTimeout {
            handler: "h".into(),
            timeout_ms: 100,
        }
        .into();
        assert_eq!(err.code(), "ROUTER_HANDLER_TIMEOUT");
        assert!(err.is_recoverable());
    }
}
