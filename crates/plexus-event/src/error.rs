//! Error types for the event system.

use plexus_types::ErrorCode;
use thiserror::Error;

/// Errors that can occur parsing patterns, names, or wire envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Invalid event pattern syntax.
    ///
    /// Wildcards must be a trailing segment (`ns:*` or bare `*`),
    /// never mid-pattern.
    #[error("invalid event pattern: {0}")]
    InvalidPattern(String),

    /// Invalid event name (must be `ns:verb` with non-empty segments,
    /// no wildcards).
    #[error("invalid event name: {0}")]
    InvalidName(String),

    /// Wire envelope could not be normalized to an internal event.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPattern(_) => "EVENT_INVALID_PATTERN",
            Self::InvalidName(_) => "EVENT_INVALID_NAME",
            Self::MalformedEnvelope(_) => "EVENT_MALFORMED_ENVELOPE",
        }
    }

    fn is_recoverable(&self) -> bool {
        // All are input errors: retrying the same input cannot help.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_types::assert_error_codes;

    #[test]
    fn error_codes_follow_convention() {
        assert_error_codes(
            &[
                EventError::InvalidPattern("x".into()),
                EventError::InvalidName("x".into()),
                EventError::MalformedEnvelope("x".into()),
            ],
            "EVENT_",
        );
    }

    #[test]
    fn display_messages() {
        let err = EventError::InvalidPattern("mid-pattern wildcard".into());
        assert_eq!(
            err.to_string(),
            "invalid event pattern: mid-pattern wildcard"
        );
    }

    #[test]
    fn none_recoverable() {
        assert!(!EventError::InvalidName("x".into()).is_recoverable());
    }
}
