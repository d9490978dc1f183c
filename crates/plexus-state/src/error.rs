//! Error types for the state store.

use plexus_types::{EntityKey, ErrorCode};
use thiserror::Error;

/// Errors from state-store operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// The addressed entity does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityKey),

    /// An entity with this type and id already exists.
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityKey),

    /// The relationship target does not exist.
    #[error("relationship target not found: {0}")]
    TargetNotFound(EntityKey),

    /// Snapshot file I/O failed.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// The snapshot path.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot (de)serialization failed.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::EntityNotFound(_) => "STATE_ENTITY_NOT_FOUND",
            Self::DuplicateEntity(_) => "STATE_DUPLICATE_ENTITY",
            Self::TargetNotFound(_) => "STATE_TARGET_NOT_FOUND",
            Self::Io { .. } => "STATE_IO",
            Self::Serialization(_) => "STATE_SERIALIZATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        // I/O may be transient; everything else needs a caller change.
        matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_types::assert_error_codes;

    #[test]
    fn error_codes_follow_convention() {
        let key = EntityKey::new("agent", "a-1");
        assert_error_codes(
            &[
                StateError::EntityNotFound(key.clone()),
                StateError::DuplicateEntity(key.clone()),
                StateError::TargetNotFound(key),
            ],
            "STATE_",
        );
    }

    #[test]
    fn io_is_recoverable() {
        let err = StateError::Io {
            path: "/tmp/x.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.is_recoverable());
        assert!(!StateError::EntityNotFound(EntityKey::new("a", "b")).is_recoverable());
    }

    #[test]
    fn display_includes_key() {
        let err = StateError::EntityNotFound(EntityKey::new("agent", "a-1"));
        assert_eq!(err.to_string(), "entity not found: agent/a-1");
    }
}
