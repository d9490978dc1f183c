//! Capability error types.

use plexus_types::{AgentId, ErrorCode};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from profile loading and permission resolution.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Profile not found in any search directory or in the registry.
    #[error("profile '{name}' not found (searched: {searched:?})")]
    ProfileNotFound {
        /// Requested profile name.
        name: String,
        /// Directories searched, in priority order. Empty when the
        /// lookup was against the in-memory registry.
        searched: Vec<PathBuf>,
    },

    /// An `extends` chain loops back on itself.
    #[error("circular inheritance: profile '{name}' reached via {chain:?}")]
    CircularInheritance {
        /// Profile where the loop closed.
        name: String,
        /// Chain walked up to the loop.
        chain: Vec<String>,
    },

    /// A grant or denial entry is not a valid event pattern.
    #[error("profile '{profile}': invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Profile declaring the pattern.
        profile: String,
        /// The offending entry.
        pattern: String,
        /// Underlying parse error.
        source: plexus_event::EventError,
    },

    /// Agent attempted an event its bound profile does not allow.
    #[error("agent {agent} denied event '{event}' by profile '{profile}'")]
    PermissionDenied {
        /// The denied agent.
        agent: AgentId,
        /// Event name that was refused.
        event: String,
        /// Profile the agent is bound to.
        profile: String,
    },

    /// Agent has no bound capability snapshot.
    #[error("agent {agent} has no bound capabilities")]
    NotBound {
        /// The unbound agent.
        agent: AgentId,
    },

    /// Agent already holds a snapshot. Bindings are immutable for the
    /// agent's lifetime; a new binding requires a new agent identity.
    #[error("agent {agent} is already bound to profile '{profile}'")]
    AlreadyBound {
        /// The already-bound agent.
        agent: AgentId,
        /// Profile it is bound to.
        profile: String,
    },

    /// Failed to read a profile file.
    #[error("failed to read profile file {path}: {source}")]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a profile file as TOML.
    #[error("failed to parse profile file {path}: {source}")]
    ParseToml {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        source: Box<toml::de::Error>,
    },
}

impl CapabilityError {
    pub(crate) fn read_file(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse_toml(path: &std::path::Path, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }
}

impl ErrorCode for CapabilityError {
    fn code(&self) -> &'static str {
        match self {
            Self::ProfileNotFound { .. } => "CAP_PROFILE_NOT_FOUND",
            Self::CircularInheritance { .. } => "CAP_CIRCULAR_INHERITANCE",
            Self::InvalidPattern { .. } => "CAP_INVALID_PATTERN",
            Self::PermissionDenied { .. } => "CAP_PERMISSION_DENIED",
            Self::NotBound { .. } => "CAP_NOT_BOUND",
            Self::AlreadyBound { .. } => "CAP_ALREADY_BOUND",
            Self::ReadFile { .. } => "CAP_READ_FILE",
            Self::ParseToml { .. } => "CAP_PARSE_TOML",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Profile and permission failures require operator action.
        false
    }
}
