//! Daemon configuration.
//!
//! TOML-backed with full defaults, so an empty file (or none at all)
//! yields a working daemon. Layers merge overlay-wins for scalar
//! settings while file and directory lists accumulate.
//!
//! # Example TOML
//!
//! ```toml
//! [daemon]
//! handler_timeout_ms = 5000
//! pending_ttl_secs = 30
//! max_route_depth = 8
//!
//! [transformers]
//! files = ["transformers/orders.toml"]
//!
//! [profiles]
//! dirs = [".plexus/profiles"]
//! ```

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Core daemon settings.
    pub daemon: DaemonSection,

    /// Transformer rule files loaded at startup.
    pub transformers: TransformersSection,

    /// Capability profile directories.
    pub profiles: ProfilesSection,
}

/// Core daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonSection {
    /// Per-handler dispatch timeout in milliseconds.
    pub handler_timeout_ms: u64,

    /// Default TTL for pending async responses, in seconds.
    pub pending_ttl_secs: u64,

    /// Bound on transformer routing chains.
    pub max_route_depth: u32,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            handler_timeout_ms: 5000,
            pending_ttl_secs: 30,
            max_route_depth: 8,
        }
    }
}

/// Transformer rule files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransformersSection {
    /// Rule files loaded (and registered under their stem) at build.
    pub files: Vec<PathBuf>,
}

/// Capability profile directories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfilesSection {
    /// Search directories, highest priority first.
    pub dirs: Vec<PathBuf>,
}

impl DaemonConfig {
    /// Parses a config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Loads a config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if read or parse fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Merges an overlay into this config.
    ///
    /// Overlay scalars win; transformer files and profile dirs
    /// accumulate (overlay entries append after existing ones,
    /// duplicates dropped).
    pub fn merge(&mut self, overlay: &Self) {
        self.daemon = overlay.daemon.clone();
        for file in &overlay.transformers.files {
            if !self.transformers.files.contains(file) {
                self.transformers.files.push(file.clone());
            }
        }
        for dir in &overlay.profiles.dirs {
            if !self.profiles.dirs.contains(dir) {
                self.profiles.dirs.push(dir.clone());
            }
        }
    }

    /// Validates the config, collecting every issue.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing all failures, not
    /// just the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        if self.daemon.handler_timeout_ms == 0 {
            issues.push("daemon.handler_timeout_ms must be > 0".to_string());
        }
        if self.daemon.pending_ttl_secs == 0 {
            issues.push("daemon.pending_ttl_secs must be > 0".to_string());
        }
        if !(1..=32).contains(&self.daemon.max_route_depth) {
            issues.push(format!(
                "daemon.max_route_depth {} outside 1..=32",
                self.daemon.max_route_depth
            ));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { issues })
        }
    }

    /// Per-handler dispatch timeout.
    #[must_use]
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.daemon.handler_timeout_ms)
    }

    /// Default pending-response TTL.
    #[must_use]
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.daemon.pending_ttl_secs)
    }
}
