//! Capability profile definitions and loading.
//!
//! Profiles declare which events an agent may emit. A profile can
//! extend a single parent; denials always win over inherited grants.
//!
//! # TOML Format
//!
//! ```toml
//! [profile]
//! name = "order-worker"
//! description = "Processes order events"
//! extends = "base"
//!
//! [permissions]
//! events = ["order:*", "state:get"]
//! deny = ["order:cancel"]
//! ```

use crate::CapabilityError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Profile directory name within `.plexus/` or `~/.plexus/`.
pub const PROFILES_DIR: &str = "profiles";

/// Capability profile parsed from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileDef {
    /// Profile metadata.
    pub profile: ProfileMeta,

    /// Event permissions.
    pub permissions: Permissions,
}

/// Profile metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileMeta {
    /// Profile name (must match filename without extension).
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Single parent profile to inherit grants from.
    #[serde(default)]
    pub extends: Option<String>,
}

/// Grant and denial pattern lists.
///
/// Entries are event patterns: exact names (`state:get`), namespace
/// wildcards (`state:*`), or the bare `*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Permissions {
    /// Events the profile grants.
    pub events: Vec<String>,

    /// Events the profile denies. Denials override any grant,
    /// including grants inherited through `extends`.
    pub deny: Vec<String>,
}

impl ProfileDef {
    /// Parses a profile from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serializes to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Returns the profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Returns the parent profile name, if any.
    #[must_use]
    pub fn extends(&self) -> Option<&str> {
        self.profile.extends.as_deref()
    }
}

/// Lightweight profile entry for listing (no body loaded).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileEntry {
    /// Profile name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Source file path.
    pub path: PathBuf,
}

/// Discovers and loads profiles from filesystem directories.
///
/// Search order:
/// 1. Project profiles: `.plexus/profiles/`
/// 2. Global profiles: `~/.plexus/profiles/`
///
/// Project profiles take precedence over global profiles with the
/// same name.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    /// Search directories (in priority order).
    search_dirs: Vec<PathBuf>,
}

impl ProfileStore {
    /// Creates a new store with default search dirs.
    ///
    /// - Optionally: `.plexus/profiles/` (project, if project_root given)
    /// - `~/.plexus/profiles/` (global)
    #[must_use]
    pub fn new(project_root: Option<&Path>) -> Self {
        let mut dirs = Vec::new();

        if let Some(root) = project_root {
            dirs.push(root.join(".plexus").join(PROFILES_DIR));
        }

        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(".plexus").join(PROFILES_DIR));
        }

        Self { search_dirs: dirs }
    }

    /// Creates a store with explicit search directories.
    #[must_use]
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs: dirs }
    }

    /// Returns the search directories in priority order.
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Lists available profiles (name + description + path).
    ///
    /// Scans all search directories for `.toml` files.
    /// Deduplicates by file stem (first found wins = highest priority).
    pub fn list(&self) -> Vec<ProfileEntry> {
        let mut entries = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for (stem, path) in self.toml_files() {
            if !seen.insert(stem.clone()) {
                // A higher-priority dir already supplied this name.
                continue;
            }

            match Self::peek_meta(&path) {
                Ok(meta) => entries.push(ProfileEntry {
                    name: if meta.name.is_empty() { stem } else { meta.name },
                    description: meta.description,
                    path,
                }),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unparseable profile");
                }
            }
        }

        entries
    }

    /// Yields `(stem, path)` for every `.toml` file under the search
    /// dirs, in priority order. Unreadable dirs are skipped.
    fn toml_files(&self) -> Vec<(String, PathBuf)> {
        let mut files = Vec::new();
        for dir in &self.search_dirs {
            let Ok(read_dir) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    files.push((stem.to_string(), path));
                }
            }
        }
        files
    }

    /// Loads a profile by name.
    ///
    /// Searches all dirs in priority order for `{name}.toml`.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError` if the profile is not found or parse
    /// fails.
    pub fn load(&self, name: &str) -> Result<ProfileDef, CapabilityError> {
        let filename = format!("{name}.toml");

        for dir in &self.search_dirs {
            let path = dir.join(&filename);
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Err(CapabilityError::ProfileNotFound {
            name: name.to_string(),
            searched: self.search_dirs.clone(),
        })
    }

    /// Loads profile metadata only (lightweight, no permission lists).
    ///
    /// Used by [`list()`](Self::list) to avoid full deserialization.
    fn peek_meta(path: &Path) -> Result<ProfileMeta, CapabilityError> {
        #[derive(Deserialize)]
        struct MetaOnly {
            #[serde(default)]
            profile: ProfileMeta,
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| CapabilityError::read_file(path, e))?;
        let meta: MetaOnly =
            toml::from_str(&content).map_err(|e| CapabilityError::parse_toml(path, e))?;
        Ok(meta.profile)
    }

    /// Loads a profile from an explicit file path.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError` if read or parse fails.
    pub fn load_from_path(path: &Path) -> Result<ProfileDef, CapabilityError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CapabilityError::read_file(path, e))?;

        let mut def: ProfileDef =
            ProfileDef::from_toml(&content).map_err(|e| CapabilityError::parse_toml(path, e))?;

        // Default name from filename if not set in TOML
        if def.profile.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                def.profile.name = stem.to_string();
            }
        }

        debug!(
            name = %def.profile.name,
            path = %path.display(),
            grants = def.permissions.events.len(),
            denials = def.permissions.deny.len(),
            "Loaded profile"
        );

        Ok(def)
    }
}
