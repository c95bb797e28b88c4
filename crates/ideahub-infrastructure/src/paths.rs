//! Path resolution for IdeaHub client files.
//!
//! Everything lives under one per-user config directory resolved with
//! `dirs`, so Linux, macOS and Windows each get their native location.

use std::path::PathBuf;

const APP_DIR: &str = "ideahub";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find the user config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for ideahub_core::HubError {
    fn from(e: PathError) -> Self {
        ideahub_core::HubError::config(e.to_string())
    }
}

/// Unified path management for the IdeaHub client.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/ideahub/
/// ├── config.toml     # Client configuration
/// └── session.json    # Persisted session (tokens + identity, mode 0600)
/// ```
pub struct HubPaths;

impl HubPaths {
    /// Returns the IdeaHub configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Default location of the persisted session.
    pub fn session_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(SESSION_FILE))
    }
}
