//! Client configuration loading.
//!
//! Reads `config.toml` and layers environment overrides on top.

use std::path::{Path, PathBuf};

use ideahub_core::config::ClientConfig;
use ideahub_core::error::{HubError, Result};

use crate::paths::HubPaths;

pub const ENV_API_URL: &str = "IDEAHUB_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "IDEAHUB_TIMEOUT_SECS";
pub const ENV_SESSION_FILE: &str = "IDEAHUB_SESSION_FILE";
pub const ENV_LOG: &str = "IDEAHUB_LOG";

/// Loads [`ClientConfig`] from a TOML file.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Storage for the default `~/.config/ideahub/config.toml`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(HubPaths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file. A missing or empty file yields defaults.
    pub fn load(&self) -> Result<ClientConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(ClientConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ClientConfig::default());
        }

        toml::from_str(&content).map_err(|e| {
            HubError::config(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Reads the file and applies the process environment.
    pub fn load_with_env(&self) -> Result<ClientConfig> {
        let config = self.load()?;
        apply_env_overrides(config, |key| std::env::var(key).ok())
    }
}

/// Applies `IDEAHUB_*` overrides looked up through `lookup`.
pub fn apply_env_overrides<F>(mut config: ClientConfig, lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = lookup(ENV_API_URL) {
        config.api_base_url = url;
    }
    if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
        config.request_timeout_secs = secs.trim().parse().map_err(|_| {
            HubError::config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT_SECS, secs))
        })?;
    }
    if let Some(path) = lookup(ENV_SESSION_FILE) {
        config.session_file = Some(PathBuf::from(path));
    }
    if let Some(level) = lookup(ENV_LOG) {
        config.log_level = level;
    }

    Ok(config)
}

/// Where the session is persisted for `config`.
pub fn session_file_for(config: &ClientConfig) -> Result<PathBuf> {
    match &config.session_file {
        Some(path) => Ok(path.clone()),
        None => Ok(HubPaths::session_file()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().join("config.toml"));

        assert_eq!(storage.load().unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"https://hub.example.com/api/v1\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        let config = ConfigStorage::new(path).load().unwrap();

        assert_eq!(config.api_base_url, "https://hub.example.com/api/v1");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();

        let err = ConfigStorage::new(path).load().unwrap_err();
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn test_env_overrides_win() {
        let env = HashMap::from([
            (ENV_API_URL, "http://10.0.0.2:8000/api/v1"),
            (ENV_TIMEOUT_SECS, "12"),
            (ENV_SESSION_FILE, "/tmp/s.json"),
            (ENV_LOG, ""),
        ]);

        let config = apply_env_overrides(ClientConfig::default(), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.api_base_url, "http://10.0.0.2:8000/api/v1");
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_bad_timeout_override() {
        let result = apply_env_overrides(ClientConfig::default(), |key| {
            (key == ENV_TIMEOUT_SECS).then(|| "ten".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_session_file() {
        let config = ClientConfig {
            session_file: Some(PathBuf::from("/var/lib/ideahub/session.json")),
            ..ClientConfig::default()
        };
        assert_eq!(
            session_file_for(&config).unwrap(),
            PathBuf::from("/var/lib/ideahub/session.json")
        );
    }
}
