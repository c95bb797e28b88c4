use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ideahub_application::ResourceStore;
use ideahub_core::access::{AccessGate, Admission};
use ideahub_core::config::ClientConfig;
use ideahub_core::gateway::ResourceGateway;
use ideahub_core::session::{KeyValueStore, SessionManager, SessionStorage};
use ideahub_infrastructure::storage::session_file_for;
use ideahub_infrastructure::{ConfigStorage, JsonFileStore};
use ideahub_interaction::HttpResourceGateway;

/// Command-line overrides applied on top of file and environment config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub api_url: Option<String>,
}

/// Composition root: every long-lived component, wired once.
pub struct AppBootstrap {
    pub config: ClientConfig,
    pub session: Arc<SessionManager>,
    pub store: Arc<ResourceStore>,
    pub gate: AccessGate,
}

impl AppBootstrap {
    /// Loads configuration. Precedence: flags, environment, file, defaults.
    pub fn load_config(overrides: &ConfigOverrides) -> Result<ClientConfig> {
        let storage = match &overrides.config_file {
            Some(path) => ConfigStorage::new(path.clone()),
            None => ConfigStorage::default_location()?,
        };

        let mut config = storage
            .load_with_env()
            .with_context(|| format!("Failed to load {}", storage.path().display()))?;

        if let Some(url) = &overrides.api_url {
            config.api_base_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Builds the HTTP-backed application and restores the persisted session.
    pub fn initialize(config: ClientConfig) -> Result<Self> {
        let session_file = session_file_for(&config)?;
        tracing::debug!(session_file = %session_file.display(), "session file resolved");

        let gateway: Arc<dyn ResourceGateway> = Arc::new(
            HttpResourceGateway::from_config(&config).context("Failed to create HTTP gateway")?,
        );
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(session_file));

        Ok(Self::assemble(config, gateway, store))
    }

    /// Wires the components around an existing gateway and session store.
    pub fn assemble(
        config: ClientConfig,
        gateway: Arc<dyn ResourceGateway>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            gateway.clone(),
            SessionStorage::new(store),
        ));
        let restored = session.restore();
        tracing::debug!(authenticated = restored.is_authenticated, "session restored");

        let store = ResourceStore::new(gateway, session.clone());

        Self {
            config,
            session,
            store,
            gate: AccessGate::new(),
        }
    }

    /// Access Gate decision for `route` with the current session.
    pub fn admit(&self, route: &str) -> Admission {
        self.gate.check(&self.session.session(), route)
    }
}
