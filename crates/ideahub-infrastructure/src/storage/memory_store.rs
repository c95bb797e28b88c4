//! In-process Persistent Session Store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ideahub_core::error::{HubError, Result};
use ideahub_core::session::KeyValueStore;

/// A [`KeyValueStore`] that lives as long as the process.
///
/// Used by tests and by runs that must not leave a session on disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| HubError::storage("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut stored = self.lock()?;
        for (key, value) in entries {
            stored.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut stored = self.lock()?;
        for key in keys {
            stored.remove(*key);
        }
        Ok(())
    }
}
