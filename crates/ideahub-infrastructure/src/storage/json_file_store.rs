//! File-backed Persistent Session Store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ideahub_core::error::Result;
use ideahub_core::session::KeyValueStore;

use super::atomic_json::AtomicJsonFile;

type Entries = BTreeMap<String, String>;

/// A [`KeyValueStore`] kept as one JSON object on disk.
///
/// Each `set_many`/`remove_many` is one locked read-modify-write, so the
/// file always holds either the old or the new set of keys.
pub struct JsonFileStore {
    file: AtomicJsonFile<Entries>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn entries(&self) -> Result<Entries> {
        Ok(self.file.load()?.unwrap_or_default())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        self.file.update(Entries::new(), |stored| {
            for (key, value) in entries {
                stored.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        if !self.file.path().exists() {
            return Ok(());
        }

        self.file.update(Entries::new(), |stored| {
            for key in keys {
                stored.remove(*key);
            }
        })
    }
}
