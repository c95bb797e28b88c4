//! Storage backends.

pub mod atomic_json;
pub mod config_storage;
pub mod json_file_store;
pub mod memory_store;

pub use atomic_json::AtomicJsonFile;
pub use config_storage::{ConfigStorage, apply_env_overrides, session_file_for};
pub use json_file_store::JsonFileStore;
pub use memory_store::MemoryStore;
