//! Infrastructure layer of the IdeaHub client.
//!
//! Filesystem-backed implementations of the core storage traits and the
//! configuration loader.

pub mod paths;
pub mod storage;

pub use paths::{HubPaths, PathError};
pub use storage::{ConfigStorage, JsonFileStore, MemoryStore};
