//! Session domain module.
//!
//! This module owns the authenticated identity of the client and its
//! persistence.
//!
//! # Module Structure
//!
//! - `model`: Session state, token pair and credentials
//! - `storage`: Persistent Session Store trait and key mapping
//! - `manager`: Session Manager (login, logout, restore, refresh, ...)
//!
//! # Usage
//!
//! ```ignore
//! use ideahub_core::session::{SessionManager, SessionStorage};
//!
//! let manager = SessionManager::new(gateway, SessionStorage::new(store));
//! manager.restore();
//! manager.login("alice", "secret").await?;
//! ```

mod manager;
mod model;
mod storage;

// Re-export public API
pub use manager::{
    CHANGE_PASSWORD_FALLBACK, LOGIN_FALLBACK, REFRESH_FALLBACK, REGISTER_FALLBACK, SessionManager,
};
pub use model::{Credentials, Session, TokenPair};
pub use storage::{
    ACCESS_TOKEN_KEY, KeyValueStore, PersistedSession, REFRESH_TOKEN_KEY, SESSION_KEYS,
    SessionStorage, USER_KEY,
};
