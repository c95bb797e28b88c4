//! Persistent Session Store.
//!
//! Durable key/value storage for the session survives process restarts.
//! The session is stored under three keys that are always written and
//! erased together.

use std::sync::Arc;

use crate::error::Result;
use crate::session::model::TokenPair;
use crate::user::UserIdentity;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

/// Every key the session occupies.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Synchronous string key/value storage.
///
/// Implementations must apply `set_many` and `remove_many` as one write so
/// a crash never leaves a partial session behind.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// - `Ok(Some(value))`: key present
    /// - `Ok(None)`: key absent
    /// - `Err(_)`: the backend could not be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores all entries in one write.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<()>;

    /// Removes all keys in one write. Absent keys are ignored.
    fn remove_many(&self, keys: &[&str]) -> Result<()>;
}

/// A session as it is kept in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub user: UserIdentity,
    pub tokens: TokenPair,
}

/// Maps [`PersistedSession`] onto the session keys of a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads the persisted session.
    ///
    /// Returns `Ok(None)` when any of the three keys is missing or blank.
    /// A `user` value that is not a valid identity is an error.
    pub fn load(&self) -> Result<Option<PersistedSession>> {
        let access = self.non_blank(ACCESS_TOKEN_KEY)?;
        let refresh = self.non_blank(REFRESH_TOKEN_KEY)?;
        let user = self.non_blank(USER_KEY)?;

        let (Some(access), Some(refresh), Some(user)) = (access, refresh, user) else {
            return Ok(None);
        };

        let user: UserIdentity = serde_json::from_str(&user)?;
        Ok(Some(PersistedSession {
            user,
            tokens: TokenPair::new(access, refresh),
        }))
    }

    /// Writes all three keys.
    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        let user = serde_json::to_string(&session.user)?;
        self.store.set_many(&[
            (ACCESS_TOKEN_KEY, session.tokens.access.clone()),
            (REFRESH_TOKEN_KEY, session.tokens.refresh.clone()),
            (USER_KEY, user),
        ])
    }

    pub fn save_tokens(&self, tokens: &TokenPair) -> Result<()> {
        self.store.set_many(&[
            (ACCESS_TOKEN_KEY, tokens.access.clone()),
            (REFRESH_TOKEN_KEY, tokens.refresh.clone()),
        ])
    }

    pub fn save_user(&self, user: &UserIdentity) -> Result<()> {
        let user = serde_json::to_string(user)?;
        self.store.set_many(&[(USER_KEY, user)])
    }

    /// Erases all three keys.
    pub fn clear(&self) -> Result<()> {
        self.store.remove_many(&SESSION_KEYS)
    }

    fn non_blank(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .filter(|value| !value.trim().is_empty()))
    }
}
