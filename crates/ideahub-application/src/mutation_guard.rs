//! Per-key guard for in-flight mutations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use ideahub_core::error::{HubError, Result};

/// Set of mutation keys (`create`, `submit:{id}`, ...) currently in flight.
///
/// A second mutation with the same key is rejected with `Busy` until the
/// first one's [`MutationTicket`] is dropped.
#[derive(Debug, Clone, Default)]
pub struct MutationGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl MutationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`, failing with `Busy` if it is already claimed.
    pub fn acquire(&self, key: impl Into<String>) -> Result<MutationTicket> {
        let key = key.into();
        if !lock(&self.in_flight).insert(key.clone()) {
            tracing::debug!(operation = %key, "rejected duplicate mutation");
            return Err(HubError::busy(key));
        }

        Ok(MutationTicket {
            in_flight: self.in_flight.clone(),
            key,
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        lock(&self.in_flight).contains(key)
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct MutationTicket {
    in_flight: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for MutationTicket {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

// The set stays consistent even if a holder panicked.
fn lock(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_is_busy() {
        let guard = MutationGuard::new();
        let ticket = guard.acquire("submit:1").unwrap();

        let err = guard.acquire("submit:1").unwrap_err();
        assert!(err.is_busy());
        assert!(guard.acquire("submit:2").is_ok());

        drop(ticket);
        assert!(!guard.is_in_flight("submit:1"));
        assert!(guard.acquire("submit:1").is_ok());
    }
}
