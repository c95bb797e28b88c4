//! Single-entity focus state.

use serde::Serialize;

use super::lifecycle::{Lifecycle, RequestSeq, RequestSequencer, Settlement};

/// The resource currently in focus (for example the idea being viewed).
///
/// `current` stays `None` until a fetch succeeds, and a failed fetch never
/// clears a previously loaded value.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDetail<T> {
    current: Option<T>,
    lifecycle: Lifecycle,
    #[serde(skip)]
    sequencer: RequestSequencer,
}

impl<T> Default for ResourceDetail<T> {
    fn default() -> Self {
        Self {
            current: None,
            lifecycle: Lifecycle::Idle,
            sequencer: RequestSequencer::new(),
        }
    }
}

impl<T> ResourceDetail<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn last_error(&self) -> Option<&str> {
        self.lifecycle.last_error()
    }

    pub fn is_pending(&self) -> bool {
        self.lifecycle.is_pending()
    }

    pub fn begin(&mut self) -> RequestSeq {
        self.lifecycle = Lifecycle::Pending;
        self.sequencer.issue()
    }

    /// Settles a fetch issued with `seq`, newest issuance wins.
    pub fn settle(&mut self, seq: RequestSeq, outcome: Result<T, String>) -> Settlement {
        let latest = self.sequencer.is_latest(seq);
        match outcome {
            Ok(value) => {
                if !self.sequencer.try_apply(seq) {
                    return Settlement::Discarded;
                }
                self.current = Some(value);
                if latest {
                    self.lifecycle = Lifecycle::Idle;
                }
                Settlement::Applied
            }
            Err(message) => {
                if !latest {
                    return Settlement::Discarded;
                }
                self.lifecycle = Lifecycle::Error(message);
                Settlement::Applied
            }
        }
    }

    /// Applies `update` to the loaded value when `predicate` holds for it.
    pub fn update_if<P, F>(&mut self, predicate: P, update: F) -> bool
    where
        P: FnOnce(&T) -> bool,
        F: FnOnce(&mut T),
    {
        match self.current.as_mut() {
            Some(value) if predicate(value) => {
                update(value);
                true
            }
            _ => false,
        }
    }

    /// Drops the loaded value when `predicate` holds for it.
    pub fn clear_if<P>(&mut self, predicate: P) -> bool
    where
        P: FnOnce(&T) -> bool,
    {
        if self.current.as_ref().is_some_and(predicate) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Forgets the loaded value. Responses still in flight are dropped.
    pub fn clear(&mut self) {
        self.current = None;
        self.lifecycle = Lifecycle::Idle;
        self.sequencer.invalidate();
    }
}
