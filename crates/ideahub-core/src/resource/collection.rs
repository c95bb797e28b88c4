//! Paginated collection state.

use serde::Serialize;

use super::lifecycle::{Generation, Lifecycle, RequestSeq, RequestSequencer, Settlement};
use crate::pagination::{Page, Pagination};

/// A paginated, server-backed list as last fetched.
///
/// `items` always describes the page in `pagination` as of the last applied
/// fetch, plus any entities created since. A failed fetch leaves the
/// previous snapshot untouched and only moves the lifecycle to `Error`.
///
/// Fetches are sequenced against each other. Creates do not take part in
/// that ordering: a create never makes an earlier fetch stale.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceCollection<T> {
    items: Vec<T>,
    pagination: Pagination,
    lifecycle: Lifecycle,
    #[serde(skip)]
    sequencer: RequestSequencer,
    #[serde(skip)]
    fetch_pending: bool,
    #[serde(skip)]
    creates_pending: usize,
}

impl<T> Default for ResourceCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::default(),
            lifecycle: Lifecycle::Idle,
            sequencer: RequestSequencer::new(),
            fetch_pending: false,
            creates_pending: 0,
        }
    }
}

impl<T> ResourceCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
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

    /// Starts a fetch and marks the collection pending.
    pub fn begin(&mut self) -> RequestSeq {
        self.lifecycle = Lifecycle::Pending;
        self.fetch_pending = true;
        self.sequencer.issue()
    }

    /// Settles a fetch issued with `seq`.
    ///
    /// A successful page replaces items and pagination together unless a
    /// newer result is already in place. Only the latest issued fetch
    /// moves the lifecycle out of `Pending`, and only once no create is
    /// outstanding.
    pub fn settle(&mut self, seq: RequestSeq, outcome: Result<Page<T>, String>) -> Settlement {
        let latest = self.sequencer.is_latest(seq);
        match outcome {
            Ok(page) => {
                if !self.sequencer.try_apply(seq) {
                    return Settlement::Discarded;
                }
                self.pagination = page.pagination();
                self.items = page.items;
                if latest {
                    self.fetch_pending = false;
                    self.settle_lifecycle();
                }
                Settlement::Applied
            }
            Err(message) => {
                if !latest {
                    return Settlement::Discarded;
                }
                self.fetch_pending = false;
                self.lifecycle = Lifecycle::Error(message);
                Settlement::Applied
            }
        }
    }

    /// Starts a create and marks the collection pending.
    pub fn begin_create(&mut self) -> Generation {
        self.lifecycle = Lifecycle::Pending;
        self.creates_pending += 1;
        self.sequencer.generation()
    }

    /// Settles a successful create by putting the server-confirmed entity
    /// at the head of the list.
    ///
    /// If a fetch already delivered the entity (`is_same` matches), it is
    /// replaced in place instead. Creates begun before the last
    /// [`clear`](Self::clear) are dropped.
    pub fn settle_created<P>(&mut self, generation: Generation, item: T, is_same: P) -> Settlement
    where
        P: Fn(&T) -> bool,
    {
        if !self.sequencer.is_current(generation) {
            return Settlement::Discarded;
        }
        self.creates_pending = self.creates_pending.saturating_sub(1);
        match self.items.iter_mut().find(|existing| is_same(existing)) {
            Some(existing) => *existing = item,
            None => {
                self.items.insert(0, item);
                self.pagination.total_count += 1;
            }
        }
        self.settle_lifecycle();
        Settlement::Applied
    }

    /// Records a failed create. Items stay as they are; a fetch still in
    /// flight keeps the lifecycle pending.
    pub fn settle_create_failed(
        &mut self,
        generation: Generation,
        message: impl Into<String>,
    ) -> Settlement {
        if !self.sequencer.is_current(generation) {
            return Settlement::Discarded;
        }
        self.creates_pending = self.creates_pending.saturating_sub(1);
        if !self.fetch_pending {
            self.lifecycle = Lifecycle::Error(message.into());
        }
        Settlement::Applied
    }

    fn settle_lifecycle(&mut self) {
        if !self.fetch_pending && self.creates_pending == 0 {
            self.lifecycle = Lifecycle::Idle;
        }
    }

    /// Applies `update` to every cached item matching `predicate`.
    ///
    /// Returns the number of items touched.
    pub fn update_where<P, F>(&mut self, predicate: P, mut update: F) -> usize
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let mut touched = 0;
        for item in self.items.iter_mut().filter(|item| predicate(item)) {
            update(item);
            touched += 1;
        }
        touched
    }

    /// Drops every cached item matching `predicate`, keeping the total in step.
    pub fn remove_where<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        let removed = before - self.items.len();
        self.pagination.total_count = self.pagination.total_count.saturating_sub(removed as u64);
        removed
    }

    /// Forgets all items. Fetches and creates still in flight are dropped.
    pub fn clear(&mut self) {
        self.items.clear();
        self.pagination = Pagination::default();
        self.lifecycle = Lifecycle::Idle;
        self.fetch_pending = false;
        self.creates_pending = 0;
        self.sequencer.invalidate();
    }
}
