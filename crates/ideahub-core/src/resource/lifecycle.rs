//! Request lifecycle and sequencing.

use serde::{Deserialize, Serialize};

/// Progress of the most recently issued operation on a piece of state.
///
/// Success is `Idle` with populated data. A pending operation never carries
/// an error, and an error is cleared as soon as a new operation starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Idle,
    Pending,
    Error(String),
}

impl Lifecycle {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The message of the last failure, if the last operation failed.
    pub fn last_error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Issuance number of a request against one piece of state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RequestSeq(u64);

impl RequestSeq {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Epoch of a state container, taken when a mutation starts.
///
/// Clearing the container starts a new epoch; results carrying an older
/// one are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Generation(u64);

/// Outcome of settling a request against its state container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The result was written to the state.
    Applied,
    /// A newer request superseded this one; the result was dropped.
    Discarded,
}

impl Settlement {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Monotonic request counter for one state container.
///
/// `issued` is the newest request handed out. `applied` is the newest
/// request whose data reached the state. Data older than `applied` is
/// stale; only the `issued` request may settle the lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSequencer {
    issued: u64,
    applied: u64,
    generation: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestSeq {
        self.issued += 1;
        RequestSeq(self.issued)
    }

    /// Whether `seq` is the most recently issued request.
    pub fn is_latest(&self, seq: RequestSeq) -> bool {
        seq.0 == self.issued
    }

    /// Records `seq` as applied unless newer data is already in place.
    pub fn try_apply(&mut self, seq: RequestSeq) -> bool {
        if seq.0 > self.applied {
            self.applied = seq.0;
            true
        } else {
            false
        }
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.generation
    }

    /// Makes every outstanding request and generation stale.
    pub fn invalidate(&mut self) {
        self.issued += 1;
        self.applied = self.issued;
        self.generation += 1;
    }
}
