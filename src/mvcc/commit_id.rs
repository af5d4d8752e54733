//! CommitId - Store-wide commit sequence
//!
//! Every snapshot appended anywhere in the store receives a CommitId from a
//! single monotonically increasing sequence. CommitIds are independent of
//! wall-clock time and give scans a deterministic tie-break when two
//! snapshots carry the same `last_modified` timestamp.

use std::sync::atomic::{AtomicU64, Ordering};

/// A totally ordered, opaque commit identity.
///
/// No two committed snapshots share the same CommitId. Gaps are allowed:
/// an identity handed out for a write that later loses its compare-and-set
/// is simply never used.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CommitId(u64);

impl CommitId {
    /// Creates a new CommitId with the given value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    ///
    /// Used by the journal codec and for debugging.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Hands out commit identities.
///
/// Starts after the highest identity observed during journal replay so
/// identities stay unique across restarts.
#[derive(Debug, Default)]
pub struct CommitSequence {
    highest: AtomicU64,
}

impl CommitSequence {
    /// Create a sequence for a fresh store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next commit identity.
    pub fn next(&self) -> CommitId {
        CommitId::new(self.highest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Record an identity seen during replay.
    pub fn observe(&self, commit_id: CommitId) {
        self.highest.fetch_max(commit_id.value(), Ordering::SeqCst);
    }

    /// Highest identity handed out or observed so far.
    pub fn highest(&self) -> Option<CommitId> {
        match self.highest.load(Ordering::SeqCst) {
            0 => None,
            value => Some(CommitId::new(value)),
        }
    }
}
