//! Storage adapters for version chains
//!
//! The store reaches its backing state only through `StorageAdapter`,
//! whose two write primitives are atomic per uri:
//!
//! - `insert_if_absent` - creates a chain only if the uri was never
//!   allocated
//! - `compare_and_append` - appends only if the head still carries the
//!   expected token
//!
//! Each resource has its own writer lock, so writes to different uris never
//! wait on each other's locks; only the journal file itself orders their
//! appends. Chains are copy-on-write; readers clone an `Arc`, never wait on
//! an in-flight commit, and never observe a partially written snapshot.
//!
//! Two adapters are provided:
//! - `MemoryAdapter` - volatile, process-lifetime state
//! - `JournalAdapter` - `MemoryAdapter` plus an append-only,
//!   checksummed journal replayed on open

mod errors;
mod journal;
mod memory;
mod reader;
mod record;
mod writer;

use std::sync::Arc;

use crate::mvcc::{CommitId, Snapshot, VersionChain, VersionToken};

pub use errors::{AdapterError, AdapterResult};
pub use journal::JournalAdapter;
pub use memory::MemoryAdapter;
pub use reader::JournalReader;
pub use record::compute_checksum;
pub use writer::{JournalWriter, JOURNAL_FILE};

/// Outcome of `insert_if_absent`
#[derive(Debug)]
pub enum InsertOutcome {
    /// The uri was free; this is its first snapshot.
    Inserted(Arc<Snapshot>),
    /// The uri is already allocated (live or tombstoned).
    Exists(Arc<VersionChain>),
}

/// Outcome of `compare_and_append`
#[derive(Debug)]
pub enum AppendOutcome {
    /// The head matched; this is the new head.
    Appended(Arc<Snapshot>),
    /// The head moved on, or the uri vanished from the adapter. Carries the
    /// chain as seen under the lock, if any.
    Stale(Option<Arc<VersionChain>>),
}

/// Backing store for version chains.
pub trait StorageAdapter: Send + Sync {
    /// Allocates the next store-wide commit identity.
    fn next_commit_id(&self) -> CommitId;

    /// Point-in-time copy of a resource's chain.
    fn load(&self, uri: &str) -> AdapterResult<Option<Arc<VersionChain>>>;

    /// Atomically creates the chain for `snapshot.uri()` if absent.
    fn insert_if_absent(&self, snapshot: Snapshot) -> AdapterResult<InsertOutcome>;

    /// Atomically appends `snapshot` if the head is a live document
    /// carrying `expected`.
    fn compare_and_append(
        &self,
        expected: &VersionToken,
        snapshot: Snapshot,
    ) -> AdapterResult<AppendOutcome>;

    /// Current heads of every resource in `collection`, in creation order.
    /// Tombstoned heads are included; filtering is the caller's concern.
    fn collection_heads(&self, collection: &str) -> AdapterResult<Vec<Arc<Snapshot>>>;

    /// Makes every acknowledged write durable.
    fn flush(&self) -> AdapterResult<()>;
}
