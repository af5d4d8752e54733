//! VersionChain - Version history for a resource
//!
//! - Snapshots form a total order for each uri
//! - Each snapshot supersedes exactly one prior snapshot (if any)
//! - No forks or branches
//! - A tombstone, once appended, is the terminal entry
//!
//! Snapshots are stored in commit order and handed out newest first.
//! Chains are copy-on-write: appending produces a new chain that shares
//! every existing snapshot, so readers holding the old chain keep a
//! consistent point-in-time view.

use std::sync::Arc;

use super::{Snapshot, VersionToken};

/// The complete version history of a single resource.
#[derive(Clone, Debug)]
pub struct VersionChain {
    /// The resource uri this chain represents.
    uri: String,
    /// All snapshots of this resource, oldest first.
    versions: Vec<Arc<Snapshot>>,
}

impl VersionChain {
    /// Creates a new empty version chain for the given uri.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            versions: Vec::new(),
        }
    }

    /// Creates a chain holding a resource's first snapshot.
    pub fn start(first: impl Into<Arc<Snapshot>>) -> Self {
        let first = first.into();
        let mut chain = Self::new(first.uri());
        chain.push(first);
        chain
    }

    /// Returns the resource uri.
    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The current head: the newest snapshot.
    #[inline]
    pub fn head(&self) -> Option<&Arc<Snapshot>> {
        self.versions.last()
    }

    /// Iterates snapshots newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &Arc<Snapshot>> + '_ {
        self.versions.iter().rev()
    }

    /// Owner of the resource, fixed by its first snapshot.
    pub fn owner_id(&self) -> Option<&str> {
        self.versions.first().map(|s| s.owner_id())
    }

    /// True once the head is a tombstone.
    pub fn is_tombstoned(&self) -> bool {
        self.head().is_some_and(|s| s.is_deleted())
    }

    /// Finds the snapshot carrying `token`.
    pub fn find(&self, token: &VersionToken) -> Option<&Arc<Snapshot>> {
        self.versions.iter().find(|s| s.version_token() == token)
    }

    /// Generates a token not used by any snapshot in this chain.
    pub fn fresh_token(&self) -> VersionToken {
        loop {
            let token = VersionToken::generate();
            if self.find(&token).is_none() {
                return token;
            }
        }
    }

    /// Appends a snapshot in place.
    ///
    /// Structural only; precondition checks belong to the guard.
    pub fn push(&mut self, snapshot: impl Into<Arc<Snapshot>>) {
        let snapshot = snapshot.into();
        debug_assert_eq!(snapshot.uri(), self.uri);
        debug_assert!(!self.is_tombstoned(), "append after tombstone");
        self.versions.push(snapshot);
    }

    /// Returns a new chain with `snapshot` appended, leaving `self` intact.
    pub fn appended(&self, snapshot: impl Into<Arc<Snapshot>>) -> Self {
        let mut next = self.clone();
        next.push(snapshot);
        next
    }
}
