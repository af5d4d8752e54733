//! In-memory storage adapter
//!
//! The resource table lock is held only to find, reserve or drop a slot.
//! Each slot has a commit mutex that serializes writers of that uri and is
//! held across the commit hook (the journal append), and a chain lock held
//! only to clone or swap the published `Arc`. Readers never touch the
//! commit mutex, so they never wait on journal I/O.
//!
//! Lock order: commit mutex, then resource table, then collection index,
//! then a slot's chain lock. No thread waits on a commit mutex while
//! holding any other lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;

use super::errors::{AdapterError, AdapterResult};
use super::{AppendOutcome, InsertOutcome, StorageAdapter};
use crate::mvcc::{CommitId, CommitSequence, Snapshot, VersionChain, VersionToken};

/// One resource: a writer mutex and its published chain.
#[derive(Debug)]
struct ResourceSlot {
    commit: Mutex<()>,
    /// `None` while the first snapshot is still committing
    chain: RwLock<Option<Arc<VersionChain>>>,
}

impl ResourceSlot {
    fn pending() -> Self {
        Self {
            commit: Mutex::new(()),
            chain: RwLock::new(None),
        }
    }

    fn published(chain: VersionChain) -> Self {
        Self {
            commit: Mutex::new(()),
            chain: RwLock::new(Some(Arc::new(chain))),
        }
    }

    fn current(&self, uri: &str) -> AdapterResult<Option<Arc<VersionChain>>> {
        Ok(read(&self.chain, uri)?.clone())
    }

    fn lock_commit(&self, uri: &str) -> AdapterResult<MutexGuard<'_, ()>> {
        self.commit.lock().map_err(|_| AdapterError::poisoned(uri))
    }
}

/// Volatile adapter; state lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    resources: RwLock<HashMap<String, Arc<ResourceSlot>>>,
    /// collection -> uris in publication order
    collections: RwLock<HashMap<String, Vec<String>>>,
    commits: CommitSequence,
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> AdapterResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| AdapterError::poisoned(what))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> AdapterResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| AdapterError::poisoned(what))
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated uris, tombstoned ones included.
    pub fn resource_count(&self) -> AdapterResult<usize> {
        let resources = read(&self.resources, "resource table")?;
        let mut count = 0;
        for (uri, slot) in resources.iter() {
            if slot.current(uri)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Highest commit identity handed out or replayed.
    pub fn highest_commit(&self) -> Option<CommitId> {
        self.commits.highest()
    }

    /// `insert_if_absent`, running `commit` after the uri is reserved and
    /// before the chain becomes visible. A failing `commit` releases the
    /// reservation, leaving the uri unallocated.
    ///
    /// A concurrent insert of the same uri waits for the reservation to
    /// resolve. Nothing else does.
    pub(crate) fn insert_if_absent_with<F>(
        &self,
        snapshot: Snapshot,
        commit: F,
    ) -> AdapterResult<InsertOutcome>
    where
        F: FnOnce(&Snapshot) -> AdapterResult<()>,
    {
        let uri = snapshot.uri().to_string();

        let slot = loop {
            let existing = {
                let mut resources = write(&self.resources, "resource table")?;
                match resources.get(&uri) {
                    Some(slot) => Arc::clone(slot),
                    None => {
                        let slot = Arc::new(ResourceSlot::pending());
                        resources.insert(uri.clone(), Arc::clone(&slot));
                        break slot;
                    }
                }
            };

            // Wait out an in-flight insert, then look again
            let writer = existing.lock_commit(&uri)?;
            if let Some(chain) = existing.current(&uri)? {
                return Ok(InsertOutcome::Exists(chain));
            }
            drop(writer);
            thread::yield_now();
        };

        let _writer = slot.lock_commit(&uri)?;

        if let Err(e) = commit(&snapshot) {
            let mut resources = write(&self.resources, "resource table")?;
            if resources.get(&uri).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                resources.remove(&uri);
            }
            return Err(e);
        }

        let collection = snapshot.collection().to_string();
        let head = Arc::new(snapshot);
        write(&self.collections, "collection index")?
            .entry(collection)
            .or_default()
            .push(uri.clone());
        *write(&slot.chain, &uri)? = Some(Arc::new(VersionChain::start(Arc::clone(&head))));

        Ok(InsertOutcome::Inserted(head))
    }

    /// `compare_and_append`, running `commit` after the head check passes
    /// and before the new head becomes visible. A failing `commit` leaves
    /// the chain unchanged.
    ///
    /// Readers keep seeing the previous chain until the new one is swapped
    /// in after `commit` returns.
    pub(crate) fn compare_and_append_with<F>(
        &self,
        expected: &VersionToken,
        snapshot: Snapshot,
        commit: F,
    ) -> AdapterResult<AppendOutcome>
    where
        F: FnOnce(&Snapshot) -> AdapterResult<()>,
    {
        let slot = match read(&self.resources, "resource table")?.get(snapshot.uri()) {
            Some(slot) => Arc::clone(slot),
            None => return Ok(AppendOutcome::Stale(None)),
        };

        let _writer = slot.lock_commit(snapshot.uri())?;
        let chain = match slot.current(snapshot.uri())? {
            Some(chain) => chain,
            None => return Ok(AppendOutcome::Stale(None)),
        };

        let head_matches = chain
            .head()
            .is_some_and(|head| !head.is_deleted() && head.version_token() == expected);
        if !head_matches {
            return Ok(AppendOutcome::Stale(Some(chain)));
        }
        debug_assert!(chain.find(snapshot.version_token()).is_none());

        commit(&snapshot)?;

        let head = Arc::new(snapshot);
        let next = Arc::new(chain.appended(Arc::clone(&head)));
        *write(&slot.chain, head.uri())? = Some(next);

        Ok(AppendOutcome::Appended(head))
    }

    /// Re-installs a snapshot read back from the journal.
    ///
    /// Returns a description of the problem if the snapshot cannot follow
    /// what was restored before it.
    pub(crate) fn restore(&self, snapshot: Snapshot) -> AdapterResult<Result<(), String>> {
        self.commits.observe(snapshot.commit_id());

        let mut resources = write(&self.resources, "resource table")?;

        if let Some(slot) = resources.get(snapshot.uri()) {
            let mut published = write(&slot.chain, snapshot.uri())?;
            let chain = match published.as_ref() {
                Some(chain) => chain,
                None => return Ok(Err(format!("{} was never published", snapshot.uri()))),
            };

            if chain.is_tombstoned() {
                return Ok(Err(format!("{} appended after its tombstone", snapshot.uri())));
            }
            if chain.owner_id() != Some(snapshot.owner_id()) {
                return Ok(Err(format!("{} changed owner", snapshot.uri())));
            }
            if chain.find(snapshot.version_token()).is_some() {
                return Ok(Err(format!(
                    "{} repeats version token {}",
                    snapshot.uri(),
                    snapshot.version_token()
                )));
            }

            let next = Arc::new(chain.appended(snapshot));
            *published = Some(next);
            return Ok(Ok(()));
        }

        let uri = snapshot.uri().to_string();
        write(&self.collections, "collection index")?
            .entry(snapshot.collection().to_string())
            .or_default()
            .push(uri.clone());
        resources.insert(
            uri,
            Arc::new(ResourceSlot::published(VersionChain::start(snapshot))),
        );

        Ok(Ok(()))
    }
}

impl StorageAdapter for MemoryAdapter {
    fn next_commit_id(&self) -> CommitId {
        self.commits.next()
    }

    fn load(&self, uri: &str) -> AdapterResult<Option<Arc<VersionChain>>> {
        let slot = match read(&self.resources, "resource table")?.get(uri) {
            Some(slot) => Arc::clone(slot),
            None => return Ok(None),
        };
        slot.current(uri)
    }

    fn insert_if_absent(&self, snapshot: Snapshot) -> AdapterResult<InsertOutcome> {
        self.insert_if_absent_with(snapshot, |_| Ok(()))
    }

    fn compare_and_append(
        &self,
        expected: &VersionToken,
        snapshot: Snapshot,
    ) -> AdapterResult<AppendOutcome> {
        self.compare_and_append_with(expected, snapshot, |_| Ok(()))
    }

    fn collection_heads(&self, collection: &str) -> AdapterResult<Vec<Arc<Snapshot>>> {
        let resources = read(&self.resources, "resource table")?;
        let collections = read(&self.collections, "collection index")?;

        let uris = match collections.get(collection) {
            Some(uris) => uris,
            None => return Ok(Vec::new()),
        };

        let mut heads = Vec::with_capacity(uris.len());
        for uri in uris {
            let chain = match resources.get(uri) {
                Some(slot) => slot.current(uri)?,
                None => None,
            };
            if let Some(head) = chain.as_ref().and_then(|c| c.head()) {
                heads.push(Arc::clone(head));
            }
        }
        Ok(heads)
    }

    fn flush(&self) -> AdapterResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::mpsc;

    fn first(adapter: &MemoryAdapter, uri: &str, token: &str) -> Snapshot {
        Snapshot::initial(
            uri,
            "items",
            "alice",
            b"{}".to_vec(),
            VersionToken::new(token),
            adapter.next_commit_id(),
            Utc::now(),
        )
    }

    #[test]
    fn test_insert_if_absent() {
        let adapter = MemoryAdapter::new();

        let inserted = adapter.insert_if_absent(first(&adapter, "/items/a", "t1")).unwrap();
        assert!(matches!(inserted, InsertOutcome::Inserted(_)));

        let again = adapter.insert_if_absent(first(&adapter, "/items/a", "t9")).unwrap();
        match again {
            InsertOutcome::Exists(chain) => {
                assert_eq!(chain.len(), 1);
                assert_eq!(chain.head().unwrap().version_token().as_str(), "t1");
            }
            other => panic!("expected Exists, got {:?}", other),
        }
        assert_eq!(adapter.resource_count().unwrap(), 1);
    }

    #[test]
    fn test_compare_and_append() {
        let adapter = MemoryAdapter::new();
        let snap = first(&adapter, "/items/a", "t1");
        let next = snap.successor(b"[]".to_vec(), VersionToken::new("t2"), adapter.next_commit_id(), Utc::now());
        adapter.insert_if_absent(snap).unwrap();

        let stale = VersionToken::new("t0");
        let outcome = adapter.compare_and_append(&stale, next.clone()).unwrap();
        assert!(matches!(outcome, AppendOutcome::Stale(Some(_))));

        let current = VersionToken::new("t1");
        let outcome = adapter.compare_and_append(&current, next).unwrap();
        assert!(matches!(outcome, AppendOutcome::Appended(_)));

        let chain = adapter.load("/items/a").unwrap().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.head().unwrap().version_token().as_str(), "t2");
    }

    #[test]
    fn test_append_to_absent_uri_is_stale() {
        let adapter = MemoryAdapter::new();
        let snap = first(&adapter, "/items/ghost", "t1");
        let outcome = adapter.compare_and_append(&VersionToken::new("t1"), snap).unwrap();
        assert!(matches!(outcome, AppendOutcome::Stale(None)));
    }

    #[test]
    fn test_tombstone_blocks_append() {
        let adapter = MemoryAdapter::new();
        let snap = first(&adapter, "/items/a", "t1");
        let tomb = snap.tombstone(VersionToken::new("t2"), adapter.next_commit_id(), Utc::now());
        let after = tomb.successor(b"{}".to_vec(), VersionToken::new("t3"), adapter.next_commit_id(), Utc::now());
        adapter.insert_if_absent(snap).unwrap();
        adapter.compare_and_append(&VersionToken::new("t1"), tomb).unwrap();

        let outcome = adapter.compare_and_append(&VersionToken::new("t2"), after).unwrap();
        assert!(matches!(outcome, AppendOutcome::Stale(Some(_))));
    }

    #[test]
    fn test_failed_commit_leaves_state_unchanged() {
        let adapter = MemoryAdapter::new();
        let result = adapter.insert_if_absent_with(first(&adapter, "/items/a", "t1"), |_| {
            Err(AdapterError::Serialization("boom".into()))
        });
        assert!(result.is_err());
        assert!(adapter.load("/items/a").unwrap().is_none());
        assert!(adapter.collection_heads("items").unwrap().is_empty());
    }

    #[test]
    fn test_failed_append_commit_keeps_head() {
        let adapter = MemoryAdapter::new();
        let snap = first(&adapter, "/items/a", "t1");
        let next = snap.successor(b"[]".to_vec(), VersionToken::new("t2"), adapter.next_commit_id(), Utc::now());
        adapter.insert_if_absent(snap).unwrap();

        let result = adapter.compare_and_append_with(&VersionToken::new("t1"), next.clone(), |_| {
            Err(AdapterError::Serialization("boom".into()))
        });
        assert!(result.is_err());

        let chain = adapter.load("/items/a").unwrap().unwrap();
        assert_eq!(chain.len(), 1);
        let retried = adapter.compare_and_append(&VersionToken::new("t1"), next).unwrap();
        assert!(matches!(retried, AppendOutcome::Appended(_)));
    }

    /// While one insert is committing, other uris and readers proceed.
    #[test]
    fn test_insert_commit_does_not_block_others() {
        let adapter = MemoryAdapter::new();
        adapter.insert_if_absent(first(&adapter, "/items/a", "a1")).unwrap();
        let pending = first(&adapter, "/items/b", "b1");
        let other = first(&adapter, "/items/c", "c1");

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|s| {
            let committing = s.spawn(|| {
                adapter.insert_if_absent_with(pending, move |_| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
            });
            started_rx.recv().unwrap();

            assert!(adapter.load("/items/a").unwrap().is_some());
            assert!(adapter.load("/items/b").unwrap().is_none());
            assert_eq!(adapter.collection_heads("items").unwrap().len(), 1);
            assert_eq!(adapter.resource_count().unwrap(), 1);
            let inserted = adapter.insert_if_absent(other).unwrap();
            assert!(matches!(inserted, InsertOutcome::Inserted(_)));

            release_tx.send(()).unwrap();
            let outcome = committing.join().unwrap().unwrap();
            assert!(matches!(outcome, InsertOutcome::Inserted(_)));
        });

        assert!(adapter.load("/items/b").unwrap().is_some());
        assert_eq!(adapter.resource_count().unwrap(), 3);
    }

    /// Readers see the previous head until an append's commit finishes.
    #[test]
    fn test_append_commit_does_not_block_readers() {
        let adapter = MemoryAdapter::new();
        let snap = first(&adapter, "/items/a", "t1");
        let next = snap.successor(b"[]".to_vec(), VersionToken::new("t2"), adapter.next_commit_id(), Utc::now());
        adapter.insert_if_absent(snap).unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let expected = VersionToken::new("t1");

        thread::scope(|s| {
            let committing = s.spawn(|| {
                adapter.compare_and_append_with(&expected, next, move |_| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
            });
            started_rx.recv().unwrap();

            let chain = adapter.load("/items/a").unwrap().unwrap();
            assert_eq!(chain.head().unwrap().version_token().as_str(), "t1");
            assert_eq!(adapter.collection_heads("items").unwrap().len(), 1);

            release_tx.send(()).unwrap();
            let outcome = committing.join().unwrap().unwrap();
            assert!(matches!(outcome, AppendOutcome::Appended(_)));
        });

        let chain = adapter.load("/items/a").unwrap().unwrap();
        assert_eq!(chain.head().unwrap().version_token().as_str(), "t2");
    }

    /// A second insert of a uri whose first insert failed takes the uri.
    #[test]
    fn test_insert_after_failed_reservation() {
        let adapter = MemoryAdapter::new();
        let _ = adapter.insert_if_absent_with(first(&adapter, "/items/a", "t1"), |_| {
            Err(AdapterError::Serialization("boom".into()))
        });

        let outcome = adapter.insert_if_absent(first(&adapter, "/items/a", "t2")).unwrap();
        match outcome {
            InsertOutcome::Inserted(head) => assert_eq!(head.version_token().as_str(), "t2"),
            other => panic!("expected Inserted, got {:?}", other),
        }
    }

    #[test]
    fn test_collection_heads_in_creation_order() {
        let adapter = MemoryAdapter::new();
        for id in ["c", "a", "b"] {
            adapter
                .insert_if_absent(first(&adapter, &format!("/items/{}", id), id))
                .unwrap();
        }
        let heads = adapter.collection_heads("items").unwrap();
        let uris: Vec<_> = heads.iter().map(|h| h.uri()).collect();
        assert_eq!(uris, vec!["/items/c", "/items/a", "/items/b"]);
        assert!(adapter.collection_heads("other").unwrap().is_empty());
    }

    #[test]
    fn test_restore_advances_commit_sequence() {
        let adapter = MemoryAdapter::new();
        let snap = Snapshot::initial(
            "/items/a",
            "items",
            "alice",
            b"{}".to_vec(),
            VersionToken::new("t1"),
            CommitId::new(41),
            Utc::now(),
        );
        adapter.restore(snap).unwrap().unwrap();
        assert_eq!(adapter.highest_commit(), Some(CommitId::new(41)));
        assert_eq!(adapter.next_commit_id(), CommitId::new(42));
    }

    #[test]
    fn test_restore_rejects_append_after_tombstone() {
        let adapter = MemoryAdapter::new();
        let snap = first(&adapter, "/items/a", "t1");
        let tomb = snap.tombstone(VersionToken::new("t2"), CommitId::new(2), Utc::now());
        let after = tomb.successor(b"{}".to_vec(), VersionToken::new("t3"), CommitId::new(3), Utc::now());

        adapter.restore(snap).unwrap().unwrap();
        adapter.restore(tomb).unwrap().unwrap();
        assert!(adapter.restore(after).unwrap().is_err());
    }
}
