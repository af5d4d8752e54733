//! Durable adapter: in-memory chains backed by an append-only journal
//!
//! On open the journal is replayed record by record into a fresh
//! `MemoryAdapter`. Any corruption halts the open; nothing is skipped or
//! repaired. After replay every committed write is appended to the journal
//! while the uri's commit mutex is still held, so journal order matches commit
//! order for each uri.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::errors::{AdapterError, AdapterResult};
use super::memory::MemoryAdapter;
use super::reader::JournalReader;
use super::writer::{JournalWriter, JOURNAL_FILE};
use super::{AppendOutcome, InsertOutcome, StorageAdapter};
use crate::mvcc::{CommitId, Snapshot, VersionChain, VersionToken};

/// `MemoryAdapter` plus a write-ahead journal
pub struct JournalAdapter {
    memory: MemoryAdapter,
    writer: Mutex<JournalWriter>,
    replayed: usize,
}

impl JournalAdapter {
    /// Opens `<data_dir>/journal.log`, replaying it if present.
    pub fn open(data_dir: &Path, fsync: bool) -> AdapterResult<Self> {
        let memory = MemoryAdapter::new();
        let path = data_dir.join(JOURNAL_FILE);
        let mut replayed = 0;

        if path.exists() {
            let mut reader = JournalReader::open(&path)?;
            loop {
                let offset = reader.current_offset();
                match reader.read_next()? {
                    Some(snapshot) => {
                        memory
                            .restore(snapshot)?
                            .map_err(|details| AdapterError::corruption(offset, details))?;
                        replayed += 1;
                    }
                    None => break,
                }
            }
        }

        let writer = JournalWriter::open(data_dir, fsync)?;

        Ok(Self {
            memory,
            writer: Mutex::new(writer),
            replayed,
        })
    }

    /// Number of records replayed on open.
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    /// Number of allocated uris.
    pub fn resource_count(&self) -> AdapterResult<usize> {
        self.memory.resource_count()
    }

    fn append(&self, snapshot: &Snapshot) -> AdapterResult<()> {
        self.writer
            .lock()
            .map_err(|_| AdapterError::poisoned("journal writer"))?
            .append(snapshot)
            .map(|_| ())
    }
}

impl StorageAdapter for JournalAdapter {
    fn next_commit_id(&self) -> CommitId {
        self.memory.next_commit_id()
    }

    fn load(&self, uri: &str) -> AdapterResult<Option<Arc<VersionChain>>> {
        self.memory.load(uri)
    }

    fn insert_if_absent(&self, snapshot: Snapshot) -> AdapterResult<InsertOutcome> {
        self.memory
            .insert_if_absent_with(snapshot, |snapshot| self.append(snapshot))
    }

    fn compare_and_append(
        &self,
        expected: &VersionToken,
        snapshot: Snapshot,
    ) -> AdapterResult<AppendOutcome> {
        self.memory
            .compare_and_append_with(expected, snapshot, |snapshot| self.append(snapshot))
    }

    fn collection_heads(&self, collection: &str) -> AdapterResult<Vec<Arc<Snapshot>>> {
        self.memory.collection_heads(collection)
    }

    fn flush(&self) -> AdapterResult<()> {
        self.writer
            .lock()
            .map_err(|_| AdapterError::poisoned("journal writer"))?
            .sync()
    }
}
