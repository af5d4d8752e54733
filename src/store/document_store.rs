//! DocumentStore - the single entry point for document operations
//!
//! Every public operation returns a `StoreResult` and never panics or
//! returns an error across the boundary. Internally each operation is a
//! `try_*` function returning `StoreOpResult`, and `finish` converts the
//! outcome, records metrics and logs it.
//!
//! Write path for updates and deletes:
//! 1. Load the chain (point-in-time)
//! 2. Observe its state from the caller's identity
//! 3. Evaluate the precondition with `ConcurrencyGuard`
//! 4. Derive the successor snapshot with a fresh token
//! 5. Compare-and-append through the adapter
//!
//! If step 5 finds the head moved, the guard is re-run against the chain
//! seen under the lock, so the loser of a race gets the verdict that chain
//! deserves (`412`, or `410` if the winner deleted it). There are no
//! retries.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreOpResult};
use super::result::StoreResult;
use super::uri::{collection_uri, ResourceUri};
use super::validator::{ContentValidator, JsonObjectValidator};
use crate::config::StoreConfig;
use crate::mvcc::{
    CommitId, ConcurrencyGuard, ResourceState, Snapshot, VersionChain, VersionToken,
};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, MetricsSnapshot};
use crate::query::{CollectionScanner, Query, ResultDocument, ScanCandidate};
use crate::storage::{
    AdapterError, AppendOutcome, InsertOutcome, JournalAdapter, MemoryAdapter, StorageAdapter,
};

/// Attempts at drawing an unused random uri before giving up.
const MAX_URI_ATTEMPTS: usize = 8;

/// Operation kinds, for metrics and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Create,
    Update,
    Delete,
    Read,
    Scan,
}

impl Op {
    fn is_write(&self) -> bool {
        matches!(self, Op::Create | Op::Update | Op::Delete)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
            Op::Read => "read",
            Op::Scan => "scan",
        }
    }
}

/// Versioned, owner-scoped document store.
///
/// Explicitly constructed, shared by reference (`Arc<DocumentStore>`),
/// released with `shutdown`.
pub struct DocumentStore {
    adapter: Box<dyn StorageAdapter>,
    validator: Box<dyn ContentValidator>,
    collections: BTreeSet<String>,
    metrics: MetricsRegistry,
}

impl DocumentStore {
    /// Opens a store as configured: journaled if `data_dir` is set,
    /// volatile otherwise. A journal that fails validation aborts the open.
    pub fn open(config: &StoreConfig) -> StoreOpResult<Self> {
        let adapter: Box<dyn StorageAdapter> = match &config.data_dir {
            Some(dir) => {
                let journal = JournalAdapter::open(dir, config.fsync).map_err(|e| {
                    let message = e.to_string();
                    let event = if e.is_fatal() {
                        Event::JournalCorruption
                    } else {
                        Event::AdapterFailure
                    };
                    log_event_with_fields(event, &[("error", message.as_str())]);
                    e
                })?;
                log_event_with_fields(
                    Event::JournalReplay,
                    &[
                        ("data_dir", dir.display().to_string().as_str()),
                        ("records", journal.replayed().to_string().as_str()),
                    ],
                );
                Box::new(journal)
            }
            None => Box::new(MemoryAdapter::new()),
        };

        let store = Self::with_adapter(adapter, config.hosted_collections());
        log_event_with_fields(
            Event::StoreOpen,
            &[
                ("collections", store.collections.len().to_string().as_str()),
                (
                    "mode",
                    if config.data_dir.is_some() {
                        "journal"
                    } else {
                        "memory"
                    },
                ),
            ],
        );
        Ok(store)
    }

    /// Volatile store hosting `collections` plus the trust-handshake
    /// collections.
    pub fn in_memory<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = StoreConfig::in_memory(collections);
        Self::with_adapter(Box::new(MemoryAdapter::new()), config.hosted_collections())
    }

    /// Store over an explicit adapter, hosting exactly `collections`.
    pub fn with_adapter<I, S>(adapter: Box<dyn StorageAdapter>, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            adapter,
            validator: Box::new(JsonObjectValidator),
            collections: collections.into_iter().map(Into::into).collect(),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Replaces the content validator.
    pub fn with_validator(mut self, validator: impl ContentValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Counters shared with the trust-handshake layer.
    pub(crate) fn registry(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Hosted collection names, sorted.
    pub fn collections(&self) -> impl Iterator<Item = &str> + '_ {
        self.collections.iter().map(String::as_str)
    }

    /// Hosted collection uris (`/items`, ...), sorted.
    pub fn meta(&self) -> Vec<String> {
        self.collections().map(collection_uri).collect()
    }

    /// Flushes the adapter. The store stays usable; callers drop their
    /// handles afterwards.
    pub fn shutdown(&self) -> StoreOpResult<()> {
        self.adapter.flush()?;
        let metrics = self.metrics.snapshot();
        log_event_with_fields(
            Event::StoreShutdown,
            &[
                ("creates", metrics.creates.to_string().as_str()),
                ("updates", metrics.updates.to_string().as_str()),
                ("deletes", metrics.deletes.to_string().as_str()),
            ],
        );
        Ok(())
    }

    // ==================
    // Operations
    // ==================

    /// Creates a resource at a fresh uri in `collection`.
    ///
    /// `201` with the new uri and token; `422` for invalid content; `404`
    /// for a collection that is not hosted.
    pub fn create(&self, collection: &str, owner_id: &str, content: &[u8]) -> StoreResult {
        let result = self.try_create(collection, owner_id, content);
        self.finish(Op::Create, collection, owner_id, result)
    }

    /// Creates a resource at a caller-chosen uri, only if the uri was never
    /// allocated.
    ///
    /// `201` if absent; `412` if a live resource already has the uri; `410`
    /// if it was deleted; `404` if someone else owns it.
    pub fn create_at(&self, uri: &str, owner_id: &str, content: &[u8]) -> StoreResult {
        let result = self.try_create_at(uri, owner_id, content);
        self.finish(Op::Create, uri, owner_id, result)
    }

    /// Create-or-update.
    ///
    /// Without a token on a uri that was never allocated this creates
    /// (`201`). Everything else is an `update`.
    pub fn put(
        &self,
        uri: &str,
        owner_id: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult {
        if expected.is_none() {
            match self.try_create_at(uri, owner_id, content) {
                // Live resource: report it as an update without a token
                Err(StoreError::Conflict) => {}
                other => return self.finish(Op::Create, uri, owner_id, other),
            }
        }
        self.update(uri, owner_id, content, expected)
    }

    /// Current head of a resource.
    ///
    /// `200`; `404` if absent or not owned by `owner_id`; `410` if deleted.
    pub fn read(&self, uri: &str, owner_id: &str) -> StoreResult {
        let result = self.try_read(uri, owner_id);
        self.finish(Op::Read, uri, owner_id, result)
    }

    /// One specific version of a resource.
    ///
    /// `200`; `404` for an unknown uri, token or owner; `410` if the token
    /// names the tombstone.
    pub fn read_version(&self, uri: &str, owner_id: &str, token: &VersionToken) -> StoreResult {
        let result = self.try_read_version(uri, owner_id, token);
        self.finish(Op::Read, uri, owner_id, result)
    }

    /// Appends a new content version.
    ///
    /// `200` with the new token; `400` without a token; `412` for a stale
    /// token; `404` if absent; `410` if deleted; `422` for invalid content.
    pub fn update(
        &self,
        uri: &str,
        owner_id: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult {
        let result = self.try_update(uri, owner_id, content, expected);
        self.finish(Op::Update, uri, owner_id, result)
    }

    /// Appends a tombstone. The history stays readable.
    ///
    /// Same precondition rules as `update`.
    pub fn delete(&self, uri: &str, owner_id: &str, expected: Option<&VersionToken>) -> StoreResult {
        let result = self.try_delete(uri, owner_id, expected);
        self.finish(Op::Delete, uri, owner_id, result)
    }

    /// Scans the full chain of a resource, tombstone included.
    ///
    /// The head keeps the resource uri; older entries carry version uris.
    pub fn history(&self, uri: &str, owner_id: &str, query: &Query) -> StoreResult {
        let result = self.try_history(uri, owner_id, query);
        self.finish(Op::Scan, uri, owner_id, result)
    }

    /// Scans the live heads `owner_id` owns in `collection`.
    pub fn scan(&self, collection: &str, owner_id: &str, query: &Query) -> StoreResult {
        let result = self.try_scan(collection, owner_id, query);
        self.finish(Op::Scan, collection, owner_id, result)
    }

    // ==================
    // Implementation
    // ==================

    fn try_create(&self, collection: &str, owner_id: &str, content: &[u8]) -> StoreOpResult<StoreResult> {
        self.try_create_with(collection, owner_id, content, ResourceUri::generate)
    }

    /// `try_create` with the uri source supplied. Running out of attempts
    /// is a backing fault, never a precondition failure.
    fn try_create_with<G>(
        &self,
        collection: &str,
        owner_id: &str,
        content: &[u8],
        mut generate: G,
    ) -> StoreOpResult<StoreResult>
    where
        G: FnMut(&str) -> ResourceUri,
    {
        if !self.collections.contains(collection) {
            return Err(StoreError::NotFound);
        }
        self.validator.validate(content)?;

        for _ in 0..MAX_URI_ATTEMPTS {
            let uri = generate(collection);
            match self.insert(&uri, owner_id, content)? {
                InsertOutcome::Inserted(head) => return Ok(Self::created(&head)),
                InsertOutcome::Exists(_) => continue,
            }
        }
        Err(AdapterError::UriExhausted {
            collection: collection.to_string(),
            attempts: MAX_URI_ATTEMPTS,
        }
        .into())
    }

    fn try_create_at(&self, uri: &str, owner_id: &str, content: &[u8]) -> StoreOpResult<StoreResult> {
        let uri = self.hosted(uri)?;
        self.validator.validate(content)?;

        match self.insert(&uri, owner_id, content)? {
            InsertOutcome::Inserted(head) => Ok(Self::created(&head)),
            InsertOutcome::Exists(chain) => {
                Err(match ResourceState::observe(Some(&chain), owner_id) {
                    ResourceState::Absent => StoreError::NotFound,
                    ResourceState::Tombstoned => StoreError::Gone,
                    ResourceState::Live(_) => StoreError::Conflict,
                })
            }
        }
    }

    fn try_read(&self, uri: &str, owner_id: &str) -> StoreOpResult<StoreResult> {
        let (_, chain) = self.load_visible(uri, owner_id)?;
        let head = chain.head().ok_or(StoreError::NotFound)?;
        if head.is_deleted() {
            return Err(StoreError::Gone);
        }
        Ok(StoreResult::ok(ResultDocument::from_snapshot(head.uri(), head)))
    }

    fn try_read_version(
        &self,
        uri: &str,
        owner_id: &str,
        token: &VersionToken,
    ) -> StoreOpResult<StoreResult> {
        let (parsed, chain) = self.load_visible(uri, owner_id)?;
        let snapshot = chain.find(token).ok_or(StoreError::NotFound)?;
        if snapshot.is_deleted() {
            return Err(StoreError::Gone);
        }

        let is_head = chain
            .head()
            .is_some_and(|head| head.version_token() == token);
        let address = if is_head {
            parsed.to_string()
        } else {
            parsed.version_uri(token)
        };
        Ok(StoreResult::ok(ResultDocument::from_snapshot(address, snapshot)))
    }

    fn try_update(
        &self,
        uri: &str,
        owner_id: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreOpResult<StoreResult> {
        let uri = self.hosted(uri)?;
        self.validator.validate(content)?;

        let head = self.append(&uri, owner_id, expected, |head, token, commit, now| {
            head.successor(content.to_vec(), token, commit, now)
        })?;
        Ok(StoreResult::ok(ResultDocument::from_snapshot(head.uri(), &head)))
    }

    fn try_delete(
        &self,
        uri: &str,
        owner_id: &str,
        expected: Option<&VersionToken>,
    ) -> StoreOpResult<StoreResult> {
        let uri = self.hosted(uri)?;

        let head = self.append(&uri, owner_id, expected, |head, token, commit, now| {
            head.tombstone(token, commit, now)
        })?;
        Ok(StoreResult::ok(ResultDocument::from_snapshot(head.uri(), &head)))
    }

    fn try_history(&self, uri: &str, owner_id: &str, query: &Query) -> StoreOpResult<StoreResult> {
        let (parsed, chain) = self.load_visible(uri, owner_id)?;

        let candidates = chain
            .newest_first()
            .enumerate()
            .map(|(i, snapshot)| {
                let address = if i == 0 {
                    parsed.to_string()
                } else {
                    parsed.version_uri(snapshot.version_token())
                };
                ScanCandidate::new(address, Arc::clone(snapshot))
            })
            .collect();

        Ok(StoreResult::scanned(CollectionScanner::scan(candidates, query)))
    }

    fn try_scan(&self, collection: &str, owner_id: &str, query: &Query) -> StoreOpResult<StoreResult> {
        if !self.collections.contains(collection) {
            return Err(StoreError::NotFound);
        }

        let candidates = self
            .adapter
            .collection_heads(collection)?
            .into_iter()
            .filter(|head| head.is_owned_by(owner_id) && !head.is_deleted())
            .map(ScanCandidate::head)
            .collect();

        Ok(StoreResult::scanned(CollectionScanner::scan(candidates, query)))
    }

    /// Parses `uri` and checks its collection is hosted.
    fn hosted(&self, uri: &str) -> StoreOpResult<ResourceUri> {
        ResourceUri::parse(uri)
            .filter(|parsed| self.collections.contains(parsed.collection()))
            .ok_or(StoreError::NotFound)
    }

    /// Loads a chain the caller may see. Foreign and absent resources are
    /// both `NotFound`.
    fn load_visible(
        &self,
        uri: &str,
        owner_id: &str,
    ) -> StoreOpResult<(ResourceUri, Arc<VersionChain>)> {
        let parsed = self.hosted(uri)?;
        let chain = self
            .adapter
            .load(parsed.to_string().as_str())?
            .ok_or(StoreError::NotFound)?;
        if chain.owner_id() != Some(owner_id) {
            return Err(StoreError::NotFound);
        }
        Ok((parsed, chain))
    }

    fn insert(&self, uri: &ResourceUri, owner_id: &str, content: &[u8]) -> StoreOpResult<InsertOutcome> {
        let snapshot = Snapshot::initial(
            uri.to_string(),
            uri.collection(),
            owner_id,
            content.to_vec(),
            VersionToken::generate(),
            self.adapter.next_commit_id(),
            Utc::now(),
        );
        Ok(self.adapter.insert_if_absent(snapshot)?)
    }

    /// Guarded append of the snapshot `derive` builds from the head.
    fn append<F>(
        &self,
        uri: &ResourceUri,
        owner_id: &str,
        expected: Option<&VersionToken>,
        derive: F,
    ) -> StoreOpResult<Arc<Snapshot>>
    where
        F: FnOnce(&Snapshot, VersionToken, CommitId, DateTime<Utc>) -> Snapshot,
    {
        let chain = self.adapter.load(uri.to_string().as_str())?;
        let state = ResourceState::observe(chain.as_deref(), owner_id);
        let token = ConcurrencyGuard::evaluate(state, expected)?;

        let chain = chain.ok_or(StoreError::NotFound)?;
        let head = chain.head().ok_or(StoreError::NotFound)?;
        let next = derive(
            head,
            chain.fresh_token(),
            self.adapter.next_commit_id(),
            Utc::now(),
        );

        match self.adapter.compare_and_append(token, next)? {
            AppendOutcome::Appended(head) => Ok(head),
            AppendOutcome::Stale(current) => {
                let state = ResourceState::observe(current.as_deref(), owner_id);
                ConcurrencyGuard::evaluate(state, expected)?;
                Err(StoreError::Conflict)
            }
        }
    }

    fn created(head: &Snapshot) -> StoreResult {
        StoreResult::created(ResultDocument::from_snapshot(head.uri(), head))
    }

    /// Converts an outcome to a `StoreResult`, recording metrics and logs.
    fn finish(
        &self,
        op: Op,
        target: &str,
        owner_id: &str,
        result: StoreOpResult<StoreResult>,
    ) -> StoreResult {
        match &result {
            Ok(outcome) => self.record_success(op, target, owner_id, outcome),
            Err(error) => self.record_refusal(op, target, owner_id, error),
        }
        result.into()
    }

    fn record_success(&self, op: Op, target: &str, owner_id: &str, outcome: &StoreResult) {
        let event = match op {
            Op::Create => {
                self.metrics.increment_creates();
                Event::DocumentCreated
            }
            Op::Update => {
                self.metrics.increment_updates();
                Event::DocumentUpdated
            }
            Op::Delete => {
                self.metrics.increment_deletes();
                Event::DocumentDeleted
            }
            Op::Read => {
                self.metrics.increment_reads();
                Event::DocumentRead
            }
            Op::Scan => {
                self.metrics.increment_scans();
                Event::ScanExecuted
            }
        };

        let uri = outcome.uri().unwrap_or(target);
        let version = outcome
            .version_token()
            .map(VersionToken::as_str)
            .unwrap_or("");
        log_event_with_fields(
            event,
            &[
                ("owner", owner_id),
                ("status", outcome.status.to_string().as_str()),
                ("total", outcome.total.to_string().as_str()),
                ("uri", uri),
                ("version", version),
            ],
        );
    }

    fn record_refusal(&self, op: Op, target: &str, owner_id: &str, error: &StoreError) {
        match error {
            StoreError::Validation(_) => self.metrics.increment_validation_failures(),
            StoreError::PreconditionMissing => self.metrics.increment_missing_preconditions(),
            StoreError::Conflict => self.metrics.increment_conflicts(),
            StoreError::NotFound => self.metrics.increment_not_found(),
            StoreError::Gone => self.metrics.increment_gone(),
            StoreError::AdapterFailure(_) => self.metrics.increment_adapter_failures(),
        }

        let event = match error {
            StoreError::AdapterFailure(_) => Event::AdapterFailure,
            StoreError::Validation(_) => Event::ValidationFailed,
            _ if op.is_write() => Event::WriteRejected,
            _ if op == Op::Scan => Event::ScanExecuted,
            _ => Event::DocumentRead,
        };

        let message = error.to_string();
        log_event_with_fields(
            event,
            &[
                ("code", error.code()),
                ("message", message.as_str()),
                ("op", op.as_str()),
                ("owner", owner_id),
                ("status", error.status().to_string().as_str()),
                ("uri", target),
            ],
        );
    }
}
