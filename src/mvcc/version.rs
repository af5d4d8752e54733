//! Snapshot - Immutable document version
//!
//! A snapshot is one entry in a resource's version chain:
//! - Has complete document payload OR explicit tombstone
//! - Carries its version token and commit identity
//! - Once created, never changes
//!
//! Updates and deletes never modify a snapshot; they derive a successor.

use chrono::{DateTime, Utc};

use super::{CommitId, VersionToken};

/// The payload of a snapshot: either a document or an explicit tombstone.
///
/// Tombstone is explicit, NOT represented via Option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionPayload {
    /// Opaque document content.
    Document(Vec<u8>),
    /// An explicit deletion marker.
    Tombstone,
}

impl VersionPayload {
    /// Returns true if this payload is a tombstone.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, VersionPayload::Tombstone)
    }

    /// Returns the content bytes; empty for a tombstone.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self {
            VersionPayload::Document(bytes) => bytes,
            VersionPayload::Tombstone => &[],
        }
    }
}

/// A single immutable document snapshot.
///
/// All fields are private to enforce immutability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    uri: String,
    collection: String,
    owner_id: String,
    payload: VersionPayload,
    version_token: VersionToken,
    commit_id: CommitId,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl Snapshot {
    /// Creates the first snapshot of a resource.
    pub fn initial(
        uri: impl Into<String>,
        collection: impl Into<String>,
        owner_id: impl Into<String>,
        content: Vec<u8>,
        version_token: VersionToken,
        commit_id: CommitId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uri: uri.into(),
            collection: collection.into(),
            owner_id: owner_id.into(),
            payload: VersionPayload::Document(content),
            version_token,
            commit_id,
            created_at: now,
            last_modified: now,
        }
    }

    /// Reassembles a snapshot from persisted fields.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        uri: String,
        collection: String,
        owner_id: String,
        payload: VersionPayload,
        version_token: VersionToken,
        commit_id: CommitId,
        created_at: DateTime<Utc>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            uri,
            collection,
            owner_id,
            payload,
            version_token,
            commit_id,
            created_at,
            last_modified,
        }
    }

    /// Derives the next content version of this resource.
    ///
    /// `last_modified` never moves backwards along a chain, even if the
    /// wall clock does.
    pub fn successor(
        &self,
        content: Vec<u8>,
        version_token: VersionToken,
        commit_id: CommitId,
        now: DateTime<Utc>,
    ) -> Self {
        self.derive(VersionPayload::Document(content), version_token, commit_id, now)
    }

    /// Derives the tombstone that terminates this resource's chain.
    pub fn tombstone(
        &self,
        version_token: VersionToken,
        commit_id: CommitId,
        now: DateTime<Utc>,
    ) -> Self {
        self.derive(VersionPayload::Tombstone, version_token, commit_id, now)
    }

    fn derive(
        &self,
        payload: VersionPayload,
        version_token: VersionToken,
        commit_id: CommitId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uri: self.uri.clone(),
            collection: self.collection.clone(),
            owner_id: self.owner_id.clone(),
            payload,
            version_token,
            commit_id,
            created_at: self.created_at,
            last_modified: now.max(self.last_modified),
        }
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[inline]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns a reference to the payload.
    #[inline]
    pub fn payload(&self) -> &VersionPayload {
        &self.payload
    }

    /// Returns the content bytes; empty for a tombstone.
    #[inline]
    pub fn content(&self) -> &[u8] {
        self.payload.bytes()
    }

    #[inline]
    pub fn version_token(&self) -> &VersionToken {
        &self.version_token
    }

    #[inline]
    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Returns true if this snapshot is a tombstone.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.payload.is_tombstone()
    }

    /// Returns true if `owner_id` owns this resource.
    #[inline]
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}
