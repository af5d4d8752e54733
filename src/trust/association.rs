//! Association records
//!
//! Stored as JSON objects in the associations collection:
//!
//! ```text
//! {"server_url": "...", "handle": b64, "secret": b64,
//!  "issued": unix-secs, "lifetime": secs, "assoc_type": "..."}
//! ```
//!
//! The handle is stored base64-encoded so lookups compare exact strings
//! whatever bytes the provider put in it.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::errors::{expect_success, TrustError, TrustResult};
use super::ASSOCIATIONS_COLLECTION;
use crate::observability::{log_event_with_fields, Event};
use crate::query::{Predicate, Query, ResultDocument, Slice, SortKey};
use crate::store::{DocumentStore, StoreStatus};

/// A shared secret negotiated with a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub handle: String,
    pub secret: Vec<u8>,
    /// Issue time, unix seconds
    pub issued: i64,
    /// Validity in seconds from `issued`
    pub lifetime: i64,
    pub assoc_type: String,
}

impl Association {
    pub fn new(
        handle: impl Into<String>,
        secret: Vec<u8>,
        issued: i64,
        lifetime: i64,
        assoc_type: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            secret,
            issued,
            lifetime,
            assoc_type: assoc_type.into(),
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.issued.saturating_add(self.lifetime)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at() < now
    }
}

/// Persisted form
#[derive(Debug, Serialize, Deserialize)]
struct AssociationRecord {
    server_url: String,
    handle: String,
    secret: String,
    issued: i64,
    lifetime: i64,
    assoc_type: String,
}

impl AssociationRecord {
    fn encode(server_url: &str, association: &Association) -> Self {
        Self {
            server_url: server_url.to_string(),
            handle: encode_handle(&association.handle),
            secret: STANDARD.encode(&association.secret),
            issued: association.issued,
            lifetime: association.lifetime,
            assoc_type: association.assoc_type.clone(),
        }
    }

    fn parse(document: &ResultDocument) -> TrustResult<Self> {
        serde_json::from_slice(&document.content)
            .map_err(|e| TrustError::malformed(&document.uri, e))
    }

    fn into_association(self, uri: &str) -> TrustResult<Association> {
        let handle = STANDARD
            .decode(&self.handle)
            .map_err(|e| TrustError::malformed(uri, e))?;
        let handle = String::from_utf8(handle).map_err(|e| TrustError::malformed(uri, e))?;
        let secret = STANDARD
            .decode(&self.secret)
            .map_err(|e| TrustError::malformed(uri, e))?;
        Ok(Association {
            handle,
            secret,
            issued: self.issued,
            lifetime: self.lifetime,
            assoc_type: self.assoc_type,
        })
    }
}

fn encode_handle(handle: &str) -> String {
    STANDARD.encode(handle.as_bytes())
}

/// Filter for the associations of `server_url`, narrowed to `handle` when
/// one is given and non-empty.
fn matching(server_url: &str, handle: Option<&str>) -> Predicate {
    let mut clauses = vec![Predicate::eq("server_url", server_url)];
    if let Some(handle) = handle.filter(|h| !h.is_empty()) {
        clauses.push(Predicate::eq("handle", encode_handle(handle)));
    }
    Predicate::and(clauses)
}

/// Association storage over the document store
pub struct AssociationStore {
    store: Arc<DocumentStore>,
    owner_id: String,
}

impl AssociationStore {
    pub fn new(store: Arc<DocumentStore>, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
        }
    }

    /// The association with the greatest `issued` among the matches.
    pub fn get_association(
        &self,
        server_url: &str,
        handle: Option<&str>,
    ) -> TrustResult<Option<Association>> {
        let query = Query::new()
            .with_filter(matching(server_url, handle))
            .with_sort(SortKey::desc("issued"))
            .with_slice(Slice::new(0, 1));

        let result = expect_success(self.scan(&query))?;
        match result.document() {
            Some(document) => {
                let record = AssociationRecord::parse(document)?;
                Ok(Some(record.into_association(&document.uri)?))
            }
            None => Ok(None),
        }
    }

    /// Tombstones every association for `(server_url, handle)`.
    ///
    /// Matches removed concurrently by someone else are skipped.
    pub fn remove_association(&self, server_url: &str, handle: &str) -> TrustResult<bool> {
        let query = Query::new().with_filter(matching(server_url, Some(handle)));
        let matches = expect_success(self.scan(&query))?.documents;

        let removed = self.remove_all(&matches)?;
        if removed > 0 {
            log_event_with_fields(
                Event::AssociationRemoved,
                &[
                    ("count", removed.to_string().as_str()),
                    ("server_url", server_url),
                ],
            );
        }
        Ok(removed > 0)
    }

    /// Replaces the associations sharing `(server_url, handle)` with
    /// `association`. True if the new record was created.
    pub fn store_association(
        &self,
        server_url: &str,
        association: &Association,
    ) -> TrustResult<bool> {
        self.remove_association(server_url, &association.handle)?;

        let body = serde_json::to_vec(&AssociationRecord::encode(server_url, association))?;
        let result = self.store.create(ASSOCIATIONS_COLLECTION, &self.owner_id, &body);
        match result.status {
            StoreStatus::Created => {
                log_event_with_fields(
                    Event::AssociationStored,
                    &[
                        ("assoc_type", association.assoc_type.as_str()),
                        ("server_url", server_url),
                        ("uri", result.uri().unwrap_or("")),
                    ],
                );
                Ok(true)
            }
            StoreStatus::AdapterFailure => Err(TrustError::unexpected(&result)),
            _ => Ok(false),
        }
    }

    /// Tombstones associations whose lifetime ended before `now`.
    pub fn cleanup_associations(&self, now: i64) -> TrustResult<usize> {
        let all = expect_success(self.scan(&Query::new()))?.documents;

        let mut expired = Vec::new();
        for document in all {
            let association = AssociationRecord::parse(&document)?.into_association(&document.uri)?;
            if association.is_expired(now) {
                expired.push(document);
            }
        }
        self.remove_all(&expired)
    }

    fn scan(&self, query: &Query) -> crate::store::StoreResult {
        self.store.scan(ASSOCIATIONS_COLLECTION, &self.owner_id, query)
    }

    fn remove_all(&self, documents: &[ResultDocument]) -> TrustResult<usize> {
        let mut removed = 0;
        for document in documents {
            let result =
                self.store
                    .delete(&document.uri, &self.owner_id, Some(&document.version_token));
            match result.status {
                StoreStatus::Ok => removed += 1,
                StoreStatus::Gone | StoreStatus::NotFound | StoreStatus::PreconditionFailed => {}
                _ => return Err(TrustError::unexpected(&result)),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP: &str = "https://op.example";

    fn associations() -> AssociationStore {
        AssociationStore::new(Arc::new(DocumentStore::in_memory(["items"])), "openid")
    }

    fn assoc(handle: &str, issued: i64) -> Association {
        Association::new(handle, vec![1, 2, 3, 255], issued, 600, "HMAC-SHA256")
    }

    #[test]
    fn test_record_encoding() {
        let record = AssociationRecord::encode(OP, &assoc("h/1", 10));
        assert_eq!(record.handle, STANDARD.encode("h/1"));
        assert_eq!(record.secret, STANDARD.encode([1u8, 2, 3, 255]));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["server_url"], OP);
        assert_eq!(json["issued"], 10);
        assert_eq!(json["assoc_type"], "HMAC-SHA256");
    }

    #[test]
    fn test_store_then_get() {
        let store = associations();
        assert!(store.store_association(OP, &assoc("h1", 100)).unwrap());

        assert_eq!(store.get_association(OP, Some("h1")).unwrap(), Some(assoc("h1", 100)));
        assert_eq!(store.get_association(OP, None).unwrap(), Some(assoc("h1", 100)));
        assert_eq!(store.get_association(OP, Some("")).unwrap(), Some(assoc("h1", 100)));
        assert!(store.get_association(OP, Some("h2")).unwrap().is_none());
        assert!(store.get_association("https://other", None).unwrap().is_none());
    }

    #[test]
    fn test_store_replaces_same_handle() {
        let store = associations();
        store.store_association(OP, &assoc("h1", 100)).unwrap();
        store.store_association(OP, &assoc("h1", 200)).unwrap();

        assert_eq!(store.get_association(OP, Some("h1")).unwrap().unwrap().issued, 200);
        let live = store.scan(&Query::new());
        assert_eq!(live.total, 1);
    }

    #[test]
    fn test_get_without_handle_picks_newest() {
        let store = associations();
        store.store_association(OP, &assoc("a", 300)).unwrap();
        store.store_association(OP, &assoc("b", 500)).unwrap();
        store.store_association(OP, &assoc("c", 400)).unwrap();

        assert_eq!(store.get_association(OP, None).unwrap().unwrap().handle, "b");
    }

    #[test]
    fn test_remove() {
        let store = associations();
        assert!(!store.remove_association(OP, "h1").unwrap());

        store.store_association(OP, &assoc("h1", 100)).unwrap();
        assert!(store.remove_association(OP, "h1").unwrap());
        assert!(store.get_association(OP, Some("h1")).unwrap().is_none());
        assert!(!store.remove_association(OP, "h1").unwrap());
    }

    #[test]
    fn test_cleanup_removes_expired_only() {
        let store = associations();
        store.store_association(OP, &assoc("old", 0)).unwrap();
        store.store_association(OP, &assoc("new", 1_000)).unwrap();

        assert_eq!(store.cleanup_associations(1_000).unwrap(), 1);
        assert!(store.get_association(OP, Some("old")).unwrap().is_none());
        assert!(store.get_association(OP, Some("new")).unwrap().is_some());
        assert_eq!(store.cleanup_associations(1_000).unwrap(), 0);
    }

    #[test]
    fn test_expiry() {
        let a = assoc("h", 100);
        assert_eq!(a.expires_at(), 700);
        assert!(!a.is_expired(700));
        assert!(a.is_expired(701));
    }
}
