//! Single-use nonces
//!
//! A nonce is accepted by creating `/openid_nonces/{id}` where `id` is the
//! SHA-256 of the JSON array `[server_url, timestamp, salt]`. The create is
//! insert-if-absent, so of any number of concurrent callers presenting the
//! same nonce exactly one sees `201`.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::{expect_success, TrustError, TrustResult};
use super::NONCES_COLLECTION;
use crate::observability::{log_event_with_fields, Event};
use crate::query::{Predicate, Query};
use crate::store::{DocumentStore, ResourceUri, StoreStatus};

#[derive(Debug, Serialize, Deserialize)]
struct NonceRecord {
    server_url: String,
    timestamp: i64,
    salt: String,
}

/// Uri a nonce is recorded at.
fn nonce_uri(server_url: &str, timestamp: i64, salt: &str) -> ResourceUri {
    let composite = serde_json::json!([server_url, timestamp, salt]).to_string();
    let mut hasher = Sha256::new();
    hasher.update(composite.as_bytes());
    ResourceUri::new(NONCES_COLLECTION, format!("{:x}", hasher.finalize()))
}

/// Nonce storage over the document store
pub struct NonceStore {
    store: Arc<DocumentStore>,
    owner_id: String,
    skew_secs: u64,
}

impl NonceStore {
    /// A negative skew is treated as zero.
    pub fn new(store: Arc<DocumentStore>, owner_id: impl Into<String>, skew_secs: i64) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
            skew_secs: u64::try_from(skew_secs).unwrap_or(0),
        }
    }

    pub fn skew_secs(&self) -> u64 {
        self.skew_secs
    }

    /// Consumes a nonce against the current clock.
    pub fn use_nonce(&self, server_url: &str, timestamp: i64, salt: &str) -> TrustResult<bool> {
        self.use_nonce_at(server_url, timestamp, salt, Utc::now().timestamp())
    }

    /// Consumes a nonce as of `now` (unix seconds).
    ///
    /// False if the timestamp is more than the allowed skew away from `now`,
    /// or if the nonce was seen before.
    pub fn use_nonce_at(
        &self,
        server_url: &str,
        timestamp: i64,
        salt: &str,
        now: i64,
    ) -> TrustResult<bool> {
        if timestamp.abs_diff(now) > self.skew_secs {
            self.reject(server_url, "skew");
            return Ok(false);
        }

        let uri = nonce_uri(server_url, timestamp, salt);
        let body = serde_json::to_vec(&NonceRecord {
            server_url: server_url.to_string(),
            timestamp,
            salt: salt.to_string(),
        })?;

        let result = self
            .store
            .create_at(uri.to_string().as_str(), &self.owner_id, &body);
        match result.status {
            StoreStatus::Created => {
                self.store.registry().increment_nonces_accepted();
                log_event_with_fields(
                    Event::NonceAccepted,
                    &[("server_url", server_url), ("uri", uri.to_string().as_str())],
                );
                Ok(true)
            }
            StoreStatus::AdapterFailure => Err(TrustError::unexpected(&result)),
            _ => {
                self.reject(server_url, "replay");
                Ok(false)
            }
        }
    }

    /// Tombstones nonces whose timestamp is outside the skew window around
    /// `now`. Their uris stay allocated, so replays keep failing.
    pub fn cleanup_nonces(&self, now: i64) -> TrustResult<usize> {
        let skew = i64::try_from(self.skew_secs).unwrap_or(i64::MAX);
        let outside = Predicate::or(vec![
            Predicate::lt("timestamp", now.saturating_sub(skew)),
            Predicate::gt("timestamp", now.saturating_add(skew)),
        ]);
        let query = Query::new().with_filter(outside);
        let stale = expect_success(self.store.scan(NONCES_COLLECTION, &self.owner_id, &query))?;

        let mut removed = 0;
        for document in &stale.documents {
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

    fn reject(&self, server_url: &str, reason: &str) {
        self.store.registry().increment_nonces_rejected();
        log_event_with_fields(
            Event::NonceRejected,
            &[("reason", reason), ("server_url", server_url)],
        );
    }
}
