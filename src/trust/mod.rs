//! Trust-handshake artifact storage
//!
//! Associations and nonces for an OpenID-style relying party, kept as
//! ordinary documents in two reserved collections. Nothing here touches the
//! adapter directly: every operation is a `DocumentStore` call made under a
//! single owner identity.
//!
//! - Associations are replaced by remove-then-create and looked up by scan
//!   (newest `issued` wins)
//! - Nonces are single-use: acceptance is an insert-if-absent at a uri
//!   derived from `(server_url, timestamp, salt)`, so a replay can never
//!   win, not even after cleanup tombstoned the original

mod association;
mod errors;
mod nonce;

use std::sync::Arc;

use chrono::Utc;

use crate::config::StoreConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::store::DocumentStore;

pub use association::{Association, AssociationStore};
pub use errors::{TrustError, TrustResult};
pub use nonce::NonceStore;

/// Collection holding association records
pub const ASSOCIATIONS_COLLECTION: &str = "openid_associations";

/// Collection holding consumed nonces
pub const NONCES_COLLECTION: &str = "openid_nonces";

/// Storage contract of a relying party's handshake state.
pub trait HandshakeStore: Send + Sync {
    /// Newest association for `server_url`, optionally narrowed to `handle`.
    fn get_association(
        &self,
        server_url: &str,
        handle: Option<&str>,
    ) -> TrustResult<Option<Association>>;

    /// Removes every association for `(server_url, handle)`. True if any
    /// was removed.
    fn remove_association(&self, server_url: &str, handle: &str) -> TrustResult<bool>;

    /// Replaces the associations sharing `(server_url, handle)`.
    fn store_association(&self, server_url: &str, association: &Association)
        -> TrustResult<bool>;

    /// True exactly once per `(server_url, timestamp, salt)` inside the
    /// skew window.
    fn use_nonce(&self, server_url: &str, timestamp: i64, salt: &str) -> TrustResult<bool>;

    /// Tombstones expired associations and out-of-window nonces. Returns
    /// how many were removed.
    fn cleanup(&self) -> TrustResult<usize>;
}

/// Association and nonce storage over one document store.
pub struct TrustStore {
    associations: AssociationStore,
    nonces: NonceStore,
}

impl TrustStore {
    pub fn new(store: Arc<DocumentStore>, owner_id: impl Into<String>, skew_secs: i64) -> Self {
        let owner_id = owner_id.into();
        Self {
            associations: AssociationStore::new(Arc::clone(&store), owner_id.clone()),
            nonces: NonceStore::new(store, owner_id, skew_secs),
        }
    }

    /// Owner and skew as configured.
    pub fn from_config(store: Arc<DocumentStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.trust_owner.clone(), config.nonce_skew_secs)
    }

    pub fn associations(&self) -> &AssociationStore {
        &self.associations
    }

    pub fn nonces(&self) -> &NonceStore {
        &self.nonces
    }

    /// Cleanup as of `now` (unix seconds).
    pub fn cleanup_at(&self, now: i64) -> TrustResult<usize> {
        let associations = self.associations.cleanup_associations(now)?;
        let nonces = self.nonces.cleanup_nonces(now)?;
        log_event_with_fields(
            Event::TrustCleanup,
            &[
                ("associations", associations.to_string().as_str()),
                ("nonces", nonces.to_string().as_str()),
            ],
        );
        Ok(associations + nonces)
    }
}

impl HandshakeStore for TrustStore {
    fn get_association(
        &self,
        server_url: &str,
        handle: Option<&str>,
    ) -> TrustResult<Option<Association>> {
        self.associations.get_association(server_url, handle)
    }

    fn remove_association(&self, server_url: &str, handle: &str) -> TrustResult<bool> {
        self.associations.remove_association(server_url, handle)
    }

    fn store_association(
        &self,
        server_url: &str,
        association: &Association,
    ) -> TrustResult<bool> {
        self.associations.store_association(server_url, association)
    }

    fn use_nonce(&self, server_url: &str, timestamp: i64, salt: &str) -> TrustResult<bool> {
        self.nonces.use_nonce(server_url, timestamp, salt)
    }

    fn cleanup(&self) -> TrustResult<usize> {
        self.cleanup_at(Utc::now().timestamp())
    }
}
