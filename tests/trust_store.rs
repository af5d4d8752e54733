//! Trust Store Tests
//!
//! Handshake artifacts through the public API:
//! - Nonces are accepted once, inside the skew window
//! - Associations are replaced per (server_url, handle) and looked up
//!   newest-first
//! - Cleanup tombstones expired artifacts without reopening nonce uris

use std::sync::Arc;

use aerodoc::config::StoreConfig;
use aerodoc::query::Query;
use aerodoc::store::{DocumentStore, StoreStatus};
use aerodoc::trust::{
    Association, HandshakeStore, TrustStore, ASSOCIATIONS_COLLECTION, NONCES_COLLECTION,
};
use chrono::Utc;

const OP: &str = "https://op.example/server";

fn setup() -> (Arc<DocumentStore>, TrustStore) {
    let config = StoreConfig::in_memory(["items"]);
    let store = Arc::new(DocumentStore::open(&config).unwrap());
    let trust = TrustStore::from_config(Arc::clone(&store), &config);
    (store, trust)
}

fn assoc(handle: &str, issued: i64) -> Association {
    Association::new(handle, b"shared-secret".to_vec(), issued, 3600, "HMAC-SHA1")
}

// =============================================================================
// Nonces
// =============================================================================

/// First use true, exact repeat false.
#[test]
fn test_nonce_first_use_only() {
    let (_, trust) = setup();
    let now = Utc::now().timestamp();

    assert!(trust.use_nonce(OP, now, "abc").unwrap());
    assert!(!trust.use_nonce(OP, now, "abc").unwrap());

    // Any component changing makes it a different nonce
    assert!(trust.use_nonce(OP, now, "abd").unwrap());
    assert!(trust.use_nonce(OP, now - 1, "abc").unwrap());
    assert!(trust.use_nonce("https://other.example", now, "abc").unwrap());
}

/// A timestamp further than the skew from now is refused.
#[test]
fn test_nonce_outside_skew() {
    let (store, trust) = setup();
    let now = Utc::now().timestamp();
    let skew = StoreConfig::default().nonce_skew_secs;

    assert!(!trust.use_nonce(OP, now - skew - 60, "late").unwrap());
    assert!(!trust.use_nonce(OP, now + skew + 60, "early").unwrap());

    // Nothing was recorded for refused nonces
    assert_eq!(store.scan(NONCES_COLLECTION, "openid", &Query::new()).total, 0);
    assert_eq!(store.metrics().nonces_rejected, 2);
}

/// Nonces are documents owned by the trust identity, invisible to others.
#[test]
fn test_nonces_are_owner_scoped() {
    let (store, trust) = setup();
    assert!(trust.use_nonce(OP, Utc::now().timestamp(), "s").unwrap());

    assert_eq!(store.scan(NONCES_COLLECTION, "openid", &Query::new()).total, 1);
    assert_eq!(store.scan(NONCES_COLLECTION, "alice", &Query::new()).total, 0);
}

// =============================================================================
// Associations
// =============================================================================

/// Two associations with the same handle: only the newer survives.
#[test]
fn test_association_replacement() {
    let (store, trust) = setup();

    assert!(trust.store_association(OP, &assoc("h", 1_000)).unwrap());
    assert!(trust.store_association(OP, &assoc("h", 2_000)).unwrap());

    let found = trust.get_association(OP, Some("h")).unwrap().unwrap();
    assert_eq!(found.issued, 2_000);
    assert_eq!(found.secret, b"shared-secret");

    // The older record is tombstoned, not merely shadowed
    let live = store.scan(ASSOCIATIONS_COLLECTION, "openid", &Query::new());
    assert_eq!(live.status, StoreStatus::Ok);
    assert_eq!(live.total, 1);
}

/// Without a handle, the newest association of the server wins.
#[test]
fn test_association_lookup_without_handle() {
    let (_, trust) = setup();
    trust.store_association(OP, &assoc("first", 1_000)).unwrap();
    trust.store_association(OP, &assoc("second", 3_000)).unwrap();
    trust.store_association(OP, &assoc("third", 2_000)).unwrap();
    trust.store_association("https://elsewhere", &assoc("x", 9_000)).unwrap();

    let newest = trust.get_association(OP, None).unwrap().unwrap();
    assert_eq!(newest.handle, "second");
    assert!(trust.get_association("https://nobody", None).unwrap().is_none());
}

/// Removal is per (server_url, handle).
#[test]
fn test_association_removal() {
    let (_, trust) = setup();
    trust.store_association(OP, &assoc("keep", 1_000)).unwrap();
    trust.store_association(OP, &assoc("drop", 1_000)).unwrap();

    assert!(trust.remove_association(OP, "drop").unwrap());
    assert!(!trust.remove_association(OP, "drop").unwrap());
    assert!(!trust.remove_association("https://elsewhere", "keep").unwrap());

    assert!(trust.get_association(OP, Some("drop")).unwrap().is_none());
    assert!(trust.get_association(OP, Some("keep")).unwrap().is_some());
}

/// Handles with arbitrary characters round-trip.
#[test]
fn test_association_handle_characters() {
    let (_, trust) = setup();
    let handle = "{HMAC-SHA1}{4f1c2d}{a+b/c==}";
    trust.store_association(OP, &assoc(handle, 10)).unwrap();

    let found = trust.get_association(OP, Some(handle)).unwrap().unwrap();
    assert_eq!(found.handle, handle);
    assert_eq!(found.assoc_type, "HMAC-SHA1");
    assert_eq!(found.lifetime, 3600);
}

// =============================================================================
// Cleanup
// =============================================================================

/// Cleanup removes expired associations and stale nonces only.
#[test]
fn test_cleanup() {
    let (_, trust) = setup();
    let now = Utc::now().timestamp();

    trust.store_association(OP, &assoc("expired", now - 7_200)).unwrap();
    trust.store_association(OP, &assoc("valid", now)).unwrap();
    assert!(trust.use_nonce(OP, now, "fresh").unwrap());

    assert_eq!(trust.cleanup().unwrap(), 1);
    assert!(trust.get_association(OP, Some("expired")).unwrap().is_none());
    assert!(trust.get_association(OP, Some("valid")).unwrap().is_some());

    // The fresh nonce is still recorded
    assert!(!trust.use_nonce(OP, now, "fresh").unwrap());
}

/// Nonces cleaned up still cannot be replayed.
#[test]
fn test_cleaned_nonces_stay_used() {
    let (store, trust) = setup();
    let now = Utc::now().timestamp();
    assert!(trust.use_nonce(OP, now, "once").unwrap());

    let later = now + 2 * StoreConfig::default().nonce_skew_secs;
    assert_eq!(trust.cleanup_at(later).unwrap(), 1);
    assert_eq!(store.scan(NONCES_COLLECTION, "openid", &Query::new()).total, 0);

    assert!(!trust.use_nonce(OP, now, "once").unwrap());
}
