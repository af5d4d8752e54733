//! aerodoc - a versioned, owner-scoped document store
//!
//! Documents live at `/{collection}/{id}` and are never overwritten: every
//! write appends an immutable snapshot to the resource's version chain,
//! identified by a fresh version token. Writers present the token they last
//! saw; a stale token is refused instead of silently losing an update.
//! Deletion appends a tombstone, so a deleted uri answers `410` forever and
//! its history stays readable.
//!
//! Layers, bottom up:
//! - `mvcc`: snapshots, version chains, the concurrency guard
//! - `storage`: adapters holding the chains (in memory, or journaled)
//! - `query`: filter, sort and window over scan candidates
//! - `store`: `DocumentStore`, the operation surface
//! - `trust`: handshake associations and nonces kept as documents
//! - `cli`: the `aerodoc` binary

pub mod cli;
pub mod config;
pub mod mvcc;
pub mod observability;
pub mod query;
pub mod storage;
pub mod store;
pub mod trust;
