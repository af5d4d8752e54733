//! Versioning domain types
//!
//! This module provides:
//! - `CommitId` / `CommitSequence` - store-wide commit ordering
//! - `VersionToken` - opaque per-version precondition token
//! - `Snapshot` - immutable document version (or tombstone)
//! - `VersionChain` - append-only history of one resource
//! - `ConcurrencyGuard` - write precondition verdicts
//!
//! # Invariants
//!
//! - Snapshots never change after creation
//! - Updates and deletes append; nothing is removed from a chain
//! - A tombstone is terminal
//! - Every token in a chain is distinct

mod commit_id;
mod guard;
mod version;
mod version_chain;
mod version_token;

pub use commit_id::{CommitId, CommitSequence};
pub use guard::{ConcurrencyGuard, Rejection, ResourceState};
pub use version::{Snapshot, VersionPayload};
pub use version_chain::VersionChain;
pub use version_token::VersionToken;
