//! ConcurrencyGuard - write precondition evaluation
//!
//! Decides whether an update or delete may append to a resource's chain.
//! The decision table, in evaluation order:
//!
//! | resource state | expected token | verdict               |
//! |----------------|----------------|-----------------------|
//! | absent         | any            | NotFound              |
//! | tombstoned     | any            | Gone                  |
//! | live           | omitted        | PreconditionMissing   |
//! | live           | != current     | Conflict              |
//! | live           | == current     | accept                |
//!
//! The guard is pure. Atomicity comes from the storage adapter, which
//! re-checks the accepted token under the resource's write lock
//! (compare-and-set) before appending.

use super::{VersionChain, VersionToken};

/// What the guard can see of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState<'a> {
    /// Never existed, or is owned by someone else.
    Absent,
    /// Head is a live document with this token.
    Live(&'a VersionToken),
    /// Head is a tombstone.
    Tombstoned,
}

impl<'a> ResourceState<'a> {
    /// Observe a chain from the point of view of `owner_id`.
    ///
    /// A chain owned by a different identity is reported as `Absent`, so a
    /// foreign resource is indistinguishable from a missing one.
    pub fn observe(chain: Option<&'a VersionChain>, owner_id: &str) -> Self {
        let chain = match chain {
            Some(c) if c.owner_id() == Some(owner_id) => c,
            _ => return ResourceState::Absent,
        };

        match chain.head() {
            None => ResourceState::Absent,
            Some(head) if head.is_deleted() => ResourceState::Tombstoned,
            Some(head) => ResourceState::Live(head.version_token()),
        }
    }
}

/// Why a write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    Gone,
    PreconditionMissing,
    Conflict,
}

/// Evaluates write preconditions.
pub struct ConcurrencyGuard;

impl ConcurrencyGuard {
    /// Evaluate a write against the observed state.
    ///
    /// On acceptance returns the token the adapter must still find at the
    /// head when it commits.
    pub fn evaluate<'t>(
        state: ResourceState<'_>,
        expected: Option<&'t VersionToken>,
    ) -> Result<&'t VersionToken, Rejection> {
        match state {
            ResourceState::Absent => Err(Rejection::NotFound),
            ResourceState::Tombstoned => Err(Rejection::Gone),
            ResourceState::Live(current) => match expected {
                None => Err(Rejection::PreconditionMissing),
                Some(token) if token != current => Err(Rejection::Conflict),
                Some(token) => Ok(token),
            },
        }
    }
}
