//! VersionToken - opaque identity of one exact content version
//!
//! Clients present the token they last observed as the precondition for
//! an update or delete. Tokens carry no ordering; only equality matters.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque value identifying an exact content version of a resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a token received from a caller.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random token.
    ///
    /// Callers that need uniqueness within a chain must still check the
    /// chain; see `VersionChain::fresh_token`.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the token text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
