//! Resource uris
//!
//! A resource uri is `/{collection}/{id}`. Older versions of a resource are
//! addressed as `/{collection}/{id}/versions/{token}`.

use std::fmt;

use uuid::Uuid;

use crate::mvcc::VersionToken;

/// A parsed `/{collection}/{id}` uri
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    collection: String,
    id: String,
}

impl ResourceUri {
    /// Parses a resource uri. Anything but exactly two non-empty segments
    /// after a leading `/` is rejected.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix('/')?;
        let (collection, id) = rest.split_once('/')?;
        if collection.is_empty() || id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    /// A fresh uri in `collection`.
    pub fn generate(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Builds a uri from a collection and an id chosen by the caller.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address of one specific version of this resource.
    pub fn version_uri(&self, token: &VersionToken) -> String {
        format!("{}/versions/{}", self, token)
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.collection, self.id)
    }
}

/// Uri of a collection, as listed by `meta`.
pub fn collection_uri(collection: &str) -> String {
    format!("/{}", collection)
}
