//! Result types for scans and single-document reads

use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::mvcc::{CommitId, Snapshot, VersionToken};

/// A single document as returned to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDocument {
    /// Address of this document (a version uri for non-head history entries)
    pub uri: String,
    /// Token identifying this exact version
    pub version_token: VersionToken,
    /// Modification time of this version
    pub last_modified: DateTime<Utc>,
    /// Opaque content; empty for a tombstone
    pub content: Vec<u8>,
    /// True for a tombstone entry (history only)
    pub deleted: bool,
}

impl ResultDocument {
    /// Describe `snapshot` under the address `uri`.
    pub fn from_snapshot(uri: impl Into<String>, snapshot: &Snapshot) -> Self {
        Self {
            uri: uri.into(),
            version_token: snapshot.version_token().clone(),
            last_modified: snapshot.last_modified(),
            content: snapshot.content().to_vec(),
            deleted: snapshot.is_deleted(),
        }
    }

    /// Parse the content as JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.content).ok()
    }
}

/// A scan input: one snapshot plus its lazily-parsed structured view.
///
/// The view is materialized only if a filter or a property sort key asks
/// for it, and at most once per candidate.
#[derive(Debug)]
pub struct ScanCandidate {
    uri: String,
    snapshot: Arc<Snapshot>,
    view: OnceCell<Option<Value>>,
}

impl ScanCandidate {
    pub fn new(uri: impl Into<String>, snapshot: Arc<Snapshot>) -> Self {
        Self {
            uri: uri.into(),
            snapshot,
            view: OnceCell::new(),
        }
    }

    /// A current head, addressed by its resource uri.
    pub fn head(snapshot: Arc<Snapshot>) -> Self {
        Self::new(snapshot.uri().to_string(), snapshot)
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Sort key used by the default order: `(last_modified, commit)`.
    #[inline]
    pub fn recency(&self) -> (DateTime<Utc>, CommitId) {
        (self.snapshot.last_modified(), self.snapshot.commit_id())
    }

    /// Structured view of the content.
    ///
    /// `None` for tombstones and for content that is not JSON; every
    /// property then counts as missing.
    pub fn view(&self) -> Option<&Value> {
        self.view
            .get_or_init(|| {
                if self.snapshot.is_deleted() {
                    None
                } else {
                    serde_json::from_slice(self.snapshot.content()).ok()
                }
            })
            .as_ref()
    }

    /// Look up a property; dotted names walk nested objects.
    pub fn property(&self, name: &str) -> Option<&Value> {
        let mut current = self.view()?;
        for segment in name.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn into_document(self) -> ResultDocument {
        ResultDocument::from_snapshot(self.uri, &self.snapshot)
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Documents inside the window, in result order
    pub documents: Vec<ResultDocument>,
    /// Number of matches before the window was applied
    pub total: usize,
    /// Offset of the window
    pub offset: usize,
}

impl ScanOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::CommitId;

    fn snapshot(content: &[u8]) -> Arc<Snapshot> {
        Arc::new(Snapshot::initial(
            "/items/a",
            "items",
            "alice",
            content.to_vec(),
            VersionToken::new("t1"),
            CommitId::new(1),
            Utc::now(),
        ))
    }

    #[test]
    fn test_property_lookup() {
        let candidate = ScanCandidate::head(snapshot(br#"{"a":{"b":3},"c":"x"}"#));
        assert_eq!(candidate.property("c"), Some(&Value::from("x")));
        assert_eq!(candidate.property("a.b"), Some(&Value::from(3)));
        assert_eq!(candidate.property("a.z"), None);
        assert_eq!(candidate.property("c.d"), None);
    }

    #[test]
    fn test_unparseable_content_has_no_view() {
        let candidate = ScanCandidate::head(snapshot(b"not json"));
        assert!(candidate.view().is_none());
        assert!(candidate.property("a").is_none());
    }

    #[test]
    fn test_into_document() {
        let candidate = ScanCandidate::new("/items/a/versions/t1", snapshot(b"{}"));
        let doc = candidate.into_document();
        assert_eq!(doc.uri, "/items/a/versions/t1");
        assert_eq!(doc.version_token.as_str(), "t1");
        assert_eq!(doc.content, b"{}");
        assert!(!doc.deleted);
        assert_eq!(doc.json(), Some(serde_json::json!({})));
    }

    #[test]
    fn test_empty_outcome() {
        let outcome = ScanOutcome::empty();
        assert!(outcome.is_empty());
        assert_eq!(outcome.len(), 0);
        assert_eq!(outcome.total, 0);
    }
}
