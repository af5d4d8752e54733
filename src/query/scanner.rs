//! CollectionScanner - filter, sort, then window
//!
//! Order of operations is fixed:
//! 1. Filter candidates with the predicate tree
//! 2. Record the match count as `total`
//! 3. Sort the matches
//! 4. Apply the `[offset, end)` window
//!
//! The scanner only reads the snapshots it is handed. Callers collect them
//! from a point-in-time view, so a scan never sees a torn document.

use super::ast::Query;
use super::filters::PredicateFilter;
use super::result::{ScanCandidate, ScanOutcome};
use super::sorter::ResultSorter;

/// Evaluates queries over a set of candidates
pub struct CollectionScanner;

impl CollectionScanner {
    pub fn scan(candidates: Vec<ScanCandidate>, query: &Query) -> ScanOutcome {
        let mut matches: Vec<ScanCandidate> = match &query.filter {
            Some(predicate) => candidates
                .into_iter()
                .filter(|c| PredicateFilter::matches(c, predicate))
                .collect(),
            None => candidates,
        };

        let total = matches.len();

        ResultSorter::sort(&mut matches, &query.sort);

        let offset = query.slice.offset;
        let window = matches.into_iter().skip(offset);
        let documents = match query.slice.limit() {
            Some(len) => window.take(len).map(ScanCandidate::into_document).collect(),
            None => window.map(ScanCandidate::into_document).collect(),
        };

        ScanOutcome {
            documents,
            total,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::{CommitId, Snapshot, VersionToken};
    use crate::query::{Predicate, Slice, SortKey};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn candidates() -> Vec<ScanCandidate> {
        let base = Utc::now();
        [4, 2, 5, 4, 4]
            .iter()
            .enumerate()
            .map(|(i, rating)| {
                let body: Value = json!({ "rating": rating, "n": i });
                ScanCandidate::head(Arc::new(Snapshot::initial(
                    format!("/items/{}", i),
                    "items",
                    "alice",
                    serde_json::to_vec(&body).unwrap(),
                    VersionToken::new(format!("t{}", i)),
                    CommitId::new(i as u64 + 1),
                    base + Duration::seconds(i as i64),
                )))
            })
            .collect()
    }

    #[test]
    fn test_filter_sets_total() {
        let query = Query::new().with_filter(Predicate::ge("rating", 4));
        let outcome = CollectionScanner::scan(candidates(), &query);
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.len(), 4);
        assert_eq!(outcome.offset, 0);

        let none = Query::new().with_filter(Predicate::le("rating", 1));
        let outcome = CollectionScanner::scan(candidates(), &none);
        assert_eq!(outcome.total, 0);
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_window_does_not_change_total() {
        let query = Query::new()
            .with_filter(Predicate::eq("rating", 4))
            .with_slice(Slice::new(1, 2));
        let outcome = CollectionScanner::scan(candidates(), &query);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.offset, 1);
        // newest first: 4, 3, 0 -> window [1, 2) is just 3
        let uris: Vec<_> = outcome.documents.iter().map(|d| d.uri.as_str()).collect();
        assert_eq!(uris, vec!["/items/3"]);
    }

    /// A clock stepping backwards between versions does not reorder a chain.
    #[test]
    fn test_chain_order_survives_clock_regression() {
        let now = Utc::now();
        let v1 = Arc::new(Snapshot::initial(
            "/items/a",
            "items",
            "alice",
            b"{}".to_vec(),
            VersionToken::new("v1"),
            CommitId::new(1),
            now,
        ));
        let v2 = Arc::new(v1.successor(b"{}".to_vec(), VersionToken::new("v2"), CommitId::new(2), now - Duration::seconds(60)));
        let v3 = Arc::new(v2.tombstone(VersionToken::new("v3"), CommitId::new(3), now - Duration::seconds(120)));

        let history = vec![
            ScanCandidate::head(v1),
            ScanCandidate::head(v3),
            ScanCandidate::head(v2),
        ];
        let outcome = CollectionScanner::scan(history, &Query::new());
        let tokens: Vec<_> = outcome
            .documents
            .iter()
            .map(|d| d.version_token.as_str())
            .collect();
        assert_eq!(tokens, vec!["v3", "v2", "v1"]);
    }

    #[test]
    fn test_end_before_offset_is_empty() {
        let outcome = CollectionScanner::scan(candidates(), &Query::new().with_slice(Slice::new(3, 1)));
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.offset, 3);
        assert!(outcome.is_empty());

        let empty = CollectionScanner::scan(candidates(), &Query::new().with_slice(Slice::new(2, 2)));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_overlong_window_truncates() {
        let query = Query::new().with_slice(Slice::new(3, 100));
        let outcome = CollectionScanner::scan(candidates(), &query);
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.len(), 2);

        let past_end = Query::new().with_slice(Slice::starting_at(9));
        let outcome = CollectionScanner::scan(candidates(), &past_end);
        assert_eq!(outcome.total, 5);
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_sort_before_window() {
        let query = Query::new()
            .with_sort(SortKey::desc("rating"))
            .with_slice(Slice::new(0, 1));
        let outcome = CollectionScanner::scan(candidates(), &query);
        assert_eq!(outcome.documents[0].uri, "/items/2");
    }
}
