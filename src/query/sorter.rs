//! Result sorting for scans
//!
//! Keys are applied in priority order. Whatever the keys leave tied falls
//! back to the default order, `last_modified` descending with the later
//! commit first, so every scan is fully deterministic.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{SortField, SortKey};
use super::result::ScanCandidate;

/// Sorts scan candidates
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts candidates according to the sort keys.
    ///
    /// Sort is stable and deterministic.
    pub fn sort(candidates: &mut [ScanCandidate], keys: &[SortKey]) {
        candidates.sort_by(|a, b| {
            keys.iter()
                .map(|key| key.direction.apply(Self::compare_field(a, b, &key.field)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| Self::default_order(a, b))
        });
    }

    /// Newest first.
    fn default_order(a: &ScanCandidate, b: &ScanCandidate) -> Ordering {
        b.recency().cmp(&a.recency())
    }

    fn compare_field(a: &ScanCandidate, b: &ScanCandidate, field: &SortField) -> Ordering {
        match field {
            SortField::LastModified => a.recency().cmp(&b.recency()),
            SortField::Property(name) => Self::compare_values(a.property(name), b.property(name)),
        }
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string < array < object
    /// - For same types, natural ordering
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => {
                        let x = x.as_f64().unwrap_or(0.0);
                        let y = y.as_f64().unwrap_or(0.0);
                        x.total_cmp(&y)
                    }
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    // Nulls, arrays and objects tie
                    _ => Ordering::Equal,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::{CommitId, Snapshot, VersionToken};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn candidate(id: &str, body: Value, secs: i64, commit: u64) -> ScanCandidate {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap() + Duration::seconds(secs);
        ScanCandidate::head(Arc::new(Snapshot::initial(
            format!("/items/{}", id),
            "items",
            "alice",
            serde_json::to_vec(&body).unwrap(),
            VersionToken::new(id),
            CommitId::new(commit),
            at,
        )))
    }

    fn uris(candidates: &[ScanCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.uri()).collect()
    }

    #[test]
    fn test_default_order_newest_first() {
        let mut docs = vec![
            candidate("a", json!({}), 0, 1),
            candidate("b", json!({}), 10, 2),
            candidate("c", json!({}), 5, 3),
        ];
        ResultSorter::sort(&mut docs, &[]);
        assert_eq!(uris(&docs), vec!["/items/b", "/items/c", "/items/a"]);
    }

    #[test]
    fn test_equal_timestamps_break_by_commit() {
        let mut docs = vec![
            candidate("first", json!({}), 0, 1),
            candidate("second", json!({}), 0, 2),
            candidate("third", json!({}), 0, 3),
        ];
        ResultSorter::sort(&mut docs, &[]);
        assert_eq!(uris(&docs), vec!["/items/third", "/items/second", "/items/first"]);

        ResultSorter::sort(&mut docs, &[SortKey::asc("last_modified")]);
        assert_eq!(uris(&docs), vec!["/items/first", "/items/second", "/items/third"]);
    }

    #[test]
    fn test_property_sort_with_missing_first() {
        let mut docs = vec![
            candidate("a", json!({"rating": 4}), 0, 1),
            candidate("b", json!({}), 1, 2),
            candidate("c", json!({"rating": 2}), 2, 3),
        ];
        ResultSorter::sort(&mut docs, &[SortKey::asc("rating")]);
        assert_eq!(uris(&docs), vec!["/items/b", "/items/c", "/items/a"]);

        ResultSorter::sort(&mut docs, &[SortKey::desc("rating")]);
        assert_eq!(uris(&docs), vec!["/items/a", "/items/c", "/items/b"]);
    }

    #[test]
    fn test_secondary_key() {
        let mut docs = vec![
            candidate("a", json!({"kind": "x", "n": 1}), 0, 1),
            candidate("b", json!({"kind": "y", "n": 0}), 0, 2),
            candidate("c", json!({"kind": "x", "n": 2}), 0, 3),
        ];
        ResultSorter::sort(&mut docs, &[SortKey::asc("kind"), SortKey::desc("n")]);
        assert_eq!(uris(&docs), vec!["/items/c", "/items/a", "/items/b"]);
    }

    #[test]
    fn test_ties_fall_back_to_default_order() {
        let mut docs = vec![
            candidate("old", json!({"kind": "x"}), 0, 1),
            candidate("new", json!({"kind": "x"}), 9, 2),
        ];
        ResultSorter::sort(&mut docs, &[SortKey::asc("kind")]);
        assert_eq!(uris(&docs), vec!["/items/new", "/items/old"]);
    }
}
