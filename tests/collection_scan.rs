//! Collection Scan Tests
//!
//! Scans through the public store API:
//! - Filters select by typed comparison
//! - Sort keys order, with newest-first as the default
//! - Windows apply after filtering and sorting; `total` is pre-window
//! - Scans see only live heads owned by the caller

use aerodoc::query::{Predicate, Query, Slice, SortKey};
use aerodoc::store::{DocumentStore, StoreStatus};
use serde_json::{json, Value};

fn seeded() -> DocumentStore {
    let store = DocumentStore::in_memory(["items"]);
    for (name, rating) in [("a", 4), ("b", 2), ("c", 5), ("d", 4)] {
        let body = serde_json::to_vec(&json!({"name": name, "rating": rating})).unwrap();
        assert_eq!(store.create("items", "alice", &body).status, StoreStatus::Created);
    }
    store
}

fn names(documents: &[aerodoc::query::ResultDocument]) -> Vec<String> {
    documents
        .iter()
        .map(|d| d.json().unwrap()["name"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Filters
// =============================================================================

/// `rating >= 4` selects the 4s and the 5; `rating <= 1` selects nothing.
#[test]
fn test_numeric_filters() {
    let store = seeded();

    let high = store.scan(
        "items",
        "alice",
        &Query::new().with_filter(Predicate::ge("rating", 4)),
    );
    assert_eq!(high.status, StoreStatus::Ok);
    assert_eq!(high.total, 3);

    let low = store.scan(
        "items",
        "alice",
        &Query::new().with_filter(Predicate::le("rating", 1)),
    );
    assert_eq!(low.status, StoreStatus::Ok);
    assert_eq!(low.total, 0);
    assert!(low.documents.is_empty());
}

/// Strings compare exactly for equality and lexically for order.
#[test]
fn test_string_filters() {
    let store = seeded();

    let exact = store.scan("items", "alice", &Query::new().with_filter(Predicate::eq("name", "b")));
    assert_eq!(names(&exact.documents), vec!["b"]);

    let after = store.scan(
        "items",
        "alice",
        &Query::new()
            .with_filter(Predicate::gt("name", "b"))
            .with_sort(SortKey::asc("name")),
    );
    assert_eq!(names(&after.documents), vec!["c", "d"]);
}

/// No coercion: a string literal never matches a numeric property.
#[test]
fn test_no_type_coercion() {
    let store = seeded();
    let result = store.scan("items", "alice", &Query::new().with_filter(Predicate::eq("rating", "4")));
    assert_eq!(result.total, 0);
}

/// And / Or combine comparisons.
#[test]
fn test_compound_filters() {
    let store = seeded();

    let both = Predicate::and(vec![Predicate::eq("rating", 4), Predicate::ne("name", "a")]);
    let result = store.scan("items", "alice", &Query::new().with_filter(both));
    assert_eq!(names(&result.documents), vec!["d"]);

    let either = Predicate::or(vec![Predicate::eq("name", "a"), Predicate::eq("name", "c")]);
    let result = store.scan(
        "items",
        "alice",
        &Query::new().with_filter(either).with_sort(SortKey::asc("name")),
    );
    assert_eq!(names(&result.documents), vec!["a", "c"]);
}

// =============================================================================
// Sorting
// =============================================================================

/// Without sort keys, the most recently modified comes first.
#[test]
fn test_default_order_is_newest_first() {
    let store = seeded();
    let result = store.scan("items", "alice", &Query::new());
    assert_eq!(names(&result.documents), vec!["d", "c", "b", "a"]);

    // Touching "a" moves it to the front
    let a = store.scan("items", "alice", &Query::new().with_filter(Predicate::eq("name", "a")));
    let doc = a.document().unwrap();
    let body = serde_json::to_vec(&json!({"name": "a", "rating": 4})).unwrap();
    store.update(&doc.uri, "alice", &body, Some(&doc.version_token));

    let result = store.scan("items", "alice", &Query::new());
    assert_eq!(names(&result.documents), vec!["a", "d", "c", "b"]);
}

/// Multiple sort keys apply in priority order.
#[test]
fn test_multi_key_sort() {
    let store = seeded();
    let result = store.scan(
        "items",
        "alice",
        &Query::new()
            .with_sort(SortKey::desc("rating"))
            .with_sort(SortKey::asc("name")),
    );
    assert_eq!(names(&result.documents), vec!["c", "a", "d", "b"]);
}

// =============================================================================
// Windows
// =============================================================================

/// Slice (1, 2) over a 4-match set returns the one document at offset 1,
/// total 4.
#[test]
fn test_window_after_sort() {
    let store = seeded();
    let result = store.scan(
        "items",
        "alice",
        &Query::new()
            .with_sort(SortKey::asc("name"))
            .with_slice(Slice::new(1, 2)),
    );
    assert_eq!(result.total, 4);
    assert_eq!(result.offset, 1);
    assert_eq!(names(&result.documents), vec!["b"]);

    let page = store.scan(
        "items",
        "alice",
        &Query::new()
            .with_sort(SortKey::asc("name"))
            .with_slice(Slice::new(1, 3)),
    );
    assert_eq!(page.total, 4);
    assert_eq!(names(&page.documents), vec!["b", "c"]);
}

/// A window running past the end is truncated; one past the end is empty.
#[test]
fn test_overlong_window() {
    let store = seeded();

    let tail = store.scan("items", "alice", &Query::new().with_slice(Slice::new(3, 10)));
    assert_eq!(tail.total, 4);
    assert_eq!(tail.documents.len(), 1);

    let beyond = store.scan("items", "alice", &Query::new().with_slice(Slice::starting_at(9)));
    assert_eq!(beyond.status, StoreStatus::Ok);
    assert_eq!(beyond.total, 4);
    assert!(beyond.documents.is_empty());
}

// =============================================================================
// Visibility
// =============================================================================

/// Scans only see the caller's documents.
#[test]
fn test_scan_is_owner_scoped() {
    let store = seeded();
    store.create("items", "bob", &serde_json::to_vec(&json!({"name": "z", "rating": 9})).unwrap());

    let alice = store.scan("items", "alice", &Query::new());
    assert_eq!(alice.total, 4);
    assert!(!names(&alice.documents).contains(&"z".to_string()));

    let bob = store.scan("items", "bob", &Query::new().with_filter(Predicate::ge("rating", 0)));
    assert_eq!(names(&bob.documents), vec!["z"]);
}

/// Unknown collections are 404; empty collections scan to nothing.
#[test]
fn test_scan_collections() {
    let store = DocumentStore::in_memory(["items", "empty"]);
    assert_eq!(store.scan("missing", "alice", &Query::new()).status, StoreStatus::NotFound);

    let empty = store.scan("empty", "alice", &Query::new());
    assert_eq!(empty.status, StoreStatus::Ok);
    assert_eq!(empty.total, 0);
}

/// Nested properties are addressed with dotted names.
#[test]
fn test_nested_property_filter() {
    let store = DocumentStore::in_memory(["items"]);
    for city in ["Oslo", "Lima"] {
        let body: Value = json!({"address": {"city": city}});
        store.create("items", "alice", &serde_json::to_vec(&body).unwrap());
    }

    let result = store.scan(
        "items",
        "alice",
        &Query::new().with_filter(Predicate::eq("address.city", "Lima")),
    );
    assert_eq!(result.total, 1);
    assert_eq!(result.document().unwrap().json().unwrap()["address"]["city"], "Lima");
}
