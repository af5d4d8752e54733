//! Query evaluation for collection and history scans
//!
//! Queries are native expression trees built by the caller:
//! - `Predicate` - closed filter grammar over content properties
//! - `SortKey` - ordered sort keys (default `last_modified` descending)
//! - `Slice` - `[offset, end)` window
//!
//! `CollectionScanner` evaluates a query over a set of snapshots. Content
//! stays opaque bytes until a filter or property sort key needs it; the
//! JSON view is then parsed once per candidate.

mod ast;
mod filters;
mod result;
mod scanner;
mod sorter;

pub use ast::{
    ComparisonOp, Literal, Predicate, Query, Slice, SortDirection, SortField, SortKey,
};
pub use filters::PredicateFilter;
pub use result::{ResultDocument, ScanCandidate, ScanOutcome};
pub use scanner::CollectionScanner;
pub use sorter::ResultSorter;
