//! Document store
//!
//! `DocumentStore` orchestrates every operation against the version chains
//! held by a `StorageAdapter`:
//!
//! | operation      | success | refusals                  |
//! |----------------|---------|---------------------------|
//! | `create`       | 201     | 404, 422                  |
//! | `create_at`    | 201     | 404, 410, 412, 422        |
//! | `put`          | 201/200 | as `create_at` / `update` |
//! | `read`         | 200     | 404, 410                  |
//! | `read_version` | 200     | 404, 410                  |
//! | `update`       | 200     | 400, 404, 410, 412, 422   |
//! | `delete`       | 200     | 400, 404, 410, 412        |
//! | `history`      | 200     | 404                       |
//! | `scan`         | 200     | 404                       |
//!
//! Any operation can also report 500 when the adapter fails.
//!
//! # Invariants
//!
//! - Every successful write produces a token new to the resource's chain
//! - A uri, once allocated, is never free again; a deleted uri answers 410
//! - Ownership is fixed at creation; other identities see 404
//! - Deletion appends a tombstone; history stays complete

mod document_store;
mod errors;
mod result;
mod uri;
mod validator;

pub use document_store::DocumentStore;
pub use errors::{StoreError, StoreOpResult};
pub use result::{StoreResult, StoreStatus};
pub use uri::{collection_uri, ResourceUri};
pub use validator::{ContentValidator, JsonObjectValidator, OpaqueValidator};
