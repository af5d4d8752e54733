//! # Store Errors
//!
//! One variant per refusal the store can report. Each maps to exactly one
//! `StoreStatus`; public store operations convert errors into a
//! `StoreResult` and never return them across the boundary.

use thiserror::Error;

use super::result::StoreStatus;
use crate::mvcc::Rejection;
use crate::storage::AdapterError;

/// Result type for store internals
pub type StoreOpResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Content failed structural validation
    #[error("Content failed validation: {0}")]
    Validation(String),

    /// A live resource was written without an expected token
    #[error("Precondition required: no version token supplied")]
    PreconditionMissing,

    /// The expected token is not the current head, or the uri is taken
    #[error("Precondition failed: version token is stale")]
    Conflict,

    /// Never existed, not hosted, or owned by someone else
    #[error("Resource not found")]
    NotFound,

    /// The resource was deleted
    #[error("Resource is gone")]
    Gone,

    /// The backing adapter failed
    #[error("Storage failure: {0}")]
    AdapterFailure(#[from] AdapterError),
}

impl StoreError {
    /// Returns the status this error is reported as
    pub fn status(&self) -> StoreStatus {
        match self {
            StoreError::Validation(_) => StoreStatus::UnprocessableContent,
            StoreError::PreconditionMissing => StoreStatus::PreconditionRequired,
            StoreError::Conflict => StoreStatus::PreconditionFailed,
            StoreError::NotFound => StoreStatus::NotFound,
            StoreError::Gone => StoreStatus::Gone,
            StoreError::AdapterFailure(_) => StoreStatus::AdapterFailure,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "AERODOC_VALIDATION_FAILED",
            StoreError::PreconditionMissing => "AERODOC_PRECONDITION_MISSING",
            StoreError::Conflict => "AERODOC_CONFLICT",
            StoreError::NotFound => "AERODOC_NOT_FOUND",
            StoreError::Gone => "AERODOC_GONE",
            StoreError::AdapterFailure(_) => "AERODOC_ADAPTER_FAILURE",
        }
    }

    /// Returns whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        self.status().as_u16() < 500
    }
}

impl From<Rejection> for StoreError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NotFound => StoreError::NotFound,
            Rejection::Gone => StoreError::Gone,
            Rejection::PreconditionMissing => StoreError::PreconditionMissing,
            Rejection::Conflict => StoreError::Conflict,
        }
    }
}
