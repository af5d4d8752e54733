//! StoreResult - the single return contract of store operations

use std::fmt;

use serde::Serialize;

use super::errors::StoreError;
use crate::query::{ResultDocument, ScanOutcome};

/// Closed set of operation outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreStatus {
    /// 200
    Ok,
    /// 201
    Created,
    /// 400: a live resource was written without a token
    PreconditionRequired,
    /// 404: never existed, not hosted, or not yours
    NotFound,
    /// 410: deleted
    Gone,
    /// 412: stale token, or the uri is taken
    PreconditionFailed,
    /// 422: content failed validation
    UnprocessableContent,
    /// 500: backing storage failed
    AdapterFailure,
}

impl StoreStatus {
    pub fn as_u16(&self) -> u16 {
        match self {
            StoreStatus::Ok => 200,
            StoreStatus::Created => 201,
            StoreStatus::PreconditionRequired => 400,
            StoreStatus::NotFound => 404,
            StoreStatus::Gone => 410,
            StoreStatus::PreconditionFailed => 412,
            StoreStatus::UnprocessableContent => 422,
            StoreStatus::AdapterFailure => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StoreStatus::Ok | StoreStatus::Created)
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl Serialize for StoreStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

/// Outcome of a store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResult {
    pub status: StoreStatus,
    /// Ordered result documents; empty on refusal
    pub documents: Vec<ResultDocument>,
    /// Match count before slicing (scans), else `documents.len()`
    pub total: usize,
    /// Offset of the first document within the match set
    pub offset: usize,
    /// Message for refusals
    pub error: Option<String>,
}

impl StoreResult {
    /// Success carrying documents
    pub fn with_documents(status: StoreStatus, documents: Vec<ResultDocument>) -> Self {
        Self {
            status,
            total: documents.len(),
            offset: 0,
            documents,
            error: None,
        }
    }

    /// 200 with one document
    pub fn ok(document: ResultDocument) -> Self {
        Self::with_documents(StoreStatus::Ok, vec![document])
    }

    /// 201 with the created document
    pub fn created(document: ResultDocument) -> Self {
        Self::with_documents(StoreStatus::Created, vec![document])
    }

    /// 200 with a scan window
    pub fn scanned(outcome: ScanOutcome) -> Self {
        Self {
            status: StoreStatus::Ok,
            documents: outcome.documents,
            total: outcome.total,
            offset: outcome.offset,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// First document, if any
    pub fn document(&self) -> Option<&ResultDocument> {
        self.documents.first()
    }

    /// Version token of the first document
    pub fn version_token(&self) -> Option<&crate::mvcc::VersionToken> {
        self.document().map(|d| &d.version_token)
    }

    /// Uri of the first document
    pub fn uri(&self) -> Option<&str> {
        self.document().map(|d| d.uri.as_str())
    }
}

impl From<StoreError> for StoreResult {
    fn from(error: StoreError) -> Self {
        Self {
            status: error.status(),
            documents: Vec::new(),
            total: 0,
            offset: 0,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<StoreResult, StoreError>> for StoreResult {
    fn from(result: Result<StoreResult, StoreError>) -> Self {
        result.unwrap_or_else(StoreResult::from)
    }
}
