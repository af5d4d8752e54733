//! Storage adapter error types
//!
//! Error codes:
//! - AERODOC_STORAGE_IO_ERROR (ERROR severity)
//! - AERODOC_DATA_CORRUPTION (FATAL severity)
//! - AERODOC_LOCK_POISONED (FATAL severity)
//! - AERODOC_SERIALIZATION (ERROR severity)
//! - AERODOC_JOURNAL_POISONED (FATAL severity)
//! - AERODOC_URI_EXHAUSTED (ERROR severity)
//!
//! Every adapter failure is opaque to store callers: the store converts it
//! into a single `AdapterFailure` result and never retries.

use std::io;

use thiserror::Error;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Backing-storage failures
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Disk I/O failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Journal bytes failed validation (bad checksum, torn tail, bad field)
    #[error("journal corruption at offset {offset}: {details}")]
    Corruption { offset: u64, details: String },

    /// A writer panicked while holding a resource lock
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A record could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A failed append could not be rolled back; the journal tail is
    /// unknown and no further appends are accepted
    #[error("journal poisoned: {0}")]
    JournalPoisoned(String),

    /// Every generated uri for a create was already allocated
    #[error("no free uri in {collection} after {attempts} attempts")]
    UriExhausted { collection: String, attempts: usize },
}

impl AdapterError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        AdapterError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corruption(offset: u64, details: impl Into<String>) -> Self {
        AdapterError::Corruption {
            offset,
            details: details.into(),
        }
    }

    pub fn poisoned(what: impl Into<String>) -> Self {
        AdapterError::LockPoisoned(what.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::Io { .. } => "AERODOC_STORAGE_IO_ERROR",
            AdapterError::Corruption { .. } => "AERODOC_DATA_CORRUPTION",
            AdapterError::LockPoisoned(_) => "AERODOC_LOCK_POISONED",
            AdapterError::Serialization(_) => "AERODOC_SERIALIZATION",
            AdapterError::JournalPoisoned(_) => "AERODOC_JOURNAL_POISONED",
            AdapterError::UriExhausted { .. } => "AERODOC_URI_EXHAUSTED",
        }
    }

    /// Returns true when the store must not continue serving
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdapterError::Corruption { .. }
                | AdapterError::LockPoisoned(_)
                | AdapterError::JournalPoisoned(_)
        )
    }
}
