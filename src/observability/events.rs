//! Observable store events
//!
//! Events are explicit and typed. Each carries its default severity:
//! lifecycle at INFO, per-operation detail at TRACE, refused writes at
//! WARN, backing failures at ERROR and corruption at FATAL.

use std::fmt;

use super::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Store opened and ready
    StoreOpen,
    /// Store shut down after flushing
    StoreShutdown,
    /// Journal replay complete
    JournalReplay,
    /// Journal failed validation on open
    JournalCorruption,

    // Document operations
    /// A resource was created
    DocumentCreated,
    /// A content version was appended
    DocumentUpdated,
    /// A tombstone was appended
    DocumentDeleted,
    /// A document or version was read
    DocumentRead,
    /// A history or collection scan completed
    ScanExecuted,
    /// A write was refused by its precondition
    WriteRejected,
    /// Content failed validation
    ValidationFailed,
    /// The backing adapter failed
    AdapterFailure,

    // Trust handshake
    /// An association was stored
    AssociationStored,
    /// Associations were removed
    AssociationRemoved,
    /// A nonce was accepted
    NonceAccepted,
    /// A nonce was replayed or outside the skew window
    NonceRejected,
    /// Expired artifacts were tombstoned
    TrustCleanup,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpen => "STORE_OPEN",
            Event::StoreShutdown => "STORE_SHUTDOWN",
            Event::JournalReplay => "JOURNAL_REPLAY_COMPLETE",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",

            Event::DocumentCreated => "DOCUMENT_CREATED",
            Event::DocumentUpdated => "DOCUMENT_UPDATED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::DocumentRead => "DOCUMENT_READ",
            Event::ScanExecuted => "SCAN_EXECUTED",
            Event::WriteRejected => "WRITE_REJECTED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::AdapterFailure => "ADAPTER_FAILURE",

            Event::AssociationStored => "ASSOCIATION_STORED",
            Event::AssociationRemoved => "ASSOCIATION_REMOVED",
            Event::NonceAccepted => "NONCE_ACCEPTED",
            Event::NonceRejected => "NONCE_REJECTED",
            Event::TrustCleanup => "TRUST_CLEANUP",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::JournalCorruption)
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::JournalCorruption => Severity::Fatal,
            Event::AdapterFailure => Severity::Error,
            Event::WriteRejected | Event::ValidationFailed | Event::NonceRejected => Severity::Warn,
            Event::ConfigLoaded
            | Event::StoreOpen
            | Event::StoreShutdown
            | Event::JournalReplay
            | Event::TrustCleanup => Severity::Info,
            Event::DocumentCreated
            | Event::DocumentUpdated
            | Event::DocumentDeleted
            | Event::DocumentRead
            | Event::ScanExecuted
            | Event::AssociationStored
            | Event::AssociationRemoved
            | Event::NonceAccepted => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
