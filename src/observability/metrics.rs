//! Metrics registry
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one store.
///
/// Uses Relaxed ordering; counters are independent of each other.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    reads: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    scans: AtomicU64,
    not_found: AtomicU64,
    gone: AtomicU64,
    conflicts: AtomicU64,
    missing_preconditions: AtomicU64,
    validation_failures: AtomicU64,
    adapter_failures: AtomicU64,
    nonces_accepted: AtomicU64,
    nonces_rejected: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Successful operations

    pub fn increment_reads(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_creates(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    // Refusals

    pub fn increment_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_gone(&self) {
        self.gone.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_conflicts(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_missing_preconditions(&self) {
        self.missing_preconditions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_adapter_failures(&self) {
        self.adapter_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Trust handshake

    pub fn increment_nonces_accepted(&self) {
        self.nonces_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_nonces_rejected(&self) {
        self.nonces_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            gone: self.gone.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            missing_preconditions: self.missing_preconditions.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            adapter_failures: self.adapter_failures.load(Ordering::Relaxed),
            nonces_accepted: self.nonces_accepted.load(Ordering::Relaxed),
            nonces_rejected: self.nonces_rejected.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub scans: u64,
    pub not_found: u64,
    pub gone: u64,
    pub conflicts: u64,
    pub missing_preconditions: u64,
    pub validation_failures: u64,
    pub adapter_failures: u64,
    pub nonces_accepted: u64,
    pub nonces_rejected: u64,
}

impl MetricsSnapshot {
    /// Writes that were refused for any reason
    pub fn refusals(&self) -> u64 {
        self.not_found
            + self.gone
            + self.conflicts
            + self.missing_preconditions
            + self.validation_failures
    }
}
