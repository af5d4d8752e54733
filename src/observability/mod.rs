//! Observability subsystem
//!
//! This module provides:
//! - Structured logging (JSON, one line per event)
//! - Per-store operation counters
//! - Typed lifecycle and operation events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aerodoc::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::DocumentCreated, &[("uri", "/items/abc")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_creates();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

#[cfg(test)]
pub(crate) use logger::capture_log;

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event at its own severity, with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::StoreOpen);
        log_event_with_fields(Event::WriteRejected, &[("uri", "/items/a")]);
    }

    #[test]
    fn test_event_line_uses_event_name() {
        let line = capture_log(Event::NonceRejected.severity(), Event::NonceRejected.as_str(), &[]);
        assert!(line.contains("\"event\":\"NONCE_REJECTED\""));
        assert!(line.contains("\"severity\":\"WARN\""));
    }
}
