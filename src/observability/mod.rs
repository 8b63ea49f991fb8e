//! Observability subsystem for cinder
//!
//! - Structured logging (JSON, one line per event)
//! - Typed lifecycle events
//! - Lock-free counters
//!
//! Observability is read-only: nothing here influences planning or
//! execution, and a failed log write is dropped.
//!
//! # Usage
//!
//! ```ignore
//! use cinder::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::PlanIndexScan, &[("index", "IDX")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_index_scan_plans();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
