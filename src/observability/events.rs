//! Observable events
//!
//! Events are explicit and typed. Each one has a stable wire name and a
//! default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in cinder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Engine configuration loaded
    ConfigLoaded,

    // Planning
    /// Planner chose an index scan
    PlanIndexScan,
    /// Planner chose a table scan
    PlanTableScan,

    // Rebuild lifecycle
    /// Index rebuild started
    IndexRebuildBegin,
    /// Index rebuild finished
    IndexRebuildComplete,
    /// Index rebuild aborted
    IndexRebuildFailed,
    /// Index removed from its table
    IndexDropped,

    // Execution
    /// Scan returned no rows without touching storage
    ScanSkipped,
    /// Scan stopped on cancellation
    ScanCancelled,
    /// Scan stopped on a storage or evaluation error
    ScanFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::PlanIndexScan => "PLAN_INDEX_SCAN",
            Event::PlanTableScan => "PLAN_TABLE_SCAN",
            Event::IndexRebuildBegin => "INDEX_REBUILD_BEGIN",
            Event::IndexRebuildComplete => "INDEX_REBUILD_COMPLETE",
            Event::IndexRebuildFailed => "INDEX_REBUILD_FAILED",
            Event::IndexDropped => "INDEX_DROPPED",
            Event::ScanSkipped => "SCAN_SKIPPED",
            Event::ScanCancelled => "SCAN_CANCELLED",
            Event::ScanFailed => "SCAN_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::PlanIndexScan | Event::PlanTableScan | Event::ScanSkipped => Severity::Trace,
            Event::ScanCancelled => Severity::Warn,
            Event::IndexRebuildFailed | Event::ScanFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
