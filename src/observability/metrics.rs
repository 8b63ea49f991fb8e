//! Metrics registry for cinder
//!
//! - Counters only, monotonic
//! - Thread-safe, lock-free (Relaxed ordering; exactness across threads is
//!   eventual)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for planning, scanning and rebuilds
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    index_scan_plans: AtomicU64,
    table_scan_plans: AtomicU64,
    rebuild_fallbacks: AtomicU64,
    scans_started: AtomicU64,
    scans_skipped: AtomicU64,
    scans_cancelled: AtomicU64,
    scans_failed: AtomicU64,
    rows_scanned: AtomicU64,
    rows_filtered: AtomicU64,
    rows_returned: AtomicU64,
    rebuilds_started: AtomicU64,
    rebuilds_completed: AtomicU64,
    rebuilds_failed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Planning

    pub fn increment_index_scan_plans(&self) {
        self.index_scan_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_table_scan_plans(&self) {
        self.table_scan_plans.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts table scans chosen only because a rebuild was running
    pub fn increment_rebuild_fallbacks(&self) {
        self.rebuild_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    // Scans

    pub fn increment_scans_started(&self) {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans_skipped(&self) {
        self.scans_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans_cancelled(&self) {
        self.scans_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans_failed(&self) {
        self.scans_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_scanned(&self) {
        self.rows_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_filtered(&self) {
        self.rows_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_returned(&self) {
        self.rows_returned.fetch_add(1, Ordering::Relaxed);
    }

    // Rebuilds

    pub fn increment_rebuilds_started(&self) {
        self.rebuilds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rebuilds_completed(&self) {
        self.rebuilds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rebuilds_failed(&self) {
        self.rebuilds_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            index_scan_plans: self.index_scan_plans.load(Ordering::Relaxed),
            table_scan_plans: self.table_scan_plans.load(Ordering::Relaxed),
            rebuild_fallbacks: self.rebuild_fallbacks.load(Ordering::Relaxed),
            scans_started: self.scans_started.load(Ordering::Relaxed),
            scans_skipped: self.scans_skipped.load(Ordering::Relaxed),
            scans_cancelled: self.scans_cancelled.load(Ordering::Relaxed),
            scans_failed: self.scans_failed.load(Ordering::Relaxed),
            rows_scanned: self.rows_scanned.load(Ordering::Relaxed),
            rows_filtered: self.rows_filtered.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            rebuilds_started: self.rebuilds_started.load(Ordering::Relaxed),
            rebuilds_completed: self.rebuilds_completed.load(Ordering::Relaxed),
            rebuilds_failed: self.rebuilds_failed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub index_scan_plans: u64,
    pub table_scan_plans: u64,
    pub rebuild_fallbacks: u64,
    pub scans_started: u64,
    pub scans_skipped: u64,
    pub scans_cancelled: u64,
    pub scans_failed: u64,
    pub rows_scanned: u64,
    pub rows_filtered: u64,
    pub rows_returned: u64,
    pub rebuilds_started: u64,
    pub rebuilds_completed: u64,
    pub rebuilds_failed: u64,
}

impl MetricsSnapshot {
    /// Serializes as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increments() {
        let metrics = MetricsRegistry::new();
        metrics.increment_index_scan_plans();
        metrics.increment_table_scan_plans();
        metrics.increment_table_scan_plans();
        metrics.increment_rows_returned();

        let snap = metrics.snapshot();
        assert_eq!(snap.index_scan_plans, 1);
        assert_eq!(snap.table_scan_plans, 2);
        assert_eq!(snap.rows_returned, 1);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.increment_rows_scanned();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().rows_scanned, 4000);
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = MetricsRegistry::new();
        metrics.increment_rebuilds_started();
        let parsed: serde_json::Value = serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert_eq!(parsed["rebuilds_started"], 1);
    }
}
