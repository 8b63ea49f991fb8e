//! Index availability tracking
//!
//! One flag per table records whether an index rebuild is running. The
//! planner reads it once per planning call; the rebuild job is the only
//! writer. Readers may observe a stale value: a plan chosen just before a
//! rebuild starts still executes against the index storage snapshot it
//! opens, so the flag only steers plan choice and never guards data.

use std::sync::atomic::{AtomicBool, Ordering};

/// Rebuild-in-progress flag
#[derive(Debug, Default)]
pub struct RebuildFlag {
    rebuilding: AtomicBool,
}

impl RebuildFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a rebuild is running
    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::Acquire)
    }

    /// Sets the flag
    pub fn set_rebuilding(&self, rebuilding: bool) {
        self.rebuilding.store(rebuilding, Ordering::Release);
    }

    /// Marks a rebuild as started.
    ///
    /// The returned guard clears the flag when dropped, including on early
    /// return and panic unwind.
    pub fn begin(&self) -> RebuildGuard<'_> {
        self.set_rebuilding(true);
        RebuildGuard { flag: self }
    }
}

/// Clears the rebuild flag on drop
#[must_use = "dropping the guard immediately ends the rebuild"]
#[derive(Debug)]
pub struct RebuildGuard<'a> {
    flag: &'a RebuildFlag,
}

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        self.flag.set_rebuilding(false);
    }
}
