//! Pipeline counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared pipeline counters, updated lock-free from both contexts
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Raw samples read from the source
    pub samples_acquired: AtomicU64,
    /// Windows handed off to the processing context
    pub windows_emitted: AtomicU64,
    /// Windows classified and published
    pub windows_processed: AtomicU64,
    /// Windows overwritten in the hand-off queue before being received
    pub windows_dropped: AtomicU64,
    /// Windows received but not published (classification or ordering fault)
    pub windows_skipped: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sample(&self) {
        self.samples_acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_emitted(&self) {
        self.windows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_processed(&self) {
        self.windows_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_windows_dropped(&self, count: u64) {
        self.windows_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_window_skipped(&self) {
        self.windows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_acquired: self.samples_acquired.load(Ordering::Relaxed),
            windows_emitted: self.windows_emitted.load(Ordering::Relaxed),
            windows_processed: self.windows_processed.load(Ordering::Relaxed),
            windows_dropped: self.windows_dropped.load(Ordering::Relaxed),
            windows_skipped: self.windows_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of the counters for logging and inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_acquired: u64,
    pub windows_emitted: u64,
    pub windows_processed: u64,
    pub windows_dropped: u64,
    pub windows_skipped: u64,
}
