use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Counters of a single run, shared between the worker and the scheduler.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub ticks: AtomicU64,
    pub samples_written: AtomicU64,
    pub read_failures: AtomicU64,
    pub write_failures: AtomicU64,
    pub snapshots_captured: AtomicU64,
    pub snapshot_failures: AtomicU64,
}

impl Counters {
    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, started_at: DateTime<Utc>) -> RunStats {
        RunStats {
            started_at,
            ticks: self.ticks.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            snapshots_captured: self.snapshots_captured.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a run's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub ticks: u64,
    pub samples_written: u64,
    pub read_failures: u64,
    pub write_failures: u64,
    /// Includes dumps whose final permission change failed.
    pub snapshots_captured: u64,
    pub snapshot_failures: u64,
}
