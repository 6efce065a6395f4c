//! Shared counters for one enumeration pass.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters updated by every worker and read by the status reporter. The
/// dispatcher resets them at the start of each domain, so reported figures
/// are always per-domain.
#[derive(Debug, Default)]
pub struct RunStatistics {
    processed: AtomicUsize,
    unreachable: AtomicUsize,
    timed_out: AtomicUsize,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.processed.store(0, Ordering::SeqCst);
        self.unreachable.store(0, Ordering::SeqCst);
        self.timed_out.store(0, Ordering::SeqCst);
    }

    /// Every dequeued entry counts exactly once, whether or not it
    /// resolved or any collector ran.
    pub fn entry_processed(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn host_unreachable(&self) {
        self.unreachable.fetch_add(1, Ordering::SeqCst);
    }

    pub fn host_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::SeqCst);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn unreachable(&self) -> usize {
        self.unreachable.load(Ordering::SeqCst)
    }

    pub fn timed_out(&self) -> usize {
        self.timed_out.load(Ordering::SeqCst)
    }
}
