use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the handle, the worker and the courier.
#[derive(Debug, Default)]
pub(crate) struct ShipperStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
    delivered_batches: AtomicU64,
    failed_batches: AtomicU64,
}

impl ShipperStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered_batches: self.delivered_batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a shipper's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Entries received by the worker.
    pub accepted: u64,
    /// Entries discarded by the buffer limit.
    pub dropped: u64,
    /// Batches acknowledged with a 2xx status.
    pub delivered_batches: u64,
    /// Batches lost to an HTTP or transport failure.
    pub failed_batches: u64,
}
