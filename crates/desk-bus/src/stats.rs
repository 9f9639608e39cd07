//! Counters for bus activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters updated by the dispatcher.
#[derive(Debug, Default)]
pub struct BusStats {
    /// Dispatch passes run (internal and inbound).
    pub dispatches: AtomicU64,
    /// Handler invocations (one per matching handler per pass).
    pub handler_invocations: AtomicU64,
    /// Callbacks or reply functions that failed.
    pub handler_failures: AtomicU64,
    /// Passes that found no handler.
    pub unknown_channels: AtomicU64,
    /// Envelopes pushed on `<channel>-reply`.
    pub deferred_replies: AtomicU64,
    /// Successful per-window broadcast deliveries.
    pub broadcast_deliveries: AtomicU64,
    /// Broadcast targets that had already closed.
    pub closed_windows_skipped: AtomicU64,
}

impl BusStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            unknown_channels: self.unknown_channels.load(Ordering::Relaxed),
            deferred_replies: self.deferred_replies.load(Ordering::Relaxed),
            broadcast_deliveries: self.broadcast_deliveries.load(Ordering::Relaxed),
            closed_windows_skipped: self.closed_windows_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BusStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStatsSnapshot {
    pub dispatches: u64,
    pub handler_invocations: u64,
    pub handler_failures: u64,
    pub unknown_channels: u64,
    pub deferred_replies: u64,
    pub broadcast_deliveries: u64,
    pub closed_windows_skipped: u64,
}
