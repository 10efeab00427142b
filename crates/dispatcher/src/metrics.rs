//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::OutputKind;

/// Counters for one session
///
/// The session is single-threaded, but the counters are atomic so a host
/// can read them through a shared handle from anywhere.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Accepted `put` calls, by kind
    puts: [AtomicU64; 5],
    /// `put` calls aborted with a fatal error
    rejected: AtomicU64,
    /// Payloads that failed conversion for a handler
    conversion_failures: AtomicU64,
    /// Records accepted by a handler
    delivered: AtomicU64,
    /// Records a handler returned an error for
    callback_failures: AtomicU64,
    /// Downstream decode calls that returned normally
    forwards: AtomicU64,
    /// Downstream decode calls that failed
    downstream_failures: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self, kind: OutputKind) -> u64 {
        self.puts[kind.index()].load(Ordering::Relaxed)
    }

    pub fn inc_put(&self, kind: OutputKind) {
        self.puts[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conversion_failures(&self) {
        self.conversion_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_callback_failures(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forwards(&self) {
        self.forwards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_downstream_failures(&self) {
        self.downstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            puts: OutputKind::ALL.map(|k| self.put_count(k)),
            rejected: self.rejected.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            forwards: self.forwards.load(Ordering::Relaxed),
            downstream_failures: self.downstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Indexed by [`OutputKind::index`]
    pub puts: [u64; 5],
    pub rejected: u64,
    pub conversion_failures: u64,
    pub delivered: u64,
    pub callback_failures: u64,
    pub forwards: u64,
    pub downstream_failures: u64,
}

impl MetricsSnapshot {
    pub fn puts_of(&self, kind: OutputKind) -> u64 {
        self.puts[kind.index()]
    }

    pub fn total_puts(&self) -> u64 {
        self.puts.iter().sum()
    }
}
