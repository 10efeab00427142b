//! Replay statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::{ReportAggregator, ReportSummary};
use serde::Serialize;

/// Counters collected while replaying a trace
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub entries: u64,
    pub decodes: u64,
    pub failed_decodes: u64,
    pub aggregator: ReportAggregator,
    pub duration: Duration,
    pub metrics: MetricsSnapshot,
}

impl ReplayStats {
    pub fn summary(&self) -> ReportSummary {
        self.aggregator.summary()
    }

    /// Entries replayed per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.entries as f64 / secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("{}", self.summary());
        println!("=== Replay ===");
        println!("Trace entries: {}", self.entries);
        println!(
            "Decode calls: {} ({} failed)",
            self.decodes, self.failed_decodes
        );
        println!("Conversion failures: {}", self.metrics.conversion_failures);
        println!("Callback failures: {}", self.metrics.callback_failures);
        println!(
            "Duration: {:.3}s ({:.0} entries/s)",
            self.duration.as_secs_f64(),
            self.throughput()
        );
    }

    pub fn to_json(&self) -> ReplayReport {
        let summary = self.summary();
        ReplayReport {
            entries: self.entries,
            decodes: self.decodes,
            failed_decodes: self.failed_decodes,
            total_puts: summary.total_puts,
            puts_by_kind: summary
                .puts_by_kind
                .iter()
                .map(|(kind, n)| (kind.as_str(), *n))
                .collect(),
            rejected: summary.rejected,
            delivered: summary.delivered,
            forwarded: summary.forwarded,
            diagnostics: summary.diagnostics,
            conversion_failures: self.metrics.conversion_failures,
            callback_failures: self.metrics.callback_failures,
            downstream_failures: self.metrics.downstream_failures,
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}

/// JSON form of a finished replay
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub entries: u64,
    pub decodes: u64,
    pub failed_decodes: u64,
    pub total_puts: u64,
    pub puts_by_kind: Vec<(&'static str, u64)>,
    pub rejected: u64,
    pub delivered: u64,
    pub forwarded: u64,
    pub diagnostics: u64,
    pub conversion_failures: u64,
    pub callback_failures: u64,
    pub downstream_failures: u64,
    pub duration_ms: u64,
}
