//! Trace replay through a started session.

mod stats;
mod trace;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use dispatcher::{Session, SessionError};
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};

pub use stats::ReplayStats;
pub use trace::{TraceEntry, TraceOp, TraceReader};

/// Replay options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Stop after this many entries (0 = unlimited)
    pub max_entries: u64,
    /// Abort on the first rejected put or failed decode
    pub fail_fast: bool,
}

/// Replay the trace file at `path`
pub fn replay_file(
    session: &Session,
    path: &Path,
    options: ReplayOptions,
) -> Result<ReplayStats> {
    if !path.exists() {
        return Err(CliError::trace_not_found(path.display().to_string()));
    }
    let reader = BufReader::new(File::open(path)?);
    replay(session, TraceReader::new(reader), options)
}

/// Replay parsed trace entries
///
/// Rejected puts and failed decodes are counted and logged; with
/// `fail_fast` the first one ends the replay with an error.
pub fn replay<I>(session: &Session, entries: I, options: ReplayOptions) -> Result<ReplayStats>
where
    I: IntoIterator<Item = Result<(usize, TraceEntry)>>,
{
    let mut stats = ReplayStats::default();
    let started = Instant::now();

    for item in entries {
        if options.max_entries > 0 && stats.entries >= options.max_entries {
            info!(max_entries = options.max_entries, "Entry limit reached");
            break;
        }
        let (line, entry) = item?;
        stats.entries += 1;

        match entry.op {
            TraceOp::Put => {
                let args = entry.put_args(line)?;
                match session.put_args(&entry.instance, &args) {
                    Ok(report) => {
                        debug!(
                            line,
                            instance = %entry.instance,
                            kind = %report.kind,
                            delivered = report.delivered,
                            forwarded = report.forwarded.len(),
                            "Put dispatched"
                        );
                        // put_args accepted the range, so both bounds are non-negative
                        let (start, end) = entry.sample_range(line)?;
                        stats.aggregator.update(&report, start, end);
                    }
                    Err(e) => {
                        stats.aggregator.reject();
                        reject(line, &entry, &e, options)?;
                    }
                }
            }
            TraceOp::Decode => {
                let (start, end) = entry.sample_range(line)?;
                stats.decodes += 1;
                if let Err(e) = session.decode(&entry.instance, start, end, &entry.value) {
                    stats.failed_decodes += 1;
                    reject(line, &entry, &e, options)?;
                }
            }
        }
    }

    stats.duration = started.elapsed();
    stats.metrics = session.metrics().snapshot();
    Ok(stats)
}

fn reject(
    line: usize,
    entry: &TraceEntry,
    error: &SessionError,
    options: ReplayOptions,
) -> Result<()> {
    warn!(
        line,
        instance = %entry.instance,
        op = ?entry.op,
        error = %error,
        "Trace entry rejected"
    );
    if options.fail_fast {
        return Err(CliError::replay_aborted(line, error.to_string()));
    }
    Ok(())
}
