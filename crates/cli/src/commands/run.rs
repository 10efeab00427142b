//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::replay::{replay_file, ReplayOptions, ReplayStats};

/// Execute the `run` command
pub fn run_replay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let stats = execute(args)?;

    info!(
        entries = stats.entries,
        puts = stats.aggregator.total_puts,
        rejected = stats.aggregator.rejected,
        duration_secs = stats.duration.as_secs_f64(),
        "Replay completed"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&stats.to_json())
            .context("Failed to serialize replay report")?;
        println!("{}", json);
    } else {
        stats.print_summary();
    }
    Ok(())
}

/// Load, build, start, replay and flush
fn execute(args: &RunArgs) -> Result<ReplayStats> {
    let mut blueprint = super::load_blueprint(&args.config)?;

    if let Some(depth) = args.max_stack_depth {
        info!(max_stack_depth = depth, "Overriding max stack depth from CLI");
        blueprint.session.max_stack_depth = depth;
    }

    info!(
        decoder_types = blueprint.decoder_types.len(),
        instances = blueprint.instances.len(),
        callbacks = blueprint.callbacks.len(),
        "Configuration loaded"
    );

    let mut session =
        dispatcher::create_session(&blueprint).map_err(|e| CliError::session(e.to_string()))?;
    session
        .start()
        .map_err(|e| CliError::session(e.to_string()))?;

    info!(trace = %args.trace.display(), "Replaying trace");
    let options = ReplayOptions {
        max_entries: args.max_entries,
        fail_fast: args.fail_fast,
    };
    let result = replay_file(&session, &args.trace, options);

    // Flush whatever was delivered, even when the replay aborted
    session.flush_callbacks();
    Ok(result?)
}
