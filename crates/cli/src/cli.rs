//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// srd-router - replay decoder output through a configured decoder stack
#[derive(Parser, Debug)]
#[command(
    name = "srd-router",
    author,
    version,
    about = "Decoder stack output router",
    long_about = "Builds a decoder stack from configuration, registers each instance's \n\
                  outputs, and replays a JSON-lines trace of put/decode calls through \n\
                  the router, delivering records to the configured callbacks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SRD_ROUTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SRD_ROUTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level from -v/-q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a trace through the configured decoder stack
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "session.toml",
        env = "SRD_ROUTER_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON-lines trace of put/decode calls
    #[arg(short, long, env = "SRD_ROUTER_TRACE")]
    pub trace: PathBuf,

    /// Maximum number of trace entries to replay (0 = unlimited)
    #[arg(long, default_value = "0", env = "SRD_ROUTER_MAX_ENTRIES")]
    pub max_entries: u64,

    /// Stop at the first rejected put or failed decode
    #[arg(long)]
    pub fail_fast: bool,

    /// Override session.max_stack_depth from configuration
    #[arg(long)]
    pub max_stack_depth: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show declared output channels per instance
    #[arg(long)]
    pub outputs: bool,

    /// Show class tables per decoder type
    #[arg(long)]
    pub classes: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "srd-router",
            "-vv",
            "run",
            "-c",
            "stack.toml",
            "-t",
            "trace.jsonl",
            "--fail-fast",
        ]);
        assert_eq!(cli.log_level(), "trace");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("stack.toml"));
                assert_eq!(args.trace, PathBuf::from("trace.jsonl"));
                assert!(args.fail_fast);
                assert_eq!(args.max_entries, 0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["srd-router", "-q", "-v", "validate"]).is_err());
        let cli = Cli::parse_from(["srd-router", "-q", "validate"]);
        assert_eq!(cli.log_level(), "warn");
    }
}
