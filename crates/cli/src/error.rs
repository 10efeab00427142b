//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Trace file not found
    #[error("Trace file not found: {path}")]
    TraceNotFound { path: String },

    /// Malformed trace entry
    #[error("Invalid trace entry at line {line}: {message}")]
    TraceParse { line: usize, message: String },

    /// Session construction or start error
    #[error("Failed to set up decoder session: {message}")]
    Session { message: String },

    /// Replay aborted by --fail-fast
    #[error("Replay aborted at line {line}: {message}")]
    ReplayAborted { line: usize, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn trace_not_found(path: impl Into<String>) -> Self {
        Self::TraceNotFound { path: path.into() }
    }

    pub fn trace_parse(line: usize, message: impl Into<String>) -> Self {
        Self::TraceParse {
            line,
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    pub fn replay_aborted(line: usize, message: impl Into<String>) -> Self {
        Self::ReplayAborted {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
