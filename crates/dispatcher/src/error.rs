//! Dispatcher error types

use thiserror::Error;

use contracts::{DecodeError, DispatchError};

/// Session build and host-call errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Instance id used twice
    #[error("duplicate instance '{instance}'")]
    DuplicateInstance { instance: String },

    /// Decoder type id used twice
    #[error("duplicate decoder type '{decoder_type}'")]
    DuplicateDecoderType { decoder_type: String },

    /// Instance refers to an undeclared decoder type
    #[error("instance '{instance}' uses unknown decoder type '{decoder_type}'")]
    UnknownDecoderType {
        instance: String,
        decoder_type: String,
    },

    /// Instance id not part of the session
    #[error("unknown instance '{instance}'")]
    UnknownInstance { instance: String },

    /// Same stack edge declared twice
    #[error("'{downstream}' is already stacked on '{upstream}'")]
    DuplicateStackEdge {
        upstream: String,
        downstream: String,
    },

    /// Stack edge would create a loop
    #[error("stacking '{downstream}' on '{upstream}' creates a cycle")]
    StackCycle {
        upstream: String,
        downstream: String,
    },

    /// Longest instance chain exceeds the configured maximum
    #[error("decoder stack depth {depth} exceeds maximum {max}")]
    StackTooDeep { depth: usize, max: usize },

    /// Decoder start failed
    #[error("instance '{instance}' failed to start: {source}")]
    Start {
        instance: String,
        #[source]
        source: DecodeError,
    },

    /// Callback sink creation error
    #[error("failed to create callback sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Host call rejected
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Host-driven decode failed
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl SessionError {
    pub fn unknown_instance(instance: impl Into<String>) -> Self {
        Self::UnknownInstance {
            instance: instance.into(),
        }
    }

    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
