//! Layered error definitions
//!
//! Categorized by source: config / callback / dispatch

use thiserror::Error;

use crate::ClassTableKind;

/// Unified error type for configuration and host-side plumbing
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Callback Errors =====
    /// Callback write error
    #[error("callback '{callback}' write error: {message}")]
    CallbackWrite { callback: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create callback write error
    pub fn callback_write(callback: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallbackWrite {
            callback: callback.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while registering outputs or routing a `put`.
///
/// `MalformedCallArguments`, `UnknownOutputChannel` and `AllocationFailure` abort the
/// call that raised them. Everything else is soft: the affected consumer is skipped
/// and the call still succeeds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// Wrong arity or argument types on a dynamic host call
    #[error("malformed call arguments: {message}")]
    MalformedCallArguments { message: String },

    /// Channel id does not name a registered output
    #[error("invalid output ID {channel} ({registered} outputs registered)")]
    UnknownOutputChannel { channel: i64, registered: usize },

    /// Class index not declared by the decoder type
    #[error("submitted data to unregistered {table} class {class}")]
    UnregisteredClass { table: ClassTableKind, class: i64 },

    /// Payload shape or primitive kind does not match what the output expects
    #[error("{context}: expected {expected}, got {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Binary output submitted with no bytes
    #[error("binary output submitted with empty data set")]
    EmptyBinaryPayload,

    /// Packet subtype unknown or element count wrong for the subtype
    ///
    /// `subtype` is -1 when the list is too short to hold one.
    #[error("invalid packet subtype {subtype} with {len} elements")]
    InvalidPacketSubtype { subtype: i64, len: usize },

    /// Meta output declared with a type other than int64/double
    #[error("unsupported meta type '{type_name}'")]
    UnsupportedMetaType { type_name: String },

    /// Owned buffer could not be allocated
    #[error("out of memory: failed to allocate {requested} bytes")]
    AllocationFailure { requested: usize },
}

impl DispatchError {
    /// Create a malformed-arguments error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCallArguments {
            message: message.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        context: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    /// Whether this error aborts the whole host call
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedCallArguments { .. }
                | Self::UnknownOutputChannel { .. }
                | Self::AllocationFailure { .. }
        )
    }

    /// Stable short code, used as a metrics label
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedCallArguments { .. } => "malformed_call_arguments",
            Self::UnknownOutputChannel { .. } => "unknown_output_channel",
            Self::UnregisteredClass { .. } => "unregistered_class",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::EmptyBinaryPayload => "empty_binary_payload",
            Self::InvalidPacketSubtype { .. } => "invalid_packet_subtype",
            Self::UnsupportedMetaType { .. } => "unsupported_meta_type",
            Self::AllocationFailure { .. } => "allocation_failure",
        }
    }
}
