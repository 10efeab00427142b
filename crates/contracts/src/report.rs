//! DispatchReport - what one `put` call did

use std::fmt;

use crate::{DispatchError, InstanceId, OutputKind};

/// Consumer a diagnostic refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consumer {
    /// The session-wide handler for an output kind
    Callback(OutputKind),
    /// A downstream instance's decode entry point
    Downstream(InstanceId),
}

/// A soft failure that skipped one consumer
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Instance the message is attributed to
    pub instance: InstanceId,
    pub consumer: Consumer,
    pub message: String,
    /// Dispatch error behind the failure, when there is one
    pub error: Option<DispatchError>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.instance, self.message)
    }
}

/// Outcome of a successful `put`
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub instance: InstanceId,
    pub kind: OutputKind,
    /// The kind's callback ran and accepted the record
    pub delivered: bool,
    /// Downstream instances whose decode entry point was invoked, in stack order
    pub forwarded: Vec<InstanceId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DispatchReport {
    pub fn new(instance: InstanceId, kind: OutputKind) -> Self {
        Self {
            instance,
            kind,
            delivered: false,
            forwarded: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// No consumer was skipped
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// First dispatch error recorded, if any
    pub fn first_error(&self) -> Option<&DispatchError> {
        self.diagnostics.iter().find_map(|d| d.error.as_ref())
    }
}
