//! # Dispatcher
//!
//! Output routing for a stack of decoder instances.
//!
//! Responsibilities:
//! - per-instance output registries (`register`)
//! - payload conversion for the kind-specific callbacks
//! - routing every `put` to downstream instances and the host callback
//! - isolating bad records and failing decoders from the rest of the stack

pub mod callbacks;
pub mod context;
pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod registry;
pub mod relay;
pub mod session;
pub mod sinks;

#[cfg(test)]
mod test_support;

pub use callbacks::CallbackRegistry;
pub use context::DecodeContext;
pub use contracts::{Decoder, DispatchReport, OutputCallback, OutputHost};
pub use error::SessionError;
pub use factory::{create_callback, create_session};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use registry::OutputRegistry;
pub use relay::RelayDecoder;
pub use session::{Session, SessionBuilder};
pub use sinks::{CapturedRecord, FileSink, FnCallback, LogSink, MemoryHandle, MemorySink};
