//! Callback implementations
//!
//! Contains LogSink, FileSink, FnCallback and MemorySink.

mod file;
mod func;
mod log;
mod memory;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::func::FnCallback;
pub use self::log::LogSink;
pub use self::memory::{CapturedRecord, MemoryHandle, MemorySink};
