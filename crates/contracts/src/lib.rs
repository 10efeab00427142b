//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: the raw
//! value model decoders submit, output descriptors, typed payloads, the
//! decoder/host/callback traits and the session blueprint.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Sample model
//! - Every record covers a `(start, end)` sample range (`u64` offsets into the
//!   acquired signal)
//! - Ranges are passed through untouched; the router never reorders or merges them

mod args;
mod blueprint;
mod callback;
mod class_table;
mod decoder;
mod error;
mod instance_id;
mod output;
mod payload;
mod report;
mod value;

pub use args::{PutArgs, RegisterArgs};
pub use blueprint::*;
pub use callback::OutputCallback;
pub use class_table::{ClassInfo, ClassTable, ClassTableKind, DecoderType};
pub use decoder::{DecodeError, Decoder, OutputHost};
pub use error::*;
pub use instance_id::InstanceId;
pub use output::{MetaSpec, MetaType, OutputDescriptor, OutputKind};
pub use payload::*;
pub use report::{Consumer, Diagnostic, DispatchReport};
pub use value::Value;
