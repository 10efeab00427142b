//! Decoder and OutputHost traits - the seam between decoding logic and the router

use thiserror::Error;

use crate::{
    DispatchError, DispatchReport, InstanceId, MetaSpec, MetaType, OutputKind, PutArgs,
    RegisterArgs, Value,
};

/// Failure raised by decoding logic
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A host call made by the decoder failed fatally
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Decoder-specific failure
    #[error("decode failed: {message}")]
    Failed { message: String },

    /// Instance entered again while its own decode was still running
    #[error("instance {instance} is already decoding")]
    Reentrant { instance: InstanceId },

    /// Forwarding would exceed the configured stack depth
    #[error("stack depth {depth} exceeds maximum {max}")]
    DepthExceeded { depth: usize, max: usize },
}

impl DecodeError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        match self {
            Self::Dispatch(e) => Some(e),
            _ => None,
        }
    }

    /// Stable short code, used as a metrics label
    pub fn code(&self) -> &'static str {
        match self {
            Self::Dispatch(e) => e.code(),
            Self::Failed { .. } => "decode_failed",
            Self::Reentrant { .. } => "reentrant",
            Self::DepthExceeded { .. } => "depth_exceeded",
        }
    }
}

/// Host API available to a decoder while it runs
pub trait OutputHost {
    /// Id of the instance this host call acts for
    fn instance_id(&self) -> &InstanceId;

    /// Declare a new output channel and return its id
    ///
    /// `proto_id` defaults to the instance id. `meta` is required for
    /// [`OutputKind::Meta`] and ignored otherwise.
    fn register(
        &mut self,
        kind: OutputKind,
        proto_id: Option<&str>,
        meta: Option<MetaSpec>,
    ) -> Result<usize, DispatchError>;

    /// Submit a value on a registered channel
    fn put(
        &mut self,
        start: u64,
        end: u64,
        channel: usize,
        value: &Value,
    ) -> Result<DispatchReport, DispatchError>;

    /// Number of channels registered so far
    fn output_count(&self) -> usize;

    /// `register` with untyped arguments: `[kind, proto_id?, [type, name, descr]?]`
    fn register_args(&mut self, args: &[Value]) -> Result<usize, DispatchError> {
        let parsed = RegisterArgs::parse(args)?;
        let meta = match parsed.meta {
            Some((type_name, name, description)) => Some(MetaSpec::new(
                MetaType::from_name(&type_name)?,
                name,
                description,
            )),
            None => None,
        };
        self.register(parsed.kind, parsed.proto_id.as_deref(), meta)
    }

    /// `put` with untyped arguments: `[start, end, channel, value]`
    fn put_args(&mut self, args: &[Value]) -> Result<DispatchReport, DispatchError> {
        let parsed = PutArgs::parse(args)?;
        let channel =
            usize::try_from(parsed.channel).map_err(|_| DispatchError::UnknownOutputChannel {
                channel: parsed.channel,
                registered: self.output_count(),
            })?;
        self.put(parsed.start, parsed.end, channel, parsed.value)
    }
}

/// Decoding logic hosted by a session
///
/// `start` runs once before any sample data arrives and is where outputs are
/// registered. `decode` receives everything forwarded by the instance below.
pub trait Decoder {
    fn start(&mut self, host: &mut dyn OutputHost) -> Result<(), DecodeError>;

    fn decode(
        &mut self,
        host: &mut dyn OutputHost,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), DecodeError>;
}
