//! DecodeContext - the OutputHost handed to a running decoder

use contracts::{DispatchError, DispatchReport, InstanceId, MetaSpec, OutputHost, OutputKind, Value};

use crate::dispatcher::dispatch;
use crate::session::Session;

/// Host calls made by one instance at one stack depth
pub struct DecodeContext<'s> {
    session: &'s Session,
    index: usize,
    depth: usize,
}

impl<'s> DecodeContext<'s> {
    pub(crate) fn new(session: &'s Session, index: usize, depth: usize) -> Self {
        Self {
            session,
            index,
            depth,
        }
    }

    /// Number of instances on the call stack, this one included
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl OutputHost for DecodeContext<'_> {
    fn instance_id(&self) -> &InstanceId {
        &self.session.instance(self.index).id
    }

    fn register(
        &mut self,
        kind: OutputKind,
        proto_id: Option<&str>,
        meta: Option<MetaSpec>,
    ) -> Result<usize, DispatchError> {
        self.session
            .instance(self.index)
            .outputs
            .borrow_mut()
            .register(kind, proto_id, meta)
    }

    fn put(
        &mut self,
        start: u64,
        end: u64,
        channel: usize,
        value: &Value,
    ) -> Result<DispatchReport, DispatchError> {
        dispatch(self.session, self.index, self.depth, start, end, channel, value)
    }

    fn output_count(&self) -> usize {
        self.session.instance(self.index).outputs.borrow().len()
    }
}
