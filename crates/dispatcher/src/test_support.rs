//! Scriptable decoder used by unit tests

use std::cell::RefCell;
use std::rc::Rc;

use contracts::{
    DecodeError, Decoder, InstanceId, MetaSpec, MetaType, OutputHost, OutputKind, Value,
};

/// One decode call seen by a [`TestDecoder`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Received {
    pub instance: InstanceId,
    pub start: u64,
    pub end: u64,
    pub value: Value,
}

pub(crate) type ReceivedLog = Rc<RefCell<Vec<Received>>>;

pub(crate) struct TestDecoder {
    outputs: Vec<OutputKind>,
    fail_start: bool,
    fail_decode: Option<String>,
    relay: Option<usize>,
    log: ReceivedLog,
}

impl TestDecoder {
    /// Registers one output per kind at start; meta outputs are Int64
    pub fn new(outputs: &[OutputKind]) -> Self {
        Self {
            outputs: outputs.to_vec(),
            fail_start: false,
            fail_decode: None,
            relay: None,
            log: ReceivedLog::default(),
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_decode(mut self, message: &str) -> Self {
        self.fail_decode = Some(message.to_string());
        self
    }

    /// Re-emit every received payload on `channel`
    pub fn relay(mut self, channel: usize) -> Self {
        self.relay = Some(channel);
        self
    }

    /// Record decode calls into a shared log
    pub fn with_log(mut self, log: &ReceivedLog) -> Self {
        self.log = Rc::clone(log);
        self
    }

    pub fn boxed(self) -> Box<dyn Decoder> {
        Box::new(self)
    }
}

impl Decoder for TestDecoder {
    fn start(&mut self, host: &mut dyn OutputHost) -> Result<(), DecodeError> {
        if self.fail_start {
            return Err(DecodeError::failed("refusing to start"));
        }
        for &kind in &self.outputs {
            let meta = (kind == OutputKind::Meta)
                .then(|| MetaSpec::new(MetaType::Int64, "Count", "Event count"));
            host.register(kind, None, meta)?;
        }
        Ok(())
    }

    fn decode(
        &mut self,
        host: &mut dyn OutputHost,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), DecodeError> {
        self.log.borrow_mut().push(Received {
            instance: host.instance_id().clone(),
            start,
            end,
            value: payload.clone(),
        });
        if let Some(message) = &self.fail_decode {
            return Err(DecodeError::failed(message.clone()));
        }
        if let Some(channel) = self.relay {
            host.put(start, end, channel, payload)?;
        }
        Ok(())
    }
}
