//! RelayDecoder - config-driven decoder logic
//!
//! Registers the outputs listed in its [`InstanceConfig`] and, when a relay
//! channel is set, re-emits every payload it receives on that channel. This
//! is enough to describe a whole stack in configuration and replay traces
//! through it.

use contracts::{
    DecodeError, Decoder, InstanceConfig, MetaSpec, MetaType, OutputConfig, OutputHost, Value,
};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct RelayDecoder {
    outputs: Vec<OutputConfig>,
    relay: Option<usize>,
    received: u64,
}

impl RelayDecoder {
    pub fn new(outputs: Vec<OutputConfig>, relay: Option<usize>) -> Self {
        Self {
            outputs,
            relay,
            received: 0,
        }
    }

    pub fn from_config(config: &InstanceConfig) -> Self {
        Self::new(config.outputs.clone(), config.relay)
    }

    /// Payloads received so far
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl Decoder for RelayDecoder {
    fn start(&mut self, host: &mut dyn OutputHost) -> Result<(), DecodeError> {
        for output in &self.outputs {
            let meta = match &output.meta {
                Some(meta) => Some(MetaSpec::new(
                    MetaType::from_name(&meta.meta_type)?,
                    meta.name.clone(),
                    meta.description.clone(),
                )),
                None => None,
            };
            host.register(output.kind, output.proto_id.as_deref(), meta)?;
        }
        debug!(
            instance = %host.instance_id(),
            outputs = self.outputs.len(),
            relay = ?self.relay,
            "Relay decoder started"
        );
        Ok(())
    }

    fn decode(
        &mut self,
        host: &mut dyn OutputHost,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), DecodeError> {
        self.received += 1;
        trace!(
            instance = %host.instance_id(),
            start,
            end,
            payload = payload.type_name(),
            "Relay received payload"
        );
        if let Some(channel) = self.relay {
            host.put(start, end, channel, payload)?;
        }
        Ok(())
    }
}
