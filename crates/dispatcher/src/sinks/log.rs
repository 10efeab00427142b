//! LogSink - logs record summaries via tracing

use contracts::{ContractError, OutputCallback, OutputPayload, OutputRecord};
use tracing::{info, instrument};

/// Callback that logs record summaries for debugging
pub struct LogSink {
    name: String,
    records: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: 0,
        }
    }

    /// Records logged so far
    pub fn records(&self) -> u64 {
        self.records
    }

    fn summary(payload: &OutputPayload<'_>) -> String {
        match payload {
            OutputPayload::Annotation(a) => format!("class={} texts={:?}", a.class_index, a.texts),
            OutputPayload::Forward(v) => format!("value={}", v.type_name()),
            OutputPayload::Binary(b) => format!("class={} bytes={}", b.class_index, b.bytes.len()),
            OutputPayload::Meta(m) => format!("value={m:?}"),
            OutputPayload::Packet(p) => format!(
                "class={} subtype={:?} packet={}",
                p.class_index(),
                p.subtype(),
                p.packet_num()
            ),
        }
    }
}

impl OutputCallback for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_deliver",
        skip(self, record),
        fields(sink = %self.name, kind = %record.descriptor.kind)
    )]
    fn deliver(&mut self, record: &OutputRecord<'_>) -> Result<(), ContractError> {
        self.records += 1;
        info!(
            sink = %self.name,
            instance = %record.descriptor.owner,
            proto_id = %record.descriptor.proto_id,
            output_id = record.descriptor.id,
            start = record.start,
            end = record.end,
            summary = %Self::summary(&record.payload),
            "Output record"
        );
        Ok(())
    }
}
