//! Decoder Stack Example
//!
//! Demonstrates two ways of building a session:
//! 1. From a configuration file, with relay decoders and configured sinks
//! 2. By hand, with custom decoders and closure callbacks
//!
//! Run with: cargo run -p stack_demo [config_path]

use std::path::PathBuf;

use config_loader::ConfigLoader;
use contracts::{
    DecodeError, Decoder, DecoderType, MetaSpec, MetaType, OutputHost, OutputKind, OutputPayload,
    Value,
};
use dispatcher::{create_session, FnCallback, MemorySink, Session};
use observability::ReportAggregator;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Decoder Stack Demo");

    // ==== Stage 1: session from configuration ====
    let config_path = resolve_config_path();
    info!(path = %config_path.display(), "Loading config file");
    let blueprint = ConfigLoader::load_from_path(config_path.as_path())?;

    let mut session = create_session(&blueprint)?;
    session.start()?;

    let mut aggregator = ReportAggregator::new();
    let frame = Value::list([Value::Int(2), Value::list(["Frame: OK", "OK"])]);
    let puts = [
        (0, 0, 3, Value::Int(115_200)),
        (0, 80, 0, Value::list([Value::Int(0), Value::list(["RX: 0x4F", "4F"])])),
        (0, 80, 2, Value::list([Value::Int(0), Value::from(&b"O"[..])])),
        (0, 160, 1, frame),
    ];
    for (start, end, channel, value) in &puts {
        let report = session.put("uart", *start, *end, *channel, value)?;
        aggregator.update(&report, *start, *end);
    }
    session.flush_callbacks();
    println!("{}", aggregator.summary());

    // ==== Stage 2: hand-built stack ====
    let packets = MemorySink::new("packets");
    let captured = packets.handle();

    let mut session = Session::builder()
        .decoder_type(DecoderType::new("bits").with_annotations([("bit", "Bit")]))
        .decoder_type(
            DecoderType::new("bytes").with_annotations([("byte", "Byte"), ("field", "Field")]),
        )
        .instance("bits", "bits", Box::new(BitDecoder::default()))
        .instance("bytes", "bytes", Box::new(ByteDecoder::default()))
        .connect("bits", "bytes")
        .callback(
            OutputKind::Annotation,
            Box::new(FnCallback::new("printer", |record| {
                if let OutputPayload::Annotation(ann) = &record.payload {
                    println!(
                        "{:>6}-{:<6} {:<6} {}",
                        record.start,
                        record.end,
                        record.descriptor.owner,
                        ann.texts.first().map(String::as_str).unwrap_or("")
                    );
                }
            })),
        )
        .callback(OutputKind::Packet, Box::new(packets))
        .build()?;
    session.start()?;

    // "Hi" as MSB-first bit samples, 10 samples per bit
    let samples: Vec<u8> = b"Hi"
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1))
        .collect();
    session.decode("bits", 0, samples.len() as u64 * 10, &Value::from(samples.as_slice()))?;

    for record in captured.records() {
        info!(instance = %record.instance, payload = ?record.payload, "Captured packet");
    }
    let metrics = session.metrics().snapshot();
    info!(
        total_puts = metrics.total_puts(),
        forwards = metrics.forwards,
        delivered = metrics.delivered,
        "Demo complete"
    );
    Ok(())
}

fn resolve_config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/session.toml"))
}

/// One annotation per bit, forwards each completed byte
#[derive(Default)]
struct BitDecoder {
    annotation: usize,
    forward: usize,
    samplerate: usize,
}

impl Decoder for BitDecoder {
    fn start(&mut self, host: &mut dyn OutputHost) -> Result<(), DecodeError> {
        self.annotation = host.register(OutputKind::Annotation, None, None)?;
        self.forward = host.register(OutputKind::Forward, None, None)?;
        self.samplerate = host.register(
            OutputKind::Meta,
            Some("bits-samplerate"),
            Some(MetaSpec::new(MetaType::Int64, "Samplerate", "Samples per bit")),
        )?;
        Ok(())
    }

    fn decode(
        &mut self,
        host: &mut dyn OutputHost,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), DecodeError> {
        let bits = payload
            .as_bytes()
            .ok_or_else(|| DecodeError::failed("bit decoder expects bit samples"))?;
        host.put(start, end, self.samplerate, &Value::Int(10))?;

        for (n, chunk) in bits.chunks(8).enumerate() {
            let byte_start = start + n as u64 * 80;
            let mut byte = 0i64;
            for (i, bit) in chunk.iter().enumerate() {
                let s = byte_start + i as u64 * 10;
                let ann = Value::list([Value::Int(0), Value::list([bit.to_string()])]);
                host.put(s, s + 10, self.annotation, &ann)?;
                byte = (byte << 1) | i64::from(*bit);
            }
            host.put(byte_start, byte_start + 80, self.forward, &Value::Int(byte))?;
        }
        Ok(())
    }
}

/// Turns forwarded bytes into byte annotations and packet fields
#[derive(Default)]
struct ByteDecoder {
    annotation: usize,
    packet: usize,
    count: i64,
}

impl Decoder for ByteDecoder {
    fn start(&mut self, host: &mut dyn OutputHost) -> Result<(), DecodeError> {
        self.annotation = host.register(OutputKind::Annotation, None, None)?;
        self.packet = host.register(OutputKind::Packet, None, None)?;
        Ok(())
    }

    fn decode(
        &mut self,
        host: &mut dyn OutputHost,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), DecodeError> {
        let byte = payload
            .as_int()
            .ok_or_else(|| DecodeError::failed("byte decoder expects an int"))?;
        let text = format!("0x{byte:02X}");
        let texts = Value::list([format!("Byte: {text}"), text.clone()]);
        let ann = Value::list([Value::Int(0), texts]);
        host.put(start, end, self.annotation, &ann)?;

        let field = Value::list([
            Value::Int(1),
            Value::Int(1),
            Value::Int(self.count),
            Value::from("value"),
            Value::from(text),
        ]);
        host.put(start, end, self.packet, &field)?;
        self.count += 1;
        Ok(())
    }
}
