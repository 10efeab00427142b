//! Decoders used by the end-to-end tests

use contracts::{DecodeError, Decoder, MetaSpec, MetaType, OutputHost, OutputKind, Value};

pub const UART_FORWARD: usize = 2;
pub const UART_META: usize = 3;

/// Byte-level decoder: one annotation, binary dump and forward per byte,
/// then a byte count on its meta channel
#[derive(Default)]
pub struct UartDecoder {
    annotation: usize,
    binary: usize,
    forward: usize,
    meta: usize,
}

impl Decoder for UartDecoder {
    fn start(&mut self, host: &mut dyn OutputHost) -> Result<(), DecodeError> {
        self.annotation = host.register(OutputKind::Annotation, None, None)?;
        self.binary = host.register(OutputKind::Binary, None, None)?;
        self.forward = host.register(OutputKind::Forward, None, None)?;
        self.meta = host.register(
            OutputKind::Meta,
            None,
            Some(MetaSpec::new(MetaType::Int64, "Bytes", "Bytes decoded")),
        )?;
        debug_assert_eq!((self.forward, self.meta), (UART_FORWARD, UART_META));
        Ok(())
    }

    fn decode(
        &mut self,
        host: &mut dyn OutputHost,
        start: u64,
        end: u64,
        payload: &Value,
    ) -> Result<(), DecodeError> {
        let bytes = payload
            .as_bytes()
            .ok_or_else(|| DecodeError::failed("uart decoder expects bytes"))?;

        for (i, byte) in bytes.iter().enumerate() {
            let s = start + i as u64 * 10;
            let e = s + 10;
            let texts = Value::list([format!("0x{byte:02X}"), format!("{byte:02X}")]);
            host.put(s, e, self.annotation, &Value::list([Value::Int(0), texts]))?;
            let dump = Value::list([Value::Int(0), Value::from(&[*byte][..])]);
            host.put(s, e, self.binary, &dump)?;
            host.put(s, e, self.forward, &Value::Int(i64::from(*byte)))?;
        }
        host.put(start, end, self.meta, &Value::Int(bytes.len() as i64))?;
        Ok(())
    }
}

/// Assembles forwarded bytes into lines
#[derive(Default)]
pub struct LineDecoder {
    annotation: usize,
    packet: usize,
    line: String,
    packets: i64,
}

impl Decoder for LineDecoder {
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
            .and_then(|b| u8::try_from(b).ok())
            .ok_or_else(|| DecodeError::failed("line decoder expects a byte"))?;

        if byte != b'\n' {
            self.line.push(char::from(byte));
            return Ok(());
        }

        let line = std::mem::take(&mut self.line);
        if !line.is_empty() {
            let texts = Value::list([line.as_str()]);
            host.put(start, end, self.annotation, &Value::list([Value::Int(0), texts]))?;
        }
        let field = Value::list([
            Value::Int(1),
            Value::Int(1),
            Value::Int(self.packets),
            Value::from("text"),
            Value::from(line),
        ]);
        host.put(start, end, self.packet, &field)?;
        self.packets += 1;
        Ok(())
    }
}
