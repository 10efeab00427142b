//! JSON-lines trace format.
//!
//! One entry per line:
//!
//! ```text
//! {"instance": "uart", "start": 0, "end": 80, "channel": 0, "value": [0, ["0x41"]]}
//! {"op": "decode", "instance": "uart", "start": 0, "end": 80, "value": {"bytes": [65]}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;

use contracts::Value;
use serde::Deserialize;

use crate::error::{CliError, Result};

/// What a trace entry does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOp {
    /// Submit `value` on `channel` of `instance`
    #[default]
    Put,
    /// Feed `value` into the decode entry point of `instance`
    Decode,
}

/// One line of a trace
#[derive(Debug, Clone, Deserialize)]
pub struct TraceEntry {
    #[serde(default)]
    pub op: TraceOp,
    pub instance: String,
    pub start: i64,
    pub end: i64,
    /// Required for puts, ignored for decodes
    #[serde(default)]
    pub channel: Option<i64>,
    #[serde(default)]
    pub value: Value,
}

impl TraceEntry {
    /// Untyped put arguments `[start, end, channel, value]`
    ///
    /// Range and type checks are left to the router so malformed entries
    /// count as rejected puts rather than parse errors.
    pub fn put_args(&self, line: usize) -> Result<Vec<Value>> {
        let channel = self
            .channel
            .ok_or_else(|| CliError::trace_parse(line, "put entry without a channel"))?;
        Ok(vec![
            Value::Int(self.start),
            Value::Int(self.end),
            Value::Int(channel),
            self.value.clone(),
        ])
    }

    /// Sample range for a decode entry
    pub fn sample_range(&self, line: usize) -> Result<(u64, u64)> {
        let start = u64::try_from(self.start)
            .map_err(|_| CliError::trace_parse(line, format!("negative start {}", self.start)))?;
        let end = u64::try_from(self.end)
            .map_err(|_| CliError::trace_parse(line, format!("negative end {}", self.end)))?;
        Ok((start, end))
    }
}

/// Iterator over `(line_number, entry)` pairs
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<(usize, TraceEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(CliError::Io(e))),
            };
            self.line += 1;

            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parsed = serde_json::from_str::<TraceEntry>(trimmed)
                .map(|entry| (self.line, entry))
                .map_err(|e| CliError::trace_parse(self.line, e.to_string()));
            return Some(parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str) -> Vec<Result<(usize, TraceEntry)>> {
        TraceReader::new(Cursor::new(text.to_string())).collect()
    }

    #[test]
    fn test_reads_put_and_decode_entries() {
        let entries = read(
            "# header\n\
             {\"instance\": \"uart\", \"start\": 0, \"end\": 8, \"channel\": 1, \"value\": [0, [\"x\"]]}\n\
             \n\
             {\"op\": \"decode\", \"instance\": \"uart\", \"start\": 8, \"end\": 16, \"value\": \"frame\"}\n",
        );
        assert_eq!(entries.len(), 2);

        let (line, put) = entries[0].as_ref().unwrap();
        assert_eq!(*line, 2);
        assert_eq!(put.op, TraceOp::Put);
        let args = put.put_args(*line).unwrap();
        assert_eq!(args[2], Value::Int(1));
        assert_eq!(args[3], Value::list([Value::Int(0), Value::list(["x"])]));

        let (line, decode) = entries[1].as_ref().unwrap();
        assert_eq!(*line, 4);
        assert_eq!(decode.op, TraceOp::Decode);
        assert_eq!(decode.sample_range(*line).unwrap(), (8, 16));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let entries =
            read("{\"instance\": \"uart\", \"start\": 0, \"end\": 8, \"channel\": 0}\nnot json\n");
        assert!(entries[0].is_ok());
        match &entries[1] {
            Err(CliError::TraceParse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_put_without_channel() {
        let entries = read("{\"instance\": \"uart\", \"start\": 0, \"end\": 8}\n");
        let (line, entry) = entries[0].as_ref().unwrap();
        assert!(matches!(
            entry.put_args(*line),
            Err(CliError::TraceParse { line: 1, .. })
        ));
    }

    #[test]
    fn test_negative_decode_range() {
        let entries =
            read("{\"op\": \"decode\", \"instance\": \"uart\", \"start\": -1, \"end\": 8}\n");
        let (line, entry) = entries[0].as_ref().unwrap();
        assert!(entry.sample_range(*line).is_err());
    }
}
