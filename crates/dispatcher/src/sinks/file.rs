//! FileSink - appends records to a JSON-lines file

use contracts::{ContractError, OutputCallback, OutputRecord};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Keep existing content instead of truncating
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    ///
    /// `path` is required; `append` accepts `true`/`false`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| {
                ContractError::config_validation("params.path", "file sink requires a path")
            })?;
        let append = match params.get("append").map(String::as_str) {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(ContractError::config_validation(
                    "params.append",
                    format!("expected true or false, got '{other}'"),
                ))
            }
        };
        Ok(Self { path, append })
    }
}

/// Callback that writes one JSON object per record
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: BufWriter<File>,
    written: u64,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileSinkConfig::from_params(params)?;
        Ok(Self::new(name, config)?)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_record(&mut self, record: &OutputRecord<'_>) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")
    }
}

impl OutputCallback for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_deliver",
        skip(self, record),
        fields(sink = %self.name, kind = %record.descriptor.kind)
    )]
    fn deliver(&mut self, record: &OutputRecord<'_>) -> Result<(), ContractError> {
        self.write_record(record).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::callback_write(&self.name, e.to_string())
        })?;
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::callback_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, records = self.written, "FileSink flushed");
        Ok(())
    }
}
