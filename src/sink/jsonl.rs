use super::traits::{EmissionSink, SinkError};
use crate::batch::Emission;
use crate::config::types::SinkConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use uuid::Uuid;

/// One output line per channel delivery.
#[derive(Debug, Serialize)]
struct SinkLine<'a> {
    batch_id: Uuid,
    channel: &'a str,
    payload: &'a str,
}

enum LineTarget {
    File(File),
    Stdout(io::Stdout),
}

impl LineTarget {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            LineTarget::File(file) => writeln!(file, "{}", line),
            LineTarget::Stdout(stdout) => writeln!(stdout.lock(), "{}", line),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LineTarget::File(file) => file.flush(),
            LineTarget::Stdout(stdout) => stdout.lock().flush(),
        }
    }
}

/// Appends emissions to a JSON-lines file, two lines per emission: the data
/// payload, then the metadata payload. '-' writes to stdout.
pub struct JsonLinesSink {
    target: LineTarget,
}

impl JsonLinesSink {
    pub fn open(config: &SinkConfig) -> Result<Self, SinkError> {
        let target = if config.path == Path::new("-") {
            LineTarget::Stdout(io::stdout())
        } else {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.path)?;
            LineTarget::File(file)
        };
        Ok(Self { target })
    }
}

#[async_trait]
impl EmissionSink for JsonLinesSink {
    async fn deliver(&mut self, emission: &Emission) -> Result<(), SinkError> {
        for (channel, payload) in emission.channel_payloads() {
            let line = serde_json::to_string(&SinkLine {
                batch_id: emission.batch_id,
                channel,
                payload,
            })?;
            self.target.write_line(&line)?;
        }
        self.target.flush()?;
        Ok(())
    }
}
