use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::batch::{BatcherConfig, FieldMapping};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub batch: BatchConfig,
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Field carrying the record timestamp.
    pub time_input: String,
    /// Field carrying the batch-position marker.
    pub batch_pos_input: String,
    /// Marker value opening a batch.
    pub batch_pos_start: String,
    /// Marker value closing a batch.
    pub batch_pos_end: String,
    /// Maximum batch span in seconds on the event-time clock; 0 disables
    /// time-based flushing.
    #[serde(default)]
    pub time_window: u64,
    /// Gzip and base64-encode emitted batch payloads.
    #[serde(default)]
    pub compress_output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field name as delivered on incoming events.
    pub name: String,
    /// Dotted upstream path this input comes from. The last non-empty
    /// segment becomes the record field name unless `output` overrides it.
    pub source: Option<String>,
    pub output: Option<String>,
    /// Merge the value, a sub-mapping, one level deep into the record.
    #[serde(default)]
    pub nested: bool,
}

impl InputConfig {
    /// Record field name this input feeds.
    pub fn output_name(&self) -> &str {
        if let Some(output) = &self.output {
            return output;
        }
        if let Some(source) = &self.source {
            if let Some(last) = source.rsplit('.').find(|s| !s.is_empty()) {
                return last;
            }
        }
        &self.name
    }

    /// Identifier carried in the metadata payload for this input.
    pub fn source_id(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,
    #[serde(default = "default_parse_error")]
    pub on_parse_error: ParseErrorStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_limit: default_buffer_limit(),
            on_parse_error: default_parse_error(),
        }
    }
}

fn default_buffer_limit() -> usize {
    1000
}

fn default_parse_error() -> ParseErrorStrategy {
    ParseErrorStrategy::Drop
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorStrategy {
    Drop,
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// NDJSON event file, or '-' for stdin.
    pub path: PathBuf,
    /// Keep polling the file for new lines after EOF.
    #[serde(default)]
    pub follow: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Delivery envelope file, or '-' for stdout.
    pub path: PathBuf,
}

impl Config {
    /// Batcher construction parameters derived from this config.
    pub fn batcher_config(&self) -> BatcherConfig {
        BatcherConfig {
            time_input: self.batch.time_input.clone(),
            batch_pos_input: self.batch.batch_pos_input.clone(),
            batch_pos_start: self.batch.batch_pos_start.clone(),
            batch_pos_end: self.batch.batch_pos_end.clone(),
            time_window: self.batch.time_window,
            compress_output: self.batch.compress_output,
            fields: self
                .inputs
                .iter()
                .map(|input| FieldMapping {
                    input: input.name.clone(),
                    output: input.output_name().to_string(),
                    nested: input.nested,
                })
                .collect(),
            input_sources: self
                .inputs
                .iter()
                .map(|input| input.source_id().to_string())
                .collect(),
        }
    }
}
