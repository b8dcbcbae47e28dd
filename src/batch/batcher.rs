use std::collections::HashSet;
use std::mem;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::encode::{EncodeError, PayloadEncoder};
use super::observer::{BatchEvent, BatchObserver, LogObserver};
use super::timestamp::{self, TimestampError};
use super::types::{BatchTrigger, Emission, FieldSet, Record};

/// One entry of the field mapping: which input field feeds which output
/// field of the assembled record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub input: String,
    pub output: String,
    /// Decode the value as a sub-mapping and merge its entries into the
    /// record instead of storing it under `output`.
    pub nested: bool,
}

impl FieldMapping {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            nested: false,
        }
    }

    pub fn nested(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            nested: true,
        }
    }
}

/// Constructor-time configuration for a [`Batcher`].
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Field carrying the record timestamp; must appear in `fields`.
    pub time_input: String,
    /// Field carrying the batch-position marker.
    pub batch_pos_input: String,
    /// Marker value opening a batch. Observed and logged, nothing more.
    pub batch_pos_start: String,
    /// Marker value closing a batch.
    pub batch_pos_end: String,
    /// Maximum batch span in seconds on the event-time clock; 0 disables
    /// time-based flushing.
    pub time_window: u64,
    /// Gzip and base64-encode the batch payload.
    pub compress_output: bool,
    /// Input field name -> record field name.
    pub fields: Vec<FieldMapping>,
    /// Declared input sources carried in the metadata payload.
    pub input_sources: Vec<String>,
}

/// Batcher construction failed. Every problem is reported, not just the
/// first.
#[derive(Debug, Error)]
#[error("invalid batcher configuration: {}", .problems.join("; "))]
pub struct InvalidConfig {
    pub problems: Vec<String>,
}

/// A single ingest call failed. Buffers and the window clock are exactly as
/// they were before the call unless the variant says otherwise.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no value delivered for timestamp field '{field}'")]
    MissingTimestamp { field: String },

    #[error("bad timestamp in field '{field}': {source}")]
    InvalidTimestamp {
        field: String,
        #[source]
        source: TimestampError,
    },

    /// Encoding failed while emitting. The records stay buffered; the
    /// triggering record was still appended.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

struct AssembledEvent {
    record: Record,
    marker: String,
    millis: i64,
    raw_timestamp: String,
}

/// Accumulates assembled records into batches and decides when to emit.
///
/// A batch closes on an explicit end marker in the batch-position field, or
/// is flushed to the held buffer when the event-time window elapses. A held
/// batch merges into the next explicit close, so an end marker arriving late
/// (after a time flush) still produces one complete batch. Two time flushes
/// with no end marker in between evict the older held generation on its own.
pub struct Batcher {
    time_input: String,
    batch_pos_input: String,
    batch_pos_start: String,
    batch_pos_end: String,
    window_ms: i64,
    fields: Vec<FieldMapping>,
    encoder: PayloadEncoder,
    metadata: String,
    observer: Box<dyn BatchObserver>,
    active: Vec<Record>,
    held: Vec<Record>,
    current_ms: i64,
    window_start_ms: Option<i64>,
    last_timestamp: Option<String>,
}

impl Batcher {
    /// Build a batcher with the default tracing-backed observer.
    pub fn new(config: BatcherConfig) -> Result<Self, InvalidConfig> {
        Self::with_observer(config, Box::new(LogObserver))
    }

    /// Build a batcher with a custom observation sink.
    pub fn with_observer(
        config: BatcherConfig,
        observer: Box<dyn BatchObserver>,
    ) -> Result<Self, InvalidConfig> {
        let mut problems = Vec::new();

        for (name, value) in [
            ("time_input", &config.time_input),
            ("batch_pos_input", &config.batch_pos_input),
            ("batch_pos_start", &config.batch_pos_start),
            ("batch_pos_end", &config.batch_pos_end),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{name} must not be blank"));
            }
        }

        if config.fields.is_empty() {
            problems.push("field mapping must not be empty".to_string());
        }

        let mut inputs = HashSet::new();
        let mut outputs = HashSet::new();
        for mapping in &config.fields {
            if mapping.input.trim().is_empty() || mapping.output.trim().is_empty() {
                problems.push("field mapping entries must not be blank".to_string());
                continue;
            }
            if !inputs.insert(mapping.input.as_str()) {
                problems.push(format!("duplicate input field '{}'", mapping.input));
            }
            if !outputs.insert(mapping.output.as_str()) {
                problems.push(format!("duplicate output field '{}'", mapping.output));
            }
            if mapping.nested
                && (mapping.input == config.time_input || mapping.input == config.batch_pos_input)
            {
                problems.push(format!(
                    "control field '{}' cannot be a nested input",
                    mapping.input
                ));
            }
        }

        if !inputs.contains(config.time_input.as_str()) {
            problems.push(format!(
                "timestamp field '{}' is not in the field mapping",
                config.time_input
            ));
        }

        if !problems.is_empty() {
            return Err(InvalidConfig { problems });
        }

        let mut input_sources = config.input_sources;
        input_sources.sort();
        input_sources.dedup();

        Ok(Self {
            time_input: config.time_input,
            batch_pos_input: config.batch_pos_input,
            batch_pos_start: config.batch_pos_start,
            batch_pos_end: config.batch_pos_end,
            window_ms: config.time_window as i64 * 1000,
            fields: config.fields,
            encoder: PayloadEncoder::new(config.compress_output),
            metadata: metadata_payload(&input_sources),
            observer,
            active: Vec::new(),
            held: Vec::new(),
            current_ms: 0,
            window_start_ms: None,
            last_timestamp: None,
        })
    }

    /// Every input field the batcher expects delivered per ingest call: the
    /// mapped fields plus the timestamp and batch-position controls.
    pub fn required_inputs(&self) -> Vec<&str> {
        let mut inputs: Vec<&str> = self.fields.iter().map(|m| m.input.as_str()).collect();
        for control in [self.time_input.as_str(), self.batch_pos_input.as_str()] {
            if !inputs.contains(&control) {
                inputs.push(control);
            }
        }
        inputs
    }

    /// Raw form of the most recently accepted timestamp, for diagnostics.
    pub fn last_timestamp(&self) -> Option<&str> {
        self.last_timestamp.as_deref()
    }

    /// Records currently buffered across both batches.
    pub fn buffered(&self) -> usize {
        self.active.len() + self.held.len()
    }

    /// Feed one event through the machine.
    ///
    /// Returns `Some(emission)` when this event closed a batch (explicit end
    /// marker) or evicted a stale held batch (second time flush in a row).
    /// On error the call is not retried; the next event proceeds normally.
    pub fn ingest(&mut self, event: FieldSet) -> Result<Option<Emission>, BatchError> {
        match self.ingest_inner(event) {
            Ok(emission) => Ok(emission),
            Err(error) => {
                self.observer.on_event(&BatchEvent::IngestError {
                    error: &error,
                    last_timestamp: self.last_timestamp.as_deref(),
                });
                Err(error)
            }
        }
    }

    /// Emit whatever both buffers hold (held generation first) without an
    /// end marker, for caller-driven shutdown. Returns `None` when empty.
    pub fn drain(&mut self) -> Result<Option<Emission>, BatchError> {
        if self.held.is_empty() && self.active.is_empty() {
            return Ok(None);
        }
        self.close(BatchTrigger::Drain).map(Some)
    }

    fn ingest_inner(&mut self, event: FieldSet) -> Result<Option<Emission>, BatchError> {
        let assembled = self.assemble(event)?;

        self.current_ms = assembled.millis;
        if self.window_start_ms.is_none() {
            self.window_start_ms = Some(assembled.millis);
        }
        self.last_timestamp = Some(assembled.raw_timestamp);

        if assembled.marker == self.batch_pos_start {
            self.observer.on_event(&BatchEvent::StartMarker {
                timestamp_ms: assembled.millis,
            });
        }

        if assembled.marker == self.batch_pos_end {
            self.active.push(assembled.record);
            return self.close(BatchTrigger::EndMarker).map(Some);
        }

        self.roll_window(assembled.record)
    }

    /// Build one record from the delivered fields. Nothing is mutated here;
    /// a failed call leaves the machine exactly as it was.
    fn assemble(&self, mut event: FieldSet) -> Result<AssembledEvent, BatchError> {
        let ts_value = event
            .get(&self.time_input)
            .ok_or_else(|| BatchError::MissingTimestamp {
                field: self.time_input.clone(),
            })?;

        let millis =
            timestamp::event_millis(ts_value).map_err(|source| BatchError::InvalidTimestamp {
                field: self.time_input.clone(),
                source,
            })?;

        let raw_timestamp = match ts_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        // Absent or non-string markers compare as empty, which can never
        // equal a sentinel (sentinels are validated non-blank).
        let marker = event
            .get(&self.batch_pos_input)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut record = Record::new();
        for mapping in &self.fields {
            match event.take(&mapping.input) {
                Some(Value::Object(nested)) if mapping.nested => record.extend(nested),
                Some(value) => {
                    record.insert(mapping.output.clone(), value);
                }
                None => {
                    record.insert(mapping.output.clone(), Value::Null);
                }
            }
        }

        Ok(AssembledEvent {
            record,
            marker,
            millis,
            raw_timestamp,
        })
    }

    /// Time-window bookkeeping for a record that did not close the batch.
    /// Returns the stale held batch evicted by a second time flush, if any.
    fn roll_window(&mut self, record: Record) -> Result<Option<Emission>, BatchError> {
        let elapsed = match self.window_start_ms {
            Some(start) => self.current_ms - start,
            None => 0,
        };

        let mut evicted = None;
        if self.window_ms > 0 && elapsed >= self.window_ms {
            // The crossing record opens the next window.
            self.window_start_ms = Some(self.current_ms);

            if !self.held.is_empty() {
                let stale: Vec<&Record> = self.held.iter().collect();
                match self.make_emission(&stale, BatchTrigger::TimeWindow) {
                    Ok(emission) => {
                        self.held.clear();
                        self.observer.on_event(&BatchEvent::Emitted {
                            batch_id: emission.batch_id,
                            records: emission.records,
                            trigger: emission.trigger,
                        });
                        evicted = Some(emission);
                    }
                    Err(error) => {
                        // Held records stay for the next flush to retry; the
                        // record that tripped the window still joins the
                        // stream.
                        self.active.push(record);
                        return Err(error);
                    }
                }
            }

            mem::swap(&mut self.held, &mut self.active);
            self.observer.on_event(&BatchEvent::WindowFlushed {
                held: self.held.len(),
                window_start_ms: self.current_ms,
            });
        }

        self.active.push(record);
        Ok(evicted)
    }

    /// Emit held and active content as one batch, held generation first.
    /// Buffers clear and the window resets only after encoding succeeds.
    fn close(&mut self, trigger: BatchTrigger) -> Result<Emission, BatchError> {
        let merged: Vec<&Record> = self.held.iter().chain(self.active.iter()).collect();
        let emission = self.make_emission(&merged, trigger)?;

        self.held.clear();
        self.active.clear();
        self.window_start_ms = None;
        self.last_timestamp = None;
        self.observer.on_event(&BatchEvent::Emitted {
            batch_id: emission.batch_id,
            records: emission.records,
            trigger,
        });
        Ok(emission)
    }

    fn make_emission(
        &self,
        records: &[&Record],
        trigger: BatchTrigger,
    ) -> Result<Emission, BatchError> {
        let data = self.encoder.encode_batch(records)?;
        Ok(Emission {
            batch_id: Uuid::new_v4(),
            trigger,
            records: records.len(),
            data,
            metadata: self.metadata.clone(),
        })
    }
}

fn metadata_payload(input_sources: &[String]) -> String {
    serde_json::json!({ "input_sources": input_sources }).to_string()
}
