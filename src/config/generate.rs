pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# WINDROW CONFIGURATION
# =============================================================================
# Windrow assembles incoming field events into records, groups records into
# batches, and emits each batch when an explicit end-of-batch marker arrives
# or a time window (measured on the events' own timestamps) elapses.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/windrow/config.yml
#   3. /etc/windrow/config.yml

# =============================================================================
# BATCH
# =============================================================================
# Which fields control batching, and when a batch is considered complete.

batch:
  # Field carrying each record's timestamp. Accepts epoch milliseconds
  # (number or digit string) or an RFC 3339 string. Must also be declared
  # under 'inputs' so the raw value lands in the record.
  time_input: time

  # Field carrying the batch-position marker.
  batch_pos_input: batch_pos

  # Marker value that opens a batch. Logged when seen; records are buffered
  # the same way with or without it.
  batch_pos_start: start

  # Marker value that closes a batch. The closing record is included in the
  # emitted batch.
  batch_pos_end: end

  # Maximum batch span in seconds, measured on the event timestamps. When a
  # record arrives this long after the first record of the window, the
  # accumulated batch is parked and merged into the next explicit close.
  # 0 disables time-based flushing.
  time_window: 30

  # Gzip and base64-encode emitted batch payloads.
  compress_output: false

# =============================================================================
# INPUTS
# =============================================================================
# Declared input fields, one list entry per field delivered on events.
# 'source' is the dotted upstream path; its last segment names the record
# field (override with 'output'). Omit 'source' to use the input name as-is.
# 'nested: true' merges an object value into the record one level deep
# instead of storing it under a single field.

inputs:
  - name: time
    source: value.reading.time
  - name: batch_pos
    source: value.reading.batch_pos
  - name: temperature
    source: value.reading.temperature
  - name: extras
    nested: true

# =============================================================================
# PIPELINE
# =============================================================================

pipeline:
  # Events buffered between the reader and the batcher.
  buffer_limit: 1000
  # What to do with lines that are not valid JSON objects: 'drop' or 'abort'.
  on_parse_error: drop

# =============================================================================
# SOURCE / SINK
# =============================================================================
# The source is an NDJSON file of events, one JSON object per line, keyed by
# input field name. '-' reads stdin. 'follow: true' keeps polling the file
# for new lines. The sink receives one JSON envelope line per channel
# delivery ('data' and 'meta_data'); '-' writes stdout.

source:
  path: /var/lib/windrow/events.ndjson
  follow: false

sink:
  path: /var/lib/windrow/batches.ndjson
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_starter_config_parses_and_validates() {
        let yaml = generate_starter_config();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(config.batch.time_input, "time");
        assert_eq!(config.batch.time_window, 30);
        assert_eq!(config.inputs.len(), 4);
        assert_eq!(config.inputs[2].output_name(), "temperature");
    }

    #[test]
    fn test_starter_config_builds_a_batcher() {
        let yaml = generate_starter_config();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();

        let batcher = crate::batch::Batcher::new(config.batcher_config()).unwrap();
        assert_eq!(batcher.required_inputs().len(), 4);
    }
}
