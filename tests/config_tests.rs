use windrow::config::{generate_starter_config, load_config, ConfigError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_generated_config_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_content = generate_starter_config();
    fs::write(&config_path, config_content).unwrap();

    let config = load_config(&config_path).expect("Generated config should be valid");

    assert_eq!(config.inputs.len(), 4);
    assert_eq!(config.batch.time_input, "time");
    assert_eq!(config.batch.batch_pos_end, "end");
    assert_eq!(config.batch.time_window, 30);
    assert!(!config.batch.compress_output);
    assert_eq!(config.pipeline.buffer_limit, 1000);
    // The nested input merges into records instead of mapping to one field
    assert!(config.inputs.iter().any(|input| input.nested));
}

#[test]
fn test_undeclared_time_input_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_yaml = r#"
batch:
  time_input: time
  batch_pos_input: batch_pos
  batch_pos_start: start
  batch_pos_end: end

inputs:
  - name: temperature

source:
  path: /tmp/events.ndjson

sink:
  path: /tmp/batches.ndjson
"#;

    fs::write(&config_path, config_yaml).unwrap();

    let result = load_config(&config_path);
    assert!(result.is_err());

    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("batch.time_input 'time' must be declared"));
}

#[test]
fn test_duplicate_output_field_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_yaml = r#"
batch:
  time_input: time
  batch_pos_input: batch_pos
  batch_pos_start: start
  batch_pos_end: end

inputs:
  - name: time
  - name: t1
    source: value.reading.temperature
  - name: t2
    output: temperature

source:
  path: /tmp/events.ndjson

sink:
  path: /tmp/batches.ndjson
"#;

    fs::write(&config_path, config_yaml).unwrap();

    let result = load_config(&config_path);
    assert!(result.is_err());

    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("duplicate output field 'temperature'"));
}

#[test]
fn test_blank_marker_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_yaml = r#"
batch:
  time_input: time
  batch_pos_input: batch_pos
  batch_pos_start: start
  batch_pos_end: "  "

inputs:
  - name: time

source:
  path: /tmp/events.ndjson

sink:
  path: /tmp/batches.ndjson
"#;

    fs::write(&config_path, config_yaml).unwrap();

    let result = load_config(&config_path);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("batch.batch_pos_end must not be blank"));
}

#[test]
fn test_env_var_expansion_in_paths() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    std::env::set_var("WINDROW_CONFIG_TEST_DIR", "/var/lib/windrow");

    let config_yaml = r#"
batch:
  time_input: time
  batch_pos_input: batch_pos
  batch_pos_start: start
  batch_pos_end: end

inputs:
  - name: time

source:
  path: $env{WINDROW_CONFIG_TEST_DIR}/events.ndjson

sink:
  path: $env{WINDROW_CONFIG_TEST_DIR}/batches.ndjson
"#;

    fs::write(&config_path, config_yaml).unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(
        config.source.path.to_string_lossy(),
        "/var/lib/windrow/events.ndjson"
    );
    assert_eq!(
        config.sink.path.to_string_lossy(),
        "/var/lib/windrow/batches.ndjson"
    );
}

#[test]
fn test_unset_env_var_reports_helpful_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_yaml = r#"
batch:
  time_input: time
  batch_pos_input: batch_pos
  batch_pos_start: start
  batch_pos_end: end

inputs:
  - name: time

source:
  path: $env{WINDROW_CONFIG_TEST_UNSET_VAR}/events.ndjson

sink:
  path: /tmp/batches.ndjson
"#;

    fs::write(&config_path, config_yaml).unwrap();

    let result = load_config(&config_path);
    assert!(result.is_err());

    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("WINDROW_CONFIG_TEST_UNSET_VAR"));
    assert!(err_msg.contains("export WINDROW_CONFIG_TEST_UNSET_VAR="));
}

#[test]
fn test_malformed_yaml_names_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(&config_path, "batch: [unclosed").unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }));
    assert!(err
        .to_string()
        .contains(&config_path.display().to_string()));
}

#[test]
fn test_missing_config_file_names_the_file() {
    let result = load_config(std::path::Path::new("/nonexistent/windrow.yml"));
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("/nonexistent/windrow.yml"));
}
