use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML in '{}': {}", .path.display(), .source)]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string).map_err(|e| {
        ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    config.source.path = expand_tilde(&config.source.path);
    config.sink.path = expand_tilde(&config.sink.path);

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let var_list = unexpanded_vars.join(", ");
    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=/some/value\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export TMPDIR=/tmp)\n\
             2. Replace the variables in the config file with actual values",
            var_list
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    for (name, value) in [
        ("batch.time_input", &config.batch.time_input),
        ("batch.batch_pos_input", &config.batch.batch_pos_input),
        ("batch.batch_pos_start", &config.batch.batch_pos_start),
        ("batch.batch_pos_end", &config.batch.batch_pos_end),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{} must not be blank", name));
        }
    }

    if config.inputs.is_empty() {
        errors.push("config must declare at least one input".to_string());
    }

    let mut names = HashSet::new();
    let mut outputs = HashSet::new();
    for (i, input) in config.inputs.iter().enumerate() {
        if input.name.trim().is_empty() {
            errors.push(format!("inputs[{}]: name cannot be empty", i));
            continue;
        }
        if !names.insert(input.name.as_str()) {
            errors.push(format!(
                "inputs[{}]: duplicate input name '{}'",
                i, input.name
            ));
        }
        if !outputs.insert(input.output_name()) {
            errors.push(format!(
                "inputs[{}]: duplicate output field '{}'",
                i,
                input.output_name()
            ));
        }
        if input.nested
            && (input.name == config.batch.time_input
                || input.name == config.batch.batch_pos_input)
        {
            errors.push(format!(
                "inputs[{}]: control field '{}' cannot be nested",
                i, input.name
            ));
        }
    }

    if !config
        .inputs
        .iter()
        .any(|input| input.name == config.batch.time_input)
    {
        errors.push(format!(
            "batch.time_input '{}' must be declared in 'inputs'",
            config.batch.time_input
        ));
    }

    if config.source.path.as_os_str().is_empty() {
        errors.push("source.path cannot be empty".to_string());
    }
    if config.sink.path.as_os_str().is_empty() {
        errors.push("sink.path cannot be empty".to_string());
    }
    if config.source.follow && config.source.path == Path::new("-") {
        errors.push("source.follow cannot be used with stdin ('-')".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
