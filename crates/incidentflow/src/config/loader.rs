use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = load_config_from_str(&content)?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: messages.join("; "),
        });
    }

    Ok(())
}

/// Checks the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.queue.workers == 0 {
        return Err(ConfigError::Validation {
            message: "queue.workers must be at least 1".to_string(),
        });
    }

    if config.queue.buffer_size == 0 {
        return Err(ConfigError::Validation {
            message: "queue.buffer_size must be at least 1".to_string(),
        });
    }

    if config.ingest.max_workers == 0 {
        return Err(ConfigError::Validation {
            message: "ingest.max_workers must be at least 1".to_string(),
        });
    }

    let delimiter = config.ingest.delimiter.as_bytes();
    if delimiter.len() != 1 || !delimiter[0].is_ascii() {
        return Err(ConfigError::Validation {
            message: format!(
                "ingest.delimiter must be a single ASCII character, got '{}'",
                config.ingest.delimiter
            ),
        });
    }

    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "database_path must not be empty".to_string(),
        });
    }

    Ok(())
}
