use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_upload_directory")]
    pub upload_directory: String,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database_path() -> String {
    crate::db::default_database_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "incidentflow.db".to_string())
}

fn default_upload_directory() -> String {
    "uploads".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: default_database_path(),
            upload_directory: default_upload_directory(),
            queue: QueueConfig::default(),
            ingest: IngestConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Job queue sizing and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_workers")]
    pub workers: usize,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Retry `n` waits `backoff_unit_ms * n²` milliseconds.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

fn default_queue_workers() -> usize {
    3
}

fn default_buffer_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

impl QueueConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_queue_workers(),
            buffer_size: default_buffer_size(),
            max_retries: default_max_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_max_workers() -> usize {
    num_cpus::get()
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl IngestConfig {
    /// Delimiter as a single byte; callers run after validation, which
    /// guarantees a one-byte ASCII delimiter.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            delimiter: default_delimiter(),
        }
    }
}
