use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IncidentflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Stage-level failures of the ingestion step. Row-level problems are
/// reported as `ValidationError`s instead.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read spreadsheet '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to open workbook '{path}': {source}")]
    OpenWorkbook {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid workbook '{path}': {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("Unsupported spreadsheet format '{0}'")]
    UnsupportedFormat(String),

    #[error("Spreadsheet '{0}' has no header row")]
    MissingHeader(PathBuf),

    #[error("Ingest cancelled after {completed} of {total} rows")]
    Cancelled { completed: usize, total: usize },

    #[error("Row parser worker panicked")]
    WorkerPanicked,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Cannot score an absent incident record")]
    MissingRecord,
}

/// Errors surfaced synchronously by the job queue API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("Job queue is shutting down")]
    ShutDown,

    #[error("Job not found: {0}")]
    NotFound(String),
}

/// Why a job handler gave up on a job. Only `Stage` failures are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Job cancelled")]
    Cancelled,

    #[error("{0}")]
    Stage(String),
}

pub type Result<T> = std::result::Result<T, IncidentflowError>;
