pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod scoring;

pub use cancel::CancelFlag;
pub use config::{load_config, Config};
pub use db::{BatchWriter, Database, DatabaseError, SqliteBatchWriter};
pub use error::{
    ConfigError, IncidentflowError, IngestError, JobError, QueueError, Result, ScoringError,
};
pub use ingest::{ConcurrentIngester, CsvSheetReader, SheetReader, SpreadsheetReader};
pub use model::{BatchInsertResult, IncidentRecord, UploadRecord, UploadStatus, ValidationError};
pub use pipeline::{IngestPipeline, IngestSummary, PipelineError, ScoringStage, StageHandler};
pub use queue::{Job, JobHandler, JobKind, JobQueue, JobStatus};
pub use scoring::{AutomationScorer, FeatureScorer, SentimentScorer};
