use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{IngestError, JobError, ScoringError};

/// Stage-level failures. Any of these aborts the current job.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Ingest failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Storage failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Cancelled { .. }
                | PipelineError::Ingest(IngestError::Cancelled { .. })
                | PipelineError::Database(DatabaseError::Cancelled { .. })
        )
    }
}

impl From<PipelineError> for JobError {
    fn from(err: PipelineError) -> Self {
        if err.is_cancelled() {
            JobError::Cancelled
        } else {
            JobError::Stage(err.to_string())
        }
    }
}
