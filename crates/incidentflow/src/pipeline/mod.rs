pub mod error;
pub mod handler;
pub mod progress;
pub mod runner;
pub mod scoring_stage;

pub use error::PipelineError;
pub use handler::StageHandler;
pub use progress::{IngestPhase, NoopProgress, ProgressEvent, ProgressReporter, RecordingProgress};
pub use runner::{IngestPipeline, IngestSummary};
pub use scoring_stage::{ScoringKind, ScoringStage, ScoringSummary};
