pub mod incident;
pub mod upload;
pub mod validation;

pub use incident::{
    AutomationAssessment, IncidentRecord, Priority, ProcessGroup, SentimentLabel, SentimentScore,
};
pub use upload::{UploadRecord, UploadStatus};
pub use validation::{BatchInsertResult, BatchOutcome, ValidationError, ValidationKind};
