//! Upload (batch) metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "uploaded" => Some(UploadStatus::Uploaded),
            "processing" => Some(UploadStatus::Processing),
            "completed" => Some(UploadStatus::Completed),
            "failed" => Some(UploadStatus::Failed),
            _ => None,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

/// Metadata for one uploaded spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    /// Stored file name, resolved against the upload directory.
    pub filename: String,
    /// Name the file was uploaded under.
    pub original_filename: String,
    pub status: UploadStatus,
    pub record_count: u64,
    pub processed_count: u64,
    pub error_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl UploadRecord {
    pub fn new(filename: impl Into<String>, original_filename: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            original_filename: original_filename.into(),
            status: UploadStatus::Uploaded,
            record_count: 0,
            processed_count: 0,
            error_count: 0,
            errors: Vec::new(),
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_upload_defaults() {
        let upload = UploadRecord::new("stored.csv", "incidents.csv");
        assert!(!upload.id.is_empty());
        assert_eq!(upload.status, UploadStatus::Uploaded);
        assert_eq!(upload.error_count, 0);
        assert!(upload.processed_at.is_none());
    }

    #[test]
    fn test_status_parse() {
        for status in [
            UploadStatus::Uploaded,
            UploadStatus::Processing,
            UploadStatus::Completed,
            UploadStatus::Failed,
        ] {
            assert_eq!(UploadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UploadStatus::parse("archived"), None);
        assert!(UploadStatus::Failed.is_finished());
        assert!(!UploadStatus::Processing.is_finished());
    }
}
