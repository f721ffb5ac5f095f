use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The stage a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    IngestUpload,
    ScoreSentiment,
    ScoreAutomation,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::IngestUpload => "ingest_upload",
            JobKind::ScoreSentiment => "score_sentiment",
            JobKind::ScoreAutomation => "score_automation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Retrying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Retrying => "retrying",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a job's state-machine path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub status: JobStatus,
    pub retry_count: u32,
    pub at: DateTime<Utc>,
}

/// A unit of asynchronous work. Callers only ever see snapshots; the live
/// copy is owned by the queue's registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub upload_id: String,
    /// 0..=100
    pub progress: u8,
    pub message: String,
    pub error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub transitions: Vec<Transition>,
}

impl Job {
    pub fn new(
        kind: JobKind,
        upload_id: impl Into<String>,
        payload: serde_json::Value,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Pending,
            upload_id: upload_id.into(),
            progress: 0,
            message: "Job queued".to_string(),
            error: None,
            retry_count: 0,
            max_retries,
            payload,
            result: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            transitions: vec![Transition {
                status: JobStatus::Pending,
                retry_count: 0,
                at: now,
            }],
        }
    }

    /// Moves to `status` and appends it to the transition log.
    pub(crate) fn transition(&mut self, status: JobStatus) {
        let now = Utc::now();
        self.status = status;
        match status {
            JobStatus::Running => self.started_at = Some(now),
            JobStatus::Completed | JobStatus::Failed => self.completed_at = Some(now),
            JobStatus::Pending | JobStatus::Retrying => {}
        }
        self.transitions.push(Transition {
            status,
            retry_count: self.retry_count,
            at: now,
        });
    }

    pub(crate) fn complete(&mut self, result: serde_json::Value) {
        self.progress = 100;
        self.message = "Job completed".to_string();
        self.error = None;
        self.result = Some(result);
        self.transition(JobStatus::Completed);
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.message = format!("Job failed: {}", error);
        self.error = Some(error);
        self.transition(JobStatus::Failed);
    }

    /// Statuses visited so far, in order.
    pub fn status_path(&self) -> Vec<JobStatus> {
        self.transitions.iter().map(|t| t.status).collect()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}
