use std::fmt;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::cancel::CancelFlag;
use crate::db::{incident_repo, upload_repo, Database};
use crate::model::IncidentRecord;
use crate::scoring::FeatureScorer;

use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

const CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringKind {
    Sentiment,
    Automation,
}

impl fmt::Display for ScoringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringKind::Sentiment => f.write_str("sentiment"),
            ScoringKind::Automation => f.write_str("automation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringSummary {
    pub upload_id: String,
    pub kind: ScoringKind,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
}

/// Re-scores the stored incidents of an upload and writes the derived
/// columns back.
pub struct ScoringStage {
    db: Database,
    scorer: FeatureScorer,
}

impl ScoringStage {
    pub fn new(db: Database, scorer: FeatureScorer) -> Self {
        Self { db, scorer }
    }

    pub fn run(
        &self,
        upload_id: &str,
        kind: ScoringKind,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<ScoringSummary, PipelineError> {
        let _span = info_span!("score_upload", upload_id = %upload_id, kind = %kind).entered();

        upload_repo::get(&self.db, upload_id)?;
        let records = incident_repo::find_by_upload(&self.db, upload_id)?;
        let total = records.len();
        progress.report(ProgressEvent::Percent {
            percent: 10,
            message: format!("Loaded {} incidents", total),
        });

        let mut processed = 0;
        let mut skipped = 0;
        let mut done = 0;
        for chunk in records.chunks(CHUNK_SIZE) {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled {
                    stage: "batch scoring",
                });
            }
            for record in chunk {
                if self.score_one(record, kind)? {
                    processed += 1;
                } else {
                    skipped += 1;
                }
            }
            done += chunk.len();
            let percent = 10 + (done * 90 / total.max(1)) as u8;
            progress.report(ProgressEvent::Percent {
                percent,
                message: format!("Scored {} of {} incidents", done, total),
            });
            debug!("{} scoring: {}/{}", kind, done, total);
        }

        if total == 0 {
            progress.report(ProgressEvent::Percent {
                percent: 100,
                message: "No incidents to score".to_string(),
            });
        }

        info!("{} scoring of upload {}: {}/{} scored", kind, upload_id, processed, total);
        Ok(ScoringSummary {
            upload_id: upload_id.to_string(),
            kind,
            total,
            processed,
            skipped,
        })
    }

    /// Scores and stores one record. Scorer errors are logged and the record
    /// skipped; storage errors abort the stage.
    fn score_one(&self, record: &IncidentRecord, kind: ScoringKind) -> Result<bool, PipelineError> {
        match kind {
            ScoringKind::Sentiment => match self.scorer.sentiment().score(Some(record)) {
                Ok(score) => {
                    incident_repo::update_sentiment(&self.db, &record.id, &score)?;
                    Ok(true)
                }
                Err(e) => {
                    warn!("Skipping sentiment for {}: {}", record.incident_id, e);
                    Ok(false)
                }
            },
            ScoringKind::Automation => match self.scorer.automation().assess(Some(record)) {
                Ok(assessment) => {
                    incident_repo::update_automation(&self.db, &record.id, &assessment)?;
                    Ok(true)
                }
                Err(e) => {
                    warn!("Skipping automation for {}: {}", record.incident_id, e);
                    Ok(false)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteBatchWriter;
    use crate::db::BatchWriter;
    use crate::model::{ProcessGroup, UploadRecord};
    use crate::pipeline::progress::RecordingProgress;
    use chrono::NaiveDate;

    fn seed(count: usize) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let upload = UploadRecord::new("u.csv", "u.csv");
        upload_repo::insert(&db, &upload).unwrap();

        let reported = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let records: Vec<IncidentRecord> = (1..=count)
            .map(|i| {
                let mut record = IncidentRecord::new(format!("INC{:03}", i), reported);
                record.source_row = i;
                record.brief_description = "Server restart".to_string();
                record.description = "Service restored after restart".to_string();
                record.application_name = "Billing".to_string();
                record.resolution_group = "Operations".to_string();
                record
            })
            .collect();
        SqliteBatchWriter::new(db.clone())
            .insert_batch(&records, &upload.id, &CancelFlag::new())
            .unwrap();
        (db, upload.id)
    }

    #[test]
    fn test_scores_in_chunks_with_progress() {
        let (db, upload_id) = seed(25);
        let stage = ScoringStage::new(db.clone(), FeatureScorer::rule_based());
        let progress = RecordingProgress::new();

        let summary = stage
            .run(&upload_id, ScoringKind::Automation, &CancelFlag::new(), &progress)
            .unwrap();
        assert_eq!(summary.total, 25);
        assert_eq!(summary.processed, 25);
        assert_eq!(progress.percents(), vec![10, 46, 82, 100]);

        let stored = incident_repo::find_by_upload(&db, &upload_id).unwrap();
        assert!(stored.iter().all(|r| r
            .automation
            .as_ref()
            .is_some_and(|a| a.process_group == ProcessGroup::Infrastructure)));
        assert!(stored.iter().all(|r| r.sentiment.is_none()));
    }

    #[test]
    fn test_sentiment_scoring() {
        let (db, upload_id) = seed(3);
        let stage = ScoringStage::new(db.clone(), FeatureScorer::rule_based());
        stage
            .run(&upload_id, ScoringKind::Sentiment, &CancelFlag::new(), &RecordingProgress::new())
            .unwrap();

        let stored = incident_repo::find_by_upload(&db, &upload_id).unwrap();
        assert!(stored.iter().all(|r| r.sentiment.is_some()));
    }

    #[test]
    fn test_empty_upload_reports_done() {
        let (db, upload_id) = seed(0);
        let stage = ScoringStage::new(db, FeatureScorer::rule_based());
        let progress = RecordingProgress::new();
        let summary = stage
            .run(&upload_id, ScoringKind::Sentiment, &CancelFlag::new(), &progress)
            .unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(progress.percents(), vec![10, 100]);
    }

    #[test]
    fn test_cancelled_stage() {
        let (db, upload_id) = seed(5);
        let stage = ScoringStage::new(db, FeatureScorer::rule_based());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = stage.run(&upload_id, ScoringKind::Sentiment, &cancel, &RecordingProgress::new());
        assert!(matches!(result, Err(PipelineError::Cancelled { .. })));
    }

    #[test]
    fn test_unknown_upload_is_error() {
        let db = Database::open_in_memory().unwrap();
        let stage = ScoringStage::new(db, FeatureScorer::rule_based());
        let result = stage.run("nope", ScoringKind::Sentiment, &CancelFlag::new(), &RecordingProgress::new());
        assert!(matches!(result, Err(PipelineError::Database(_))));
    }
}
