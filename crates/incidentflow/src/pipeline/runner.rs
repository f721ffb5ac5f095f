use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::db::{incident_repo, upload_repo, BatchWriter, Database, SqliteBatchWriter};
use crate::error::IngestError;
use crate::ingest::{
    split_header, ColumnMap, ConcurrentIngester, IngestReport, SheetReader, SpreadsheetReader,
};
use crate::model::{BatchInsertResult, UploadRecord, UploadStatus, ValidationError};
use crate::scoring::FeatureScorer;

use super::error::PipelineError;
use super::progress::{IngestPhase, ProgressEvent, ProgressReporter};

/// What one ingest run did.
///
/// `inserted_rows + duplicate_rows + rejected_rows == total_rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub upload_id: String,
    pub status: UploadStatus,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub inserted_rows: usize,
    pub duplicate_rows: usize,
    pub rejected_rows: usize,
    pub errors: Vec<ValidationError>,
    pub duration_ms: u64,
}

/// Read -> parse -> score -> persist for one upload.
pub struct IngestPipeline {
    db: Database,
    upload_dir: PathBuf,
    reader: Arc<dyn SheetReader>,
    ingester: ConcurrentIngester,
    scorer: FeatureScorer,
    writer: Arc<dyn BatchWriter>,
}

impl IngestPipeline {
    /// Production constructor: CSV or xlsx by extension, rule-based scorers,
    /// SQLite writer.
    pub fn from_config(config: &Config, db: Database) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_directory),
            reader: Arc::new(SpreadsheetReader::new(config.ingest.delimiter_byte())),
            ingester: ConcurrentIngester::new(config.ingest.max_workers),
            scorer: FeatureScorer::rule_based(),
            writer: Arc::new(SqliteBatchWriter::new(db.clone())),
            db,
        }
    }

    /// Constructor with injected collaborators.
    pub fn new(
        db: Database,
        upload_dir: impl Into<PathBuf>,
        reader: Arc<dyn SheetReader>,
        ingester: ConcurrentIngester,
        scorer: FeatureScorer,
        writer: Arc<dyn BatchWriter>,
    ) -> Self {
        Self {
            db,
            upload_dir: upload_dir.into(),
            reader,
            ingester,
            scorer,
            writer,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Processes the stored spreadsheet of `upload_id`.
    ///
    /// The upload is marked `processing` first. A stage error marks it
    /// `failed` and is returned. Otherwise it ends `completed`, or `failed`
    /// when nothing was inserted and there were errors.
    pub fn run(
        &self,
        upload_id: &str,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestSummary, PipelineError> {
        let started = Instant::now();
        let upload = upload_repo::get(&self.db, upload_id)?;

        let _pipeline_span = info_span!("ingest",
            upload_id = %upload.id,
            filename = %upload.original_filename,
        )
        .entered();

        upload_repo::update_status(&self.db, &upload.id, UploadStatus::Processing)?;

        let (report, batch) = match self.run_stages(&upload, cancel, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Ingest of upload {} failed: {}", upload.id, e);
                if let Err(mark) =
                    upload_repo::finish(&self.db, &upload.id, UploadStatus::Failed, 0, 0, &[e.to_string()])
                {
                    warn!("Could not mark upload {} failed: {}", upload.id, mark);
                }
                return Err(e);
            }
        };

        let _step = info_span!("finalize").entered();
        progress.report(ProgressEvent::Phase {
            phase: IngestPhase::Finalizing,
            message: "Updating upload status...".to_string(),
        });

        let duplicate_rows = batch.duplicate_count();
        let rejected_rows = report.invalid_rows() + batch.rejected_count();
        let mut errors = report.errors;
        errors.extend(batch.errors);

        let status = if batch.inserted_count == 0 && !errors.is_empty() {
            UploadStatus::Failed
        } else {
            UploadStatus::Completed
        };
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        if let Err(e) = upload_repo::finish(
            &self.db,
            &upload.id,
            status,
            report.total_rows as u64,
            batch.inserted_count as u64,
            &messages,
        ) {
            warn!("Could not record final status of upload {}: {}", upload.id, e);
        }

        let summary = IngestSummary {
            upload_id: upload.id.clone(),
            status,
            total_rows: report.total_rows,
            valid_rows: report.records.len(),
            inserted_rows: batch.inserted_count,
            duplicate_rows,
            rejected_rows,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Upload {} {}: {} rows, {} inserted, {} duplicates, {} rejected",
            summary.upload_id,
            summary.status.as_str(),
            summary.total_rows,
            summary.inserted_rows,
            summary.duplicate_rows,
            summary.rejected_rows
        );
        Ok(summary)
    }

    /// Undoes a processed upload: deletes its incidents and puts the upload
    /// back to `uploaded` so it can be ingested again. A failed delete is
    /// logged and the reset still happens. Returns the number of incidents
    /// removed.
    pub fn rollback(&self, upload_id: &str) -> Result<usize, PipelineError> {
        let upload = upload_repo::get(&self.db, upload_id)?;
        let _span = info_span!("rollback", upload_id = %upload.id).entered();

        let deleted = match incident_repo::delete_by_upload(&self.db, &upload.id) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Could not delete incidents of upload {}: {}", upload.id, e);
                0
            }
        };
        upload_repo::reset(&self.db, &upload.id)?;

        info!("Rolled back upload {}: {} incidents removed", upload.id, deleted);
        Ok(deleted)
    }

    fn run_stages(
        &self,
        upload: &UploadRecord,
        cancel: &CancelFlag,
        progress: &dyn ProgressReporter,
    ) -> Result<(IngestReport, BatchInsertResult), PipelineError> {
        let path = self.upload_dir.join(&upload.filename);

        let (header, rows) = {
            let _step = info_span!("read").entered();
            progress.report(ProgressEvent::Phase {
                phase: IngestPhase::Reading,
                message: format!("Reading {}...", upload.original_filename),
            });
            let rows = self.reader.read_rows(&path)?;
            split_header(rows).ok_or_else(|| IngestError::MissingHeader(path.clone()))?
        };

        let mut report = {
            let _step = info_span!("parse", rows = rows.len()).entered();
            progress.report(ProgressEvent::Phase {
                phase: IngestPhase::Parsing,
                message: format!("Parsing {} rows...", rows.len()),
            });
            let columns = ColumnMap::from_header(&header);
            if !columns.is_complete() {
                let missing: Vec<&str> = columns.missing_required().iter().map(|f| f.name()).collect();
                warn!("Required columns missing: {}", missing.join(", "));
            }
            let outcomes = self.ingester.ingest(&rows, &columns, cancel)?;
            IngestReport::from_outcomes(outcomes)
        };

        {
            let _step = info_span!("score", records = report.records.len()).entered();
            progress.report(ProgressEvent::Phase {
                phase: IngestPhase::Scoring,
                message: format!("Scoring {} records...", report.records.len()),
            });
            for record in report.records.iter_mut() {
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled { stage: "scoring" });
                }
                record.upload_id = upload.id.clone();
                self.scorer.enrich(record)?;
            }
            debug!("Scored {} records", report.records.len());
        }

        let batch = {
            let _step = info_span!("persist").entered();
            progress.report(ProgressEvent::Phase {
                phase: IngestPhase::Persisting,
                message: "Saving incidents...".to_string(),
            });
            self.writer.insert_batch(&report.records, &upload.id, cancel)?
        };

        Ok((report, batch))
    }
}
