//! Incident repository and the dedup-aware batch writer.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, ErrorCode, Row};

use super::{Database, DatabaseError};
use crate::cancel::CancelFlag;
use crate::model::{
    AutomationAssessment, BatchInsertResult, BatchOutcome, IncidentRecord, Priority,
    ProcessGroup, SentimentLabel, SentimentScore, ValidationError, ValidationKind,
};

/// Persists a batch of validated records for one upload.
pub trait BatchWriter: Send + Sync {
    fn insert_batch(
        &self,
        records: &[IncidentRecord],
        upload_id: &str,
        cancel: &CancelFlag,
    ) -> Result<BatchInsertResult, DatabaseError>;
}

/// SQLite batch writer.
///
/// All records go through one transaction, row by row in input order:
/// an identifier already seen earlier in the batch is a `duplicate_in_batch`
/// error, one already stored for the same upload is `already_exists`, and an
/// insert that trips a constraint anyway is recorded instead of aborting.
/// The transaction commits only when at least one row was inserted.
#[derive(Clone)]
pub struct SqliteBatchWriter {
    db: Database,
}

impl BatchWriter for SqliteBatchWriter {
    fn insert_batch(
        &self,
        records: &[IncidentRecord],
        upload_id: &str,
        cancel: &CancelFlag,
    ) -> Result<BatchInsertResult, DatabaseError> {
        self.insert_observed(records, upload_id, cancel, |_| {})
    }
}

impl SqliteBatchWriter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// [`BatchWriter::insert_batch`] that calls `on_record(handled)` after
    /// each record, whether it was inserted or rejected.
    pub fn insert_observed<F>(
        &self,
        records: &[IncidentRecord],
        upload_id: &str,
        cancel: &CancelFlag,
        on_record: F,
    ) -> Result<BatchInsertResult, DatabaseError>
    where
        F: Fn(usize),
    {
        if records.is_empty() {
            return Ok(BatchInsertResult::empty());
        }

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
            let mut inserted = 0usize;
            let mut errors = Vec::new();

            for (processed, record) in records.iter().enumerate() {
                if cancel.is_cancelled() {
                    tx.rollback()?;
                    log::warn!(
                        "Batch insert for upload {} cancelled after {} records",
                        upload_id,
                        processed
                    );
                    return Err(DatabaseError::Cancelled { processed });
                }

                match write_one(&tx, upload_id, record, &mut seen) {
                    Ok(()) => inserted += 1,
                    Err(error) => errors.push(error),
                }
                on_record(processed + 1);
            }

            let outcome = if inserted > 0 {
                tx.commit()?;
                BatchOutcome::Committed
            } else {
                tx.rollback()?;
                BatchOutcome::AllRejected
            };

            log::info!(
                "Batch insert for upload {}: {} inserted, {} rejected",
                upload_id,
                inserted,
                errors.len()
            );

            Ok(BatchInsertResult {
                inserted_count: inserted,
                errors,
                success: outcome == BatchOutcome::Committed,
                outcome,
            })
        })
    }
}

/// Dedup checks then insert, for one record inside the batch transaction.
fn write_one<'a>(
    conn: &Connection,
    upload_id: &str,
    record: &'a IncidentRecord,
    seen: &mut HashSet<&'a str>,
) -> Result<(), ValidationError> {
    if !seen.insert(record.incident_id.as_str()) {
        return Err(duplicate_error(
            record,
            ValidationKind::DuplicateInBatch,
            "duplicate incident id within this upload",
        ));
    }

    match exists(conn, upload_id, &record.incident_id) {
        Ok(true) => {
            return Err(duplicate_error(
                record,
                ValidationKind::AlreadyExists,
                "incident already exists for this upload",
            ))
        }
        Ok(false) => {}
        Err(e) => return Err(storage_error(record, &e)),
    }

    insert_record(conn, upload_id, record).map_err(|e| {
        log::debug!("Insert of {} rejected: {}", record.incident_id, e);
        insert_failure(record, &e)
    })
}

fn exists(conn: &Connection, upload_id: &str, incident_id: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM incidents WHERE incident_id = ?1 AND upload_id = ?2",
        params![incident_id, upload_id],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

fn insert_record(
    conn: &Connection,
    upload_id: &str,
    record: &IncidentRecord,
) -> rusqlite::Result<()> {
    let sentiment = record.sentiment.as_ref();
    let automation = record.automation.as_ref();
    let reasons = automation
        .map(|a| serde_json::to_string(&a.reasons))
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    conn.execute(
        "INSERT INTO incidents (id, upload_id, incident_id, source_row, report_date,
         resolve_date, last_resolve_date, brief_description, description, application_name,
         resolution_group, resolved_person, priority, category, subcategory, status,
         root_cause, resolution_notes, resolution_hours, sentiment_score, sentiment_label,
         automation_score, automation_feasible, it_process_group, automation_confidence,
         automation_reasons, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
        params![
            record.id,
            upload_id,
            record.incident_id,
            record.source_row as i64,
            record.report_date,
            record.resolve_date,
            record.last_resolve_date,
            record.brief_description,
            record.description,
            record.application_name,
            record.resolution_group,
            record.resolved_person,
            record.priority.as_str(),
            record.category,
            record.subcategory,
            record.status,
            record.root_cause,
            record.resolution_notes,
            record.resolution_hours(),
            sentiment.map(|s| s.score),
            sentiment.map(|s| s.label.as_str()),
            automation.map(|a| a.score),
            automation.map(|a| a.feasible),
            automation.map(|a| a.process_group.as_str()),
            automation.map(|a| a.confidence),
            reasons,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

fn duplicate_error(record: &IncidentRecord, kind: ValidationKind, message: &str) -> ValidationError {
    ValidationError::new(kind, "incident_id", record.incident_id.clone(), message)
        .at_row(record.source_row)
}

fn storage_error(record: &IncidentRecord, err: &rusqlite::Error) -> ValidationError {
    ValidationError::new(
        ValidationKind::Storage,
        "incident_id",
        record.incident_id.clone(),
        format!("storage error: {}", err),
    )
    .at_row(record.source_row)
}

/// Maps a failed insert to a row error. Uniqueness collisions (a concurrent
/// writer won the race) read as `already_exists`; anything else is `storage`.
fn insert_failure(record: &IncidentRecord, err: &rusqlite::Error) -> ValidationError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            let unique = failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
            if unique {
                return duplicate_error(
                    record,
                    ValidationKind::AlreadyExists,
                    "incident already exists for this upload",
                );
            }
            return ValidationError::new(
                ValidationKind::Storage,
                "incident_id",
                record.incident_id.clone(),
                format!("constraint violation: {}", err),
            )
            .at_row(record.source_row);
        }
    }
    storage_error(record, err)
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn from_row(row: &Row<'_>) -> Result<IncidentRecord, rusqlite::Error> {
    let priority: String = row.get("priority")?;
    let priority = Priority::parse(&priority)
        .ok_or_else(|| conversion_error(12, format!("unknown priority '{}'", priority)))?;

    let sentiment_score: Option<f64> = row.get("sentiment_score")?;
    let sentiment_label: Option<String> = row.get("sentiment_label")?;
    let sentiment = match (sentiment_score, sentiment_label) {
        (Some(score), Some(label)) => Some(SentimentScore {
            score,
            label: SentimentLabel::parse(&label)
                .ok_or_else(|| conversion_error(20, format!("unknown label '{}'", label)))?,
        }),
        _ => None,
    };

    let automation_score: Option<f64> = row.get("automation_score")?;
    let automation = match automation_score {
        Some(score) => {
            let group: Option<String> = row.get("it_process_group")?;
            let process_group = match group {
                Some(name) => ProcessGroup::parse(&name)
                    .ok_or_else(|| conversion_error(23, format!("unknown group '{}'", name)))?,
                None => ProcessGroup::DEFAULT,
            };
            let reasons: Option<String> = row.get("automation_reasons")?;
            let reasons = match reasons {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(25, Type::Text, Box::new(e))
                })?,
                None => Vec::new(),
            };
            Some(AutomationAssessment {
                score,
                feasible: row.get::<_, Option<bool>>("automation_feasible")?.unwrap_or(false),
                process_group,
                confidence: row
                    .get::<_, Option<f64>>("automation_confidence")?
                    .unwrap_or(0.0),
                reasons,
            })
        }
        None => None,
    };

    let source_row: i64 = row.get("source_row")?;

    Ok(IncidentRecord {
        id: row.get("id")?,
        upload_id: row.get("upload_id")?,
        incident_id: row.get("incident_id")?,
        source_row: usize::try_from(source_row).unwrap_or(0),
        report_date: row.get("report_date")?,
        resolve_date: row.get("resolve_date")?,
        last_resolve_date: row.get("last_resolve_date")?,
        brief_description: row.get("brief_description")?,
        description: row.get("description")?,
        application_name: row.get("application_name")?,
        resolution_group: row.get("resolution_group")?,
        resolved_person: row.get("resolved_person")?,
        priority,
        category: row.get("category")?,
        subcategory: row.get("subcategory")?,
        status: row.get("status")?,
        root_cause: row.get("root_cause")?,
        resolution_notes: row.get("resolution_notes")?,
        resolution_hours: row.get("resolution_hours")?,
        sentiment,
        automation,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// All incidents of an upload in source-row order.
pub fn find_by_upload(db: &Database, upload_id: &str) -> Result<Vec<IncidentRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM incidents WHERE upload_id = ?1 ORDER BY source_row, incident_id",
        )?;
        let records = stmt
            .query_map(params![upload_id], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    })
}

pub fn count_by_upload(db: &Database, upload_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM incidents WHERE upload_id = ?1",
            params![upload_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Removes every incident of an upload. Returns the number of rows deleted.
pub fn delete_by_upload(db: &Database, upload_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM incidents WHERE upload_id = ?1",
            params![upload_id],
        )?;
        Ok(deleted)
    })
}

pub fn update_sentiment(
    db: &Database,
    id: &str,
    sentiment: &SentimentScore,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE incidents SET sentiment_score = ?2, sentiment_label = ?3, updated_at = ?4
             WHERE id = ?1",
            params![id, sentiment.score, sentiment.label.as_str(), Utc::now()],
        )?;
        Ok(changed > 0)
    })
}

pub fn update_automation(
    db: &Database,
    id: &str,
    automation: &AutomationAssessment,
) -> Result<bool, DatabaseError> {
    let reasons = serde_json::to_string(&automation.reasons)?;
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE incidents SET automation_score = ?2, automation_feasible = ?3,
             it_process_group = ?4, automation_confidence = ?5, automation_reasons = ?6,
             updated_at = ?7
             WHERE id = ?1",
            params![
                id,
                automation.score,
                automation.feasible,
                automation.process_group.as_str(),
                automation.confidence,
                reasons,
                Utc::now(),
            ],
        )?;
        Ok(changed > 0)
    })
}
