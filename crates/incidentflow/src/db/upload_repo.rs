//! Upload repository: metadata rows for uploaded spreadsheets.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::model::{UploadRecord, UploadStatus};

fn from_row(row: &Row<'_>) -> Result<UploadRecord, rusqlite::Error> {
    let status: String = row.get("status")?;
    let status = UploadStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown upload status '{}'", status).into(),
        )
    })?;
    let errors: String = row.get("errors")?;
    let errors: Vec<String> = serde_json::from_str(&errors)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(UploadRecord {
        id: row.get("id")?,
        filename: row.get("filename")?,
        original_filename: row.get("original_filename")?,
        status,
        record_count: row.get("record_count")?,
        processed_count: row.get("processed_count")?,
        error_count: row.get("error_count")?,
        errors,
        created_at: row.get("created_at")?,
        processed_at: row.get("processed_at")?,
    })
}

pub fn insert(db: &Database, upload: &UploadRecord) -> Result<(), DatabaseError> {
    let errors = serde_json::to_string(&upload.errors)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO uploads (id, filename, original_filename, status, record_count,
             processed_count, error_count, errors, created_at, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                upload.id,
                upload.filename,
                upload.original_filename,
                upload.status.as_str(),
                upload.record_count,
                upload.processed_count,
                upload.error_count,
                errors,
                upload.created_at,
                upload.processed_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<UploadRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let upload = conn
            .query_row("SELECT * FROM uploads WHERE id = ?1", params![id], from_row)
            .optional()?;
        Ok(upload)
    })
}

/// Like [`find_by_id`] but a missing row is an error.
pub fn get(db: &Database, id: &str) -> Result<UploadRecord, DatabaseError> {
    find_by_id(db, id)?.ok_or_else(|| DatabaseError::UploadNotFound(id.to_string()))
}

/// Sets only the status column. Returns false if no such upload exists.
pub fn update_status(db: &Database, id: &str, status: UploadStatus) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE uploads SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(changed > 0)
    })
}

/// Records the final outcome of processing an upload.
pub fn finish(
    db: &Database,
    id: &str,
    status: UploadStatus,
    record_count: u64,
    processed_count: u64,
    errors: &[String],
) -> Result<bool, DatabaseError> {
    let encoded = serde_json::to_string(errors)?;
    let processed_at: DateTime<Utc> = Utc::now();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE uploads SET status = ?2, record_count = ?3, processed_count = ?4,
             error_count = ?5, errors = ?6, processed_at = ?7
             WHERE id = ?1",
            params![
                id,
                status.as_str(),
                record_count,
                processed_count,
                errors.len() as u64,
                encoded,
                processed_at,
            ],
        )?;
        Ok(changed > 0)
    })
}

/// Puts an upload back to `uploaded` with cleared counters, errors and
/// processing time, as if it had never been processed.
pub fn reset(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE uploads SET status = ?2, record_count = 0, processed_count = 0,
             error_count = 0, errors = '[]', processed_at = NULL
             WHERE id = ?1",
            params![id, UploadStatus::Uploaded.as_str()],
        )?;
        Ok(changed > 0)
    })
}

/// Most recent uploads first.
pub fn list_recent(db: &Database, limit: u32) -> Result<Vec<UploadRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM uploads ORDER BY created_at DESC LIMIT ?1")?;
        let uploads = stmt
            .query_map(params![limit], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(uploads)
    })
}
