//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A JSON column could not be encoded or decoded.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upload not found: {0}")]
    UploadNotFound(String),

    /// A batch insert observed cancellation; its transaction was rolled back.
    #[error("Batch insert cancelled after {processed} records; transaction rolled back")]
    Cancelled { processed: usize },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
