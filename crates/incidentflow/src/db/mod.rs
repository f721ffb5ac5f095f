//! SQLite incident store: uploads, incidents and their schema migrations.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

pub mod error;
pub mod incident_repo;
pub mod migrations;
pub mod upload_repo;

pub use error::DatabaseError;
pub use incident_repo::{BatchWriter, SqliteBatchWriter};

/// Shared handle to the incident store.
///
/// One connection behind a mutex; clones share it. A batch insert holds the
/// lock for its whole transaction, so job workers write one at a time.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Where a connection points; file stores journal in WAL mode and wait on
/// other processes instead of failing with `SQLITE_BUSY`.
#[derive(Clone, Copy)]
enum Location<'a> {
    File(&'a Path),
    Memory,
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl Database {
    /// Opens or creates the store at `path`, creating missing parent
    /// directories, and brings the schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Self::init(Connection::open(path)?, Location::File(path))
    }

    /// Private in-memory store with the full schema.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?, Location::Memory)
    }

    fn init(conn: Connection, location: Location<'_>) -> Result<Self, DatabaseError> {
        configure(&conn, location)?;
        migrations::run_all(&conn)?;

        if let Location::File(path) = location {
            log::info!(
                "Incident store at {} (schema v{})",
                path.display(),
                migrations::current_version(&conn)?
            );
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with the connection locked.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// Per-connection settings. Incidents cascade with their upload, so foreign
/// keys must be enforced on every connection.
fn configure(conn: &Connection, location: Location<'_>) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "foreign_keys", true)?;
    if let Location::File(_) = location {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("journal_mode={}", mode);
        conn.busy_timeout(BUSY_TIMEOUT)?;
    }
    Ok(())
}

/// Returns the default database path: `~/.incidentflow/data/incidentflow.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".incidentflow").join("data").join("incidentflow.db"))
}
