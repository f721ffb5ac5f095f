//! Versioned schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending migration
//! runs inside its own transaction together with its bookkeeping row.

use rusqlite::{params, Connection};

use super::error::DatabaseError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_uploads",
        sql: include_str!("sql/001_create_uploads.sql"),
    },
    Migration {
        version: 2,
        name: "create_incidents",
        sql: include_str!("sql/002_create_incidents.sql"),
    },
];

/// Highest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Current schema version recorded in the database (0 when fresh).
pub fn current_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        log::info!("Applying migration v{}: {}", migration.version, migration.name);
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        conn
    }

    fn incidents_sql(conn: &Connection) -> String {
        conn.query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'incidents'",
            [],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = fresh();
        run_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn test_rerun_is_noop() {
        let conn = fresh();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();
        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_resumes_after_recorded_version() {
        let conn = fresh();
        conn.execute_batch(
            "CREATE TABLE _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute("INSERT INTO _migrations (version, name) VALUES (1, 'create_uploads')", [])
            .unwrap();

        run_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 2);
        assert!(incidents_sql(&conn).contains("automation_reasons"));
    }

    #[test]
    fn test_incident_constraints_exist() {
        let conn = fresh();
        run_all(&conn).unwrap();
        let sql = incidents_sql(&conn);
        assert!(sql.contains("UNIQUE (upload_id, incident_id)"));
        assert!(sql.contains("resolve_date >= report_date"));
    }
}
