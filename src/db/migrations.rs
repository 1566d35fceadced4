//! Database migrations for genoingest
//!
//! Migrations are numbered sequentially and applied in order.
//! Schema version is tracked in the schema_version table. Only the ledger
//! lives here; source tables are created by their ingest modes.

use rusqlite::{Connection, Result};

/// A database migration
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All migrations in order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "ingest_ledger",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
  version INTEGER PRIMARY KEY
);

-- One row per ingest invocation
CREATE TABLE ingest_runs (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  source       TEXT NOT NULL,
  database     TEXT NOT NULL,
  started_at   TEXT NOT NULL,
  finished_at  TEXT,
  records      INTEGER NOT NULL DEFAULT 0,
  status       TEXT NOT NULL,
  message      TEXT
);
CREATE INDEX idx_ingest_runs_source ON ingest_runs(source);
"#,
    },
    Migration {
        version: 2,
        name: "ingest_run_files",
        sql: r#"
-- Number of input files a run read
ALTER TABLE ingest_runs ADD COLUMN files INTEGER NOT NULL DEFAULT 0;
"#,
    },
];

/// Get the current schema version from the database
pub fn get_current_version(conn: &Connection) -> Result<i32> {
    // Try to get version, return 0 if table doesn't exist
    match conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    ) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(rusqlite::Error::SqliteFailure(_, _)) => Ok(0), // Table doesn't exist
        Err(e) => Err(e),
    }
}

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_current_version(conn)?;
    let pending: Vec<_> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect();

    for migration in pending {
        tracing::debug!(version = migration.version, name = migration.name, "applying migration");

        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )?;
    }

    Ok(())
}
