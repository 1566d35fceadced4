//! Database connection management for genoingest

use rusqlite::{Connection, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::migrations::apply_migrations;

/// File that holds the database `name`
pub fn database_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{}.db", name))
}

/// An open ingest database with the ledger migrations applied
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open or create `<data_dir>/<name>.db`
    pub fn open(data_dir: &Path, name: &str) -> Result<Self> {
        let path = database_path(data_dir, name);

        // Ensure directory exists
        if !data_dir.as_os_str().is_empty() {
            fs::create_dir_all(data_dir).map_err(|e| {
                let message = format!("Cannot create data directory {}: {}", data_dir.display(), e);
                rusqlite::Error::ToSqlConversionFailure(Box::new(io::Error::new(e.kind(), message)))
            })?;
        }

        let conn = Connection::open(&path)?;

        // Bulk loads write far more than they read
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        apply_migrations(&conn)?;
        tracing::debug!(path = %path.display(), "opened database");

        Ok(Self { conn, path })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
