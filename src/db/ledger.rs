//! Ingest-run ledger

use chrono::Utc;
use rusqlite::{params, Connection, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Done,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRun {
    pub id: i64,
    pub source: String,
    pub database: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub records: i64,
    pub files: i64,
    pub status: String,
    pub message: Option<String>,
}

/// Record the start of a run and return its id
pub fn start_run(conn: &Connection, source: &str, database: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO ingest_runs (source, database, started_at, status) VALUES (?1, ?2, ?3, ?4)",
        params![source, database, Utc::now().to_rfc3339(), RunStatus::Running.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_run(
    conn: &Connection,
    id: i64,
    status: RunStatus,
    records: u64,
    files: usize,
    message: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, status = ?2, records = ?3, files = ?4, message = ?5
         WHERE id = ?6",
        params![
            Utc::now().to_rfc3339(),
            status.as_str(),
            records as i64,
            files as i64,
            message,
            id
        ],
    )?;
    Ok(())
}

/// Most recent runs first
pub fn list_runs(conn: &Connection, limit: usize) -> Result<Vec<IngestRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, source, database, started_at, finished_at, records, files, status, message
         FROM ingest_runs
         ORDER BY id DESC
         LIMIT ?1",
    )?;
    let runs = stmt
        .query_map([limit as i64], |row| {
            Ok(IngestRun {
                id: row.get(0)?,
                source: row.get(1)?,
                database: row.get(2)?,
                started_at: row.get(3)?,
                finished_at: row.get(4)?,
                records: row.get(5)?,
                files: row.get(6)?,
                status: row.get(7)?,
                message: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(runs)
}
