//! Show the ingest ledger of a database

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::ToolError;
use crate::db::{self, database_path, Database, IngestRun};

#[derive(Debug, Serialize)]
pub struct RunsOutput {
    pub database: String,
    pub path: PathBuf,
    pub runs: Vec<IngestRun>,
    pub total: i64,
}

pub fn list_ingest_runs(data_dir: &Path, database: &str, limit: usize) -> Result<RunsOutput, ToolError> {
    let path = database_path(data_dir, database);
    if !path.exists() {
        return Err(ToolError::DatabaseNotFound(path));
    }

    let db = Database::open(data_dir, database)?;
    let runs = db::list_runs(db.conn(), limit)?;
    let total: i64 = db
        .conn()
        .query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| row.get(0))?;

    Ok(RunsOutput {
        database: database.to_string(),
        path,
        runs,
        total,
    })
}
