//! Ingest modes
//!
//! Each data source has a mode that streams its input files into tables of
//! the source's database. [`run`] opens the database, records the run in the
//! ledger, and dispatches to the mode.

mod gerp;
mod gnomad;
mod gtex;
mod pharmgkb;
mod reference;
mod retab;
mod spliceai;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::config::{ConfigError, IngestConfig, Source};
use crate::db::{self, Database, RunStatus};
use crate::readers::ReadError;

/// Progress is logged every this many batches
pub const REPORT_EVERY: usize = 100;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("'{}' is not an ingest mode", .0.as_str())]
    NotAMode(Source),

    #[error("No '{}' settings in config", .0.as_str())]
    NotConfigured(Source),

    #[error("{}: {message}", .path.display())]
    Input { path: PathBuf, message: String },

    #[error("Cannot read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl IngestError {
    fn input(path: &Path, message: impl Into<String>) -> Self {
        IngestError::Input {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// What a mode read and wrote
#[derive(Debug, Default)]
pub struct Tally {
    pub files: Vec<PathBuf>,
    pub tables: BTreeMap<String, u64>,
}

impl Tally {
    fn file(&mut self, path: &Path) {
        self.files.push(path.to_path_buf());
    }

    fn add(&mut self, table: &str, rows: u64) {
        *self.tables.entry(table.to_string()).or_default() += rows;
    }

    pub fn records(&self) -> u64 {
        self.tables.values().sum()
    }
}

#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub source: Source,
    pub database: String,
    pub database_path: PathBuf,
    pub run_id: i64,
    pub files: Vec<PathBuf>,
    pub tables: BTreeMap<String, u64>,
    pub records: u64,
    pub elapsed_secs: f64,
}

/// Run one ingest mode against `<data_dir>/<database>.db`
pub fn run(source: Source, config: &IngestConfig, data_dir: &Path) -> Result<IngestReport, IngestError> {
    if !source.is_ingest_mode() {
        return Err(IngestError::NotAMode(source));
    }
    let database = config
        .database_for(source)
        .ok_or(IngestError::NotConfigured(source))?;

    if let Some(conn) = &config.db {
        tracing::debug!(server = %conn.target(), "connection settings validated");
    }

    let db = Database::open(data_dir, database)?;
    let run_id = db::start_run(db.conn(), source.as_str(), database)?;
    tracing::info!(mode = source.as_str(), database, run_id, "ingest started");

    let started = Instant::now();
    let baseline = db.conn().total_changes();
    let mut tally = Tally::default();
    let result = dispatch(source, config, &db, &mut tally);

    match result {
        Ok(()) => {
            db::finish_run(db.conn(), run_id, RunStatus::Done, tally.records(), tally.files.len(), None)?;
            let report = IngestReport {
                source,
                database: database.to_string(),
                database_path: db.path().to_path_buf(),
                run_id,
                records: tally.records(),
                files: tally.files,
                tables: tally.tables,
                elapsed_secs: started.elapsed().as_secs_f64(),
            };
            tracing::info!(mode = source.as_str(), records = report.records, "ingest finished");
            Ok(report)
        }
        Err(e) => {
            // Batches already committed stay in the database
            let committed = db.conn().total_changes() - baseline;
            let message = e.to_string();
            if let Err(ledger_err) = db::finish_run(
                db.conn(),
                run_id,
                RunStatus::Failed,
                committed,
                tally.files.len(),
                Some(&message),
            ) {
                tracing::warn!(error = %ledger_err, "could not record failed run");
            }
            Err(e)
        }
    }
}

fn dispatch(
    source: Source,
    config: &IngestConfig,
    db: &Database,
    tally: &mut Tally,
) -> Result<(), IngestError> {
    let conn = db.conn();
    match source {
        Source::Db => Err(IngestError::NotAMode(source)),
        Source::Hg19 => reference::ingest(conn, source, settings(config.hg19.as_ref(), source)?, tally),
        Source::Hg38 => reference::ingest(conn, source, settings(config.hg38.as_ref(), source)?, tally),
        Source::Gerp => gerp::ingest(conn, settings(config.gerp.as_ref(), source)?, tally),
        Source::Gnomad => gnomad::ingest(conn, settings(config.gnomad.as_ref(), source)?, tally),
        Source::Pharmgkb => pharmgkb::ingest(conn, settings(config.pharmgkb.as_ref(), source)?, tally),
        Source::Gtex => gtex::ingest(conn, settings(config.gtex.as_ref(), source)?, tally),
        Source::Spliceai => spliceai::ingest(conn, settings(config.spliceai.as_ref(), source)?, tally),
    }
}

fn settings<T>(section: Option<&T>, source: Source) -> Result<&T, IngestError> {
    section.ok_or(IngestError::NotConfigured(source))
}

/// Fields of a tab-separated line
fn tsv_fields(line: &str) -> Vec<&str> {
    line.split('\t').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatchFilesSettings, DbConnection};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_db_is_not_a_mode() {
        let dir = tempdir().unwrap();
        let err = run(Source::Db, &IngestConfig::default(), dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::NotAMode(Source::Db)));
    }

    #[test]
    fn test_unconfigured_mode() {
        let dir = tempdir().unwrap();
        let err = run(Source::Gtex, &IngestConfig::default(), dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "No 'gtex' settings in config");
    }

    #[test]
    fn test_run_records_ledger() {
        let dir = tempdir().unwrap();
        let rates = dir.path().join("chr21.maf.rates");
        fs::write(&rates, "1.5\t0.2\nNA\tNA\n").unwrap();

        let config = IngestConfig {
            db: Some(DbConnection {
                host: "localhost".into(),
                port: 3306,
                user: "loader".into(),
                password: "secret".into(),
            }),
            gerp: Some(BatchFilesSettings {
                database: "conservation".into(),
                batch_size: 10,
                file_list: vec![rates.to_string_lossy().into_owned()],
            }),
            ..Default::default()
        };

        let data_dir = dir.path().join("data");
        let report = run(Source::Gerp, &config, &data_dir).unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.tables.get("GERP"), Some(&2));
        assert_eq!(report.database_path, data_dir.join("conservation.db"));

        let db = Database::open(&data_dir, "conservation").unwrap();
        let runs = db::list_runs(db.conn(), 10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, "done");
        assert_eq!(runs[0].records, 2);
        assert_eq!(runs[0].files, 1);
    }

    #[test]
    fn test_failed_run_is_recorded() {
        let dir = tempdir().unwrap();
        let config = IngestConfig {
            gerp: Some(BatchFilesSettings {
                database: "conservation".into(),
                batch_size: 10,
                file_list: vec![dir.path().join("missing.rates").to_string_lossy().into_owned()],
            }),
            ..Default::default()
        };

        assert!(run(Source::Gerp, &config, dir.path()).is_err());

        let db = Database::open(dir.path(), "conservation").unwrap();
        let runs = db::list_runs(db.conn(), 10).unwrap();
        assert_eq!(runs[0].status, "failed");
        assert!(runs[0].message.is_some());
    }

    #[test]
    fn test_failed_run_records_committed_rows() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("chr1.maf.rates"), "1\t1\n2\t2\n").unwrap();
        // batches of one commit lines 1 and 2 before line 3 fails
        fs::write(dir.path().join("chr2.maf.rates"), "1\t1\n2\t2\nbad\n").unwrap();

        let config = IngestConfig {
            gerp: Some(BatchFilesSettings {
                database: "conservation".into(),
                batch_size: 1,
                file_list: vec![format!("{}/chr*.maf.rates", dir.path().display())],
            }),
            ..Default::default()
        };

        let data_dir = dir.path().join("data");
        let err = run(Source::Gerp, &config, &data_dir).unwrap_err();
        assert!(err.to_string().contains("chr2.maf.rates:3"));

        let db = Database::open(&data_dir, "conservation").unwrap();
        let stored: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM GERP", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 4);

        let runs = db::list_runs(db.conn(), 10).unwrap();
        assert_eq!(runs[0].status, "failed");
        assert_eq!(runs[0].records, 4);
        assert_eq!(runs[0].files, 1);
    }
}
