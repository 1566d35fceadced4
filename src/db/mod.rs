//! Database module for genoingest
//!
//! Each configured `database` name is a SQLite file under the data
//! directory. Every file carries the ingest-run ledger next to the tables
//! the ingest modes create.

mod batch;
mod connection;
mod ledger;
mod migrations;

pub use batch::{BatchWriter, Cell, TableSpec};
pub use connection::{database_path, Database};
pub use ledger::{finish_run, list_runs, start_run, IngestRun, RunStatus};
