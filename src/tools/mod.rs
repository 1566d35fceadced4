//! Tool implementations for genoingest
//!
//! Each tool corresponds to a CLI command and returns a serializable output.

mod check;
mod describe;
mod diff;
mod file_list;
mod ingest;
mod runs;
mod template;

pub use check::*;
pub use describe::*;
pub use diff::*;
pub use file_list::*;
pub use ingest::*;
pub use runs::*;
pub use template::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ConfigError, ConfigRecord, Substitution, SubstitutionReport};
use crate::ingest::IngestError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database not found: {}", .0.display())]
    DatabaseNotFound(PathBuf),

    #[error("Cannot serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Load a config and substitute placeholders from `root` and the environment
fn load_resolved(
    config: &Path,
    root: Option<&Path>,
) -> Result<(ConfigRecord, SubstitutionReport), ConfigError> {
    let record = ConfigRecord::load(config)?;
    Substitution::from_env(root.map(Path::to_path_buf)).apply(&record)
}
