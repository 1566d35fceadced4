//! Configuration management for genoingest
//!
//! An ingest config is a flat JSON object of `<source>.<parameter>` keys.
//! Loading goes through three layers: the raw [`ConfigRecord`], placeholder
//! substitution, and the typed [`IngestConfig`].
//!
//! # Environment Variables
//!
//! - `GENOINGEST_ROOT`: Replaces `?` in path parameters (same as `--root`)
//! - `GENOINGEST_DATA_DIR`: Directory holding the SQLite databases (default: `.genoingest`)
//! - `GENOINGEST_LOG`: Log filter (default: `info`)
//! - `GENOINGEST_<SOURCE>__<PARAMETER>`: Overrides a single key, e.g.
//!   `GENOINGEST_DB__PASSWORD` or `GENOINGEST_GERP__BATCH_SIZE`
//!
//! `GENOINGEST_ROOT` and `GENOINGEST_DATA_DIR` are read in `main.rs`; the
//! per-key overrides are collected in `placeholder.rs`.

mod placeholder;
mod record;
mod revision;
mod schema;

pub use placeholder::*;
pub use record::*;
pub use revision::*;
pub use schema::*;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config root must be a JSON object")]
    NotAnObject,

    #[error("Malformed key '{0}': expected <source>.<parameter>")]
    MalformedKey(String),

    #[error("Unsupported value for '{key}': {kind}")]
    UnsupportedValue { key: String, kind: &'static str },

    #[error("Unknown source '{name}'{}", did_you_mean(.suggestion))]
    UnknownSource {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Unknown parameter '{key}'{}", did_you_mean(.suggestion))]
    UnknownParameter {
        key: String,
        suggestion: Option<String>,
    },

    #[error("Missing required key '{0}'")]
    MissingKey(String),

    #[error("'{key}' must be {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{key}' {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unresolved placeholders: {}", .0.join(", "))]
    UnresolvedPlaceholders(Vec<String>),

    #[error("Unknown template revision {0} (available: 1-{latest})", latest = LATEST_REVISION)]
    UnknownRevision(u32),

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ConfigError>),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}
