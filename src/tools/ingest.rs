//! Load one data source into its database

use std::path::Path;

use super::{load_resolved, ToolError};
use crate::config::{IngestConfig, Source};
use crate::ingest::{self, IngestReport};

pub fn run_ingest(
    config: &Path,
    mode: Source,
    root: Option<&Path>,
    data_dir: &Path,
) -> Result<IngestReport, ToolError> {
    let (record, report) = load_resolved(config, root)?;
    for resolution in &report.resolved {
        tracing::debug!(key = %resolution.key, "placeholder resolved");
    }
    let settings = IngestConfig::from_record(&record)?;
    Ok(ingest::run(mode, &settings, data_dir)?)
}
