//! Print the typed configuration

use serde::Serialize;
use std::path::Path;

use super::{load_resolved, ToolError};
use crate::config::{IngestConfig, Source};

#[derive(Debug, Serialize)]
pub struct DescribeOutput {
    /// `user@host:port` of the configured server, password omitted
    pub connection: Option<String>,
    pub modes: Vec<Source>,
    pub settings: IngestConfig,
}

pub fn describe_config(config: &Path, root: Option<&Path>) -> Result<DescribeOutput, ToolError> {
    let (record, _) = load_resolved(config, root)?;
    let settings = IngestConfig::from_record(&record)?;

    Ok(DescribeOutput {
        connection: settings.db.as_ref().map(|db| db.target()),
        modes: settings.configured_modes(),
        settings,
    })
}
