//! Validate a config file

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{load_resolved, ToolError};
use crate::config::{env_var_name, validate, ConfigRecord, Resolution, ValidationMode};

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub config: PathBuf,
    pub mode: &'static str,
    pub valid: bool,
    pub keys: usize,
    pub sources: Vec<String>,
    /// Keys still holding `?`
    pub placeholders: Vec<String>,
    /// Environment variables that would fill those keys
    pub overrides: Vec<String>,
    pub substituted: Vec<Resolution>,
    pub issues: Vec<String>,
}

/// Template mode checks the file as written, placeholders allowed.
/// Otherwise placeholders are substituted first and must all resolve.
pub fn check_config(config: &Path, template: bool, root: Option<&Path>) -> Result<CheckOutput, ToolError> {
    let (record, substituted, mode) = if template {
        (ConfigRecord::load(config)?, Vec::new(), ValidationMode::Template)
    } else {
        let (record, report) = load_resolved(config, root)?;
        (record, report.resolved, ValidationMode::Strict)
    };

    let issues: Vec<String> = validate(&record, mode).iter().map(|e| e.to_string()).collect();
    for issue in &issues {
        tracing::debug!(issue = %issue, "validation issue");
    }

    Ok(CheckOutput {
        config: config.to_path_buf(),
        mode: match mode {
            ValidationMode::Template => "template",
            ValidationMode::Strict => "strict",
        },
        valid: issues.is_empty(),
        keys: record.len(),
        sources: record.sources().into_iter().map(String::from).collect(),
        placeholders: record.placeholders().iter().map(|k| k.to_string()).collect(),
        overrides: record.placeholders().into_iter().map(env_var_name).collect(),
        substituted,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::template_text;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_template_mode_accepts_placeholders() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingest.json");
        fs::write(&path, template_text(3).unwrap()).unwrap();

        let output = check_config(&path, true, None).unwrap();
        assert!(output.valid, "{:?}", output.issues);
        assert_eq!(output.mode, "template");
        assert!(output.placeholders.contains(&"db.password".to_string()));
        assert!(output.overrides.contains(&"GENOINGEST_DB__PASSWORD".to_string()));
        assert_eq!(output.overrides.len(), output.placeholders.len());
        assert_eq!(output.sources.len(), 8);
    }

    #[test]
    fn test_typo_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingest.json");
        fs::write(&path, r#"{"gerp.databse": "conservation"}"#).unwrap();

        let output = check_config(&path, true, None).unwrap();
        assert!(!output.valid);
        assert!(output.issues.iter().any(|i| i.contains("did you mean 'gerp.database'")));
    }

    #[test]
    fn test_missing_file() {
        let err = check_config(Path::new("/nonexistent/ingest.json"), true, None).unwrap_err();
        assert!(err.to_string().starts_with("Config file not found"));
    }
}
