//! Compare two config revisions

use serde::Serialize;
use std::path::Path;

use super::ToolError;
use crate::config::{diff, template, ConfigError, ConfigRecord, RevisionDiff};

#[derive(Debug, Serialize)]
pub struct DiffOutput {
    pub old: String,
    pub new: String,
    /// The new config keeps every key of the old one
    pub superset: bool,
    pub identical: bool,
    #[serde(flatten)]
    pub diff: RevisionDiff,
}

/// `@N` names bundled template revision N, anything else is a file path
fn load_side(spec: &str) -> Result<ConfigRecord, ConfigError> {
    match spec.strip_prefix('@') {
        Some(rev) => {
            let revision = rev.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: spec.to_string(),
                reason: "template references look like @1, @2, @3".to_string(),
            })?;
            template(revision)
        }
        None => ConfigRecord::load(Path::new(spec)),
    }
}

pub fn diff_configs(old: &str, new: &str) -> Result<DiffOutput, ToolError> {
    let old_record = load_side(old)?;
    let new_record = load_side(new)?;
    let diff = diff(&old_record, &new_record);

    if !diff.is_superset() {
        tracing::warn!(removed = diff.removed.len(), "new config drops keys");
    }

    Ok(DiffOutput {
        old: old.to_string(),
        new: new.to_string(),
        superset: diff.is_superset(),
        identical: diff.is_empty(),
        diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_bundled_revisions_only_grow() {
        let output = diff_configs("@1", "@3").unwrap();
        assert!(output.superset);
        assert!(!output.identical);
        assert!(!output.diff.added.is_empty());
        assert!(output.diff.removed.is_empty());
    }

    #[test]
    fn test_removed_and_changed_keys() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.json");
        let new = dir.path().join("new.json");
        fs::write(&old, r#"{"gerp.database": "conservation", "gerp.batch_size": 1000}"#).unwrap();
        fs::write(&new, r#"{"gerp.database": "gerp"}"#).unwrap();

        let output = diff_configs(old.to_str().unwrap(), new.to_str().unwrap()).unwrap();
        assert!(!output.superset);
        assert_eq!(output.diff.removed, vec!["gerp.batch_size".to_string()]);
        assert_eq!(output.diff.changed.len(), 1);
        assert_eq!(output.diff.changed[0].key, "gerp.database");
    }

    #[test]
    fn test_same_revision_is_identical() {
        let output = diff_configs("@2", "@2").unwrap();
        assert!(output.identical);
        assert!(output.superset);
    }

    #[test]
    fn test_bad_template_reference() {
        assert!(diff_configs("@x", "@3").is_err());
        assert!(diff_configs("@9", "@3").is_err());
    }
}
