//! Bundled config templates and revision comparison

use serde::Serialize;
use serde_json::Value;

use super::{ConfigError, ConfigRecord, ConfigValue, Parameter, REDACTED};

pub const LATEST_REVISION: u32 = 3;

/// Template revisions in order. Each one extends the previous.
const TEMPLATES: [(u32, &str); 3] = [
    (1, include_str!("../../templates/ingest.rev1.json")),
    (2, include_str!("../../templates/ingest.rev2.json")),
    (3, include_str!("../../templates/ingest.rev3.json")),
];

/// Raw text of a bundled template
pub fn template_text(revision: u32) -> Result<&'static str, ConfigError> {
    TEMPLATES
        .iter()
        .find(|(r, _)| *r == revision)
        .map(|(_, text)| *text)
        .ok_or(ConfigError::UnknownRevision(revision))
}

pub fn template(revision: u32) -> Result<ConfigRecord, ConfigError> {
    ConfigRecord::from_json_str(template_text(revision)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub key: String,
    pub old: Value,
    pub new: Value,
}

/// Key-level difference between two records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevisionDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<ValueChange>,
}

impl RevisionDiff {
    /// The newer record keeps every key of the older one
    pub fn is_superset(&self) -> bool {
        self.removed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

pub fn diff(old: &ConfigRecord, new: &ConfigRecord) -> RevisionDiff {
    let mut result = RevisionDiff::default();

    for (key, old_value) in old.iter() {
        match new.get(key) {
            None => result.removed.push(key.to_string()),
            Some(new_value) if new_value != old_value => {
                let secret = Parameter::from_name(&key.parameter).is_some_and(|p| p.is_secret());
                let shown = |v: &ConfigValue| {
                    if secret {
                        Value::from(REDACTED)
                    } else {
                        v.to_json()
                    }
                };
                result.changed.push(ValueChange {
                    key: key.to_string(),
                    old: shown(old_value),
                    new: shown(new_value),
                });
            }
            Some(_) => {}
        }
    }

    for key in new.keys() {
        if !old.contains_key(key) {
            result.added.push(key.to_string());
        }
    }

    result
}
