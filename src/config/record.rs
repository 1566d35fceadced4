//! The raw configuration record: dotted keys mapped to scalar or list values.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

use super::ConfigError;

/// Marks a value that still needs a deployment-specific substitution
pub const PLACEHOLDER: char = '?';

/// A `<source>.<parameter>` key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    pub source: String,
    pub parameter: String,
}

impl ConfigKey {
    pub fn new(source: &str, parameter: &str) -> Self {
        Self {
            source: source.to_string(),
            parameter: parameter.to_string(),
        }
    }

    /// Parse a dotted key. Exactly one dot, both halves non-empty.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut parts = raw.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(source), Some(parameter), None) if !source.is_empty() && !parameter.is_empty() => {
                Ok(Self::new(source, parameter))
            }
            _ => Err(ConfigError::MalformedKey(raw.to_string())),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.parameter)
    }
}

/// A config value: string, integer, or list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl ConfigValue {
    fn from_json(key: &str, value: &Value) -> Result<Self, ConfigError> {
        let unsupported = |kind| ConfigError::UnsupportedValue {
            key: key.to_string(),
            kind,
        };
        match value {
            Value::String(s) => Ok(ConfigValue::Str(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(ConfigValue::Int)
                .ok_or_else(|| unsupported("non-integer number")),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(ConfigValue::List)
                .ok_or_else(|| unsupported("list with non-string elements")),
            Value::Bool(_) => Err(unsupported("boolean")),
            Value::Null => Err(unsupported("null")),
            Value::Object(_) => Err(unsupported("nested object")),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::Int(n) => Value::from(*n),
            ConfigValue::Str(s) => Value::from(s.as_str()),
            ConfigValue::List(items) => Value::from(items.clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Int(_) => "an integer",
            ConfigValue::Str(_) => "a string",
            ConfigValue::List(_) => "a list",
        }
    }

    /// True when the value, or any list element, still carries a `?`
    pub fn has_placeholder(&self) -> bool {
        match self {
            ConfigValue::Int(_) => false,
            ConfigValue::Str(s) => s.contains(PLACEHOLDER),
            ConfigValue::List(items) => items.iter().any(|s| s.contains(PLACEHOLDER)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// An ordered configuration record. Keys keep their document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigRecord {
    entries: Vec<(ConfigKey, ConfigValue)>,
}

impl ConfigRecord {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_json::from_str(text)?;
        let object = root.as_object().ok_or(ConfigError::NotAnObject)?;

        let mut record = ConfigRecord::default();
        for (raw_key, value) in object {
            let key = ConfigKey::parse(raw_key)?;
            let value = ConfigValue::from_json(raw_key, value)?;
            record.set(key, value);
        }
        Ok(record)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let record = Self::from_json_str(&text)?;
        if record.is_empty() {
            tracing::warn!(path = %path.display(), "config file has no keys");
        }
        Ok(record)
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_by(&self, source: &str, parameter: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.source == source && k.parameter == parameter)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &ConfigKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. A replaced key keeps its position.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConfigKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct source prefixes in order of first appearance
    pub fn sources(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for key in self.keys() {
            if !seen.contains(&key.source.as_str()) {
                seen.push(&key.source);
            }
        }
        seen
    }

    /// Keys whose value still holds a placeholder
    pub fn placeholders(&self) -> Vec<&ConfigKey> {
        self.entries
            .iter()
            .filter(|(_, v)| v.has_placeholder())
            .map(|(k, _)| k)
            .collect()
    }
}
