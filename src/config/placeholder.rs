//! Placeholder substitution
//!
//! A `?` in a config value marks something the deployment must supply.
//! Path parameters get the data root spliced in; any key can be overridden
//! from the environment with `GENOINGEST_<SOURCE>__<PARAMETER>`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{
    ConfigError, ConfigKey, ConfigRecord, ConfigValue, Parameter, Source, ValueType, PLACEHOLDER,
};

/// Prefix of every genoingest environment variable
pub const ENV_PREFIX: &str = "GENOINGEST_";

/// Separates source from parameter in override variable names
const ENV_SEPARATOR: &str = "__";

/// Environment variable that overrides `key`
pub fn env_var_name(key: &ConfigKey) -> String {
    format!(
        "{}{}{}{}",
        ENV_PREFIX,
        key.source.to_uppercase(),
        ENV_SEPARATOR,
        key.parameter.to_uppercase()
    )
}

fn key_from_env_var(name: &str) -> Option<ConfigKey> {
    let rest = name.strip_prefix(ENV_PREFIX)?;
    let (source, parameter) = rest.split_once(ENV_SEPARATOR)?;
    if source.is_empty() || parameter.is_empty() {
        return None;
    }
    Some(ConfigKey::new(&source.to_lowercase(), &parameter.to_lowercase()))
}

/// Where a substituted value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Env,
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub key: String,
    pub origin: Origin,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubstitutionReport {
    pub resolved: Vec<Resolution>,
    pub unresolved: Vec<String>,
}

/// Substitution inputs: the data root and the per-key overrides
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    root: Option<PathBuf>,
    overrides: BTreeMap<ConfigKey, String>,
}

impl Substitution {
    /// Collect overrides from the process environment
    pub fn from_env(root: Option<PathBuf>) -> Self {
        Self::from_vars(root, std::env::vars())
    }

    pub fn from_vars(root: Option<PathBuf>, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let overrides = vars
            .into_iter()
            .filter_map(|(name, value)| key_from_env_var(&name).map(|key| (key, value)))
            .collect();
        Self { root, overrides }
    }

    /// Produce a resolved copy of `record`
    pub fn apply(&self, record: &ConfigRecord) -> Result<(ConfigRecord, SubstitutionReport), ConfigError> {
        let mut resolved = record.clone();
        let mut report = SubstitutionReport::default();

        for (key, raw) in &self.overrides {
            let Some(value) = override_value(record, key, raw)? else {
                tracing::debug!(key = %key, "ignoring override for unknown key");
                continue;
            };
            resolved.set(key.clone(), value);
            report.resolved.push(Resolution {
                key: key.to_string(),
                origin: Origin::Env,
            });
        }

        if let Some(root) = &self.root {
            let root = root.to_string_lossy();
            let keys: Vec<ConfigKey> = resolved.placeholders().into_iter().cloned().collect();
            for key in keys {
                let path_like = Parameter::from_name(&key.parameter).is_some_and(|p| p.is_path_like());
                if !path_like {
                    continue;
                }
                if let Some(value) = resolved.get(&key).map(|v| splice_root(v, &root)) {
                    resolved.set(key.clone(), value);
                    report.resolved.push(Resolution {
                        key: key.to_string(),
                        origin: Origin::Root,
                    });
                }
            }
        }

        report.unresolved = resolved.placeholders().iter().map(|k| k.to_string()).collect();
        Ok((resolved, report))
    }
}

/// Type an override after the value it replaces, or after the parameter
/// when the key is absent. Unknown keys yield `None`.
fn override_value(record: &ConfigRecord, key: &ConfigKey, raw: &str) -> Result<Option<ConfigValue>, ConfigError> {
    let as_int = || {
        raw.trim().parse::<i64>().map(ConfigValue::Int).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("override '{}' is not an integer", raw),
        })
    };
    let as_list = || ConfigValue::List(raw.split(',').map(|s| s.trim().to_string()).collect());

    let value = match record.get(key) {
        Some(ConfigValue::Int(_)) => as_int()?,
        Some(ConfigValue::List(_)) => as_list(),
        Some(ConfigValue::Str(existing)) if existing.contains(PLACEHOLDER) => {
            // Template placeholders do not reveal the type; use the parameter's
            match Parameter::from_name(&key.parameter).map(|p| p.value_type()) {
                Some(ValueType::Integer) => as_int()?,
                Some(ValueType::List) => as_list(),
                _ => ConfigValue::Str(raw.to_string()),
            }
        }
        Some(ConfigValue::Str(_)) => ConfigValue::Str(raw.to_string()),
        None => {
            let known = Source::from_name(&key.source)
                .zip(Parameter::from_name(&key.parameter))
                .filter(|(s, p)| s.allows(*p));
            match known.map(|(_, p)| p.value_type()) {
                Some(ValueType::Integer) => as_int()?,
                Some(ValueType::List) => as_list(),
                Some(ValueType::String) => ConfigValue::Str(raw.to_string()),
                None => return Ok(None),
            }
        }
    };
    Ok(Some(value))
}

fn splice_root(value: &ConfigValue, root: &str) -> ConfigValue {
    let splice = |s: &str| s.replace(PLACEHOLDER, root);
    match value {
        ConfigValue::Str(s) => ConfigValue::Str(splice(s)),
        ConfigValue::List(items) => ConfigValue::List(items.iter().map(|s| splice(s)).collect()),
        ConfigValue::Int(n) => ConfigValue::Int(*n),
    }
}
