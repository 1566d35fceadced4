//! Typed ingest configuration and its validation rules

use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use super::{ConfigError, ConfigKey, ConfigRecord, ConfigValue};

/// Printed in place of secrets
pub const REDACTED: &str = "***";

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion
const SUGGESTION_THRESHOLD: f64 = 0.8;

// ============================================================================
// Sources and Parameters
// ============================================================================

/// A key prefix: the connection block or one of the upstream data sources
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Db,
    Hg19,
    Hg38,
    Gerp,
    Gnomad,
    Pharmgkb,
    Gtex,
    Spliceai,
}

impl Source {
    pub const ALL: [Source; 8] = [
        Source::Db,
        Source::Hg19,
        Source::Hg38,
        Source::Gerp,
        Source::Gnomad,
        Source::Pharmgkb,
        Source::Gtex,
        Source::Spliceai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Db => "db",
            Source::Hg19 => "hg19",
            Source::Hg38 => "hg38",
            Source::Gerp => "gerp",
            Source::Gnomad => "gnomad",
            Source::Pharmgkb => "pharmgkb",
            Source::Gtex => "gtex",
            Source::Spliceai => "spliceai",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    pub fn required(&self) -> &'static [Parameter] {
        use Parameter::*;
        match self {
            Source::Db => &[Host, Port, User, Password],
            Source::Hg19 | Source::Hg38 => &[Database, FastaFile],
            Source::Gerp | Source::Gnomad | Source::Spliceai => &[Database, BatchSize, FileList],
            Source::Pharmgkb => &[Database, BatchSize, Path],
            Source::Gtex => &[Database, BatchSize, Filename],
        }
    }

    pub fn optional(&self) -> &'static [Parameter] {
        match self {
            Source::Hg38 => &[Parameter::ChainFile],
            _ => &[],
        }
    }

    pub fn allows(&self, parameter: Parameter) -> bool {
        self.required().contains(&parameter) || self.optional().contains(&parameter)
    }

    /// Everything except the connection block can be ingested
    pub fn is_ingest_mode(&self) -> bool {
        !matches!(self, Source::Db)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expected JSON shape of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    String,
    List,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Integer => "an integer",
            ValueType::String => "a string",
            ValueType::List => "a list",
        }
    }

    fn accepts(&self, value: &ConfigValue) -> bool {
        matches!(
            (self, value),
            (ValueType::Integer, ConfigValue::Int(_))
                | (ValueType::String, ConfigValue::Str(_))
                | (ValueType::List, ConfigValue::List(_))
        )
    }
}

/// The second half of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    Database,
    BatchSize,
    FileList,
    FastaFile,
    Path,
    Filename,
    ChainFile,
    Host,
    Port,
    User,
    Password,
}

impl Parameter {
    pub const ALL: [Parameter; 11] = [
        Parameter::Database,
        Parameter::BatchSize,
        Parameter::FileList,
        Parameter::FastaFile,
        Parameter::Path,
        Parameter::Filename,
        Parameter::ChainFile,
        Parameter::Host,
        Parameter::Port,
        Parameter::User,
        Parameter::Password,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Database => "database",
            Parameter::BatchSize => "batch_size",
            Parameter::FileList => "file_list",
            Parameter::FastaFile => "fasta_file",
            Parameter::Path => "path",
            Parameter::Filename => "filename",
            Parameter::ChainFile => "chain_file",
            Parameter::Host => "host",
            Parameter::Port => "port",
            Parameter::User => "user",
            Parameter::Password => "password",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Parameter::BatchSize | Parameter::Port => ValueType::Integer,
            Parameter::FileList => ValueType::List,
            _ => ValueType::String,
        }
    }

    /// Parameters whose `?` stands for the data root directory
    pub fn is_path_like(&self) -> bool {
        matches!(
            self,
            Parameter::FileList
                | Parameter::FastaFile
                | Parameter::Path
                | Parameter::Filename
                | Parameter::ChainFile
        )
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Parameter::Password)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Validation
// ============================================================================

/// `Template` tolerates unresolved placeholders; `Strict` rejects them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Template,
    Strict,
}

/// Collect every problem in the record
pub fn validate(record: &ConfigRecord, mode: ValidationMode) -> Vec<ConfigError> {
    let mut issues = Vec::new();
    let mut unknown_sources = BTreeSet::new();
    let mut present = BTreeSet::new();

    for (key, value) in record.iter() {
        let Some(source) = Source::from_name(&key.source) else {
            if unknown_sources.insert(key.source.clone()) {
                issues.push(ConfigError::UnknownSource {
                    name: key.source.clone(),
                    suggestion: suggest(&key.source, Source::ALL.iter().map(|s| s.as_str())),
                });
            }
            continue;
        };
        present.insert(source);

        let parameter = match Parameter::from_name(&key.parameter) {
            Some(p) if source.allows(p) => p,
            _ => {
                let allowed = source
                    .required()
                    .iter()
                    .chain(source.optional())
                    .map(|p| p.as_str());
                issues.push(ConfigError::UnknownParameter {
                    key: key.to_string(),
                    suggestion: suggest(&key.parameter, allowed)
                        .map(|p| format!("{}.{}", source, p)),
                });
                continue;
            }
        };

        if let Some(issue) = check_value(key, parameter, value, mode) {
            issues.push(issue);
        }
    }

    for source in &present {
        for parameter in source.required() {
            if record.get_by(source.as_str(), parameter.as_str()).is_none() {
                issues.push(ConfigError::MissingKey(format!("{}.{}", source, parameter)));
            }
        }
    }

    if mode == ValidationMode::Strict {
        let unresolved: Vec<String> = record.placeholders().iter().map(|k| k.to_string()).collect();
        if !unresolved.is_empty() {
            issues.push(ConfigError::UnresolvedPlaceholders(unresolved));
        }
    }

    issues
}

fn check_value(
    key: &ConfigKey,
    parameter: Parameter,
    value: &ConfigValue,
    mode: ValidationMode,
) -> Option<ConfigError> {
    // A bare placeholder string may stand in for any type in a template
    if mode == ValidationMode::Template && matches!(value, ConfigValue::Str(_)) && value.has_placeholder() {
        return None;
    }

    let expected = parameter.value_type();
    if !expected.accepts(value) {
        return Some(ConfigError::WrongType {
            key: key.to_string(),
            expected: expected.name(),
            found: value.type_name(),
        });
    }

    let invalid = |reason: &str| {
        Some(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };

    match (parameter, value) {
        (Parameter::BatchSize, ConfigValue::Int(n)) if *n <= 0 => {
            invalid("must be a positive integer")
        }
        (Parameter::Port, ConfigValue::Int(n)) if !(1..=65535).contains(n) => {
            invalid("must be between 1 and 65535")
        }
        (Parameter::FileList, ConfigValue::List(items)) if items.is_empty() => {
            invalid("must list at least one file pattern")
        }
        (Parameter::FileList, ConfigValue::List(items)) if items.iter().any(|s| s.is_empty()) => {
            invalid("must not contain empty patterns")
        }
        (_, ConfigValue::Str(s)) if s.is_empty() => invalid("must not be empty"),
        _ => None,
    }
}

fn suggest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|c| (strsim::jaro_winkler(input, c), c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

// ============================================================================
// Typed Settings
// ============================================================================

/// Connection parameters from the `db.*` block
#[derive(Debug, Clone, Serialize)]
pub struct DbConnection {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(serialize_with = "redact")]
    pub password: String,
}

impl DbConnection {
    /// `user@host:port`, safe to log
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

fn redact<S: Serializer>(_: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(REDACTED)
}

/// hg19 / hg38 reference FASTA
#[derive(Debug, Clone, Serialize)]
pub struct FastaSettings {
    pub database: String,
    pub fasta_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_file: Option<PathBuf>,
}

/// Sources loaded from a list of glob patterns (gerp, gnomad, spliceai)
#[derive(Debug, Clone, Serialize)]
pub struct BatchFilesSettings {
    pub database: String,
    pub batch_size: usize,
    pub file_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PharmgkbSettings {
    pub database: String,
    pub batch_size: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct GtexSettings {
    pub database: String,
    pub batch_size: usize,
    pub filename: PathBuf,
}

/// A fully resolved, validated configuration
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<DbConnection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hg19: Option<FastaSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hg38: Option<FastaSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gerp: Option<BatchFilesSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gnomad: Option<BatchFilesSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmgkb: Option<PharmgkbSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gtex: Option<GtexSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spliceai: Option<BatchFilesSettings>,
}

impl IngestConfig {
    /// Validate strictly and build the typed config
    pub fn from_record(record: &ConfigRecord) -> Result<Self, ConfigError> {
        let mut issues = validate(record, ValidationMode::Strict);
        match issues.len() {
            0 => {}
            1 => return Err(issues.remove(0)),
            _ => return Err(ConfigError::Invalid(issues)),
        }

        let fields = Fields { record };
        Ok(Self {
            db: fields.section(Source::Db, |f| {
                let port = f.int(Source::Db, Parameter::Port)?;
                Ok(DbConnection {
                    host: f.string(Source::Db, Parameter::Host)?,
                    port: u16::try_from(port).map_err(|_| ConfigError::InvalidValue {
                        key: "db.port".to_string(),
                        reason: "must be between 1 and 65535".to_string(),
                    })?,
                    user: f.string(Source::Db, Parameter::User)?,
                    password: f.string(Source::Db, Parameter::Password)?,
                })
            })?,
            hg19: fields.section(Source::Hg19, |f| f.fasta(Source::Hg19))?,
            hg38: fields.section(Source::Hg38, |f| f.fasta(Source::Hg38))?,
            gerp: fields.section(Source::Gerp, |f| f.batch_files(Source::Gerp))?,
            gnomad: fields.section(Source::Gnomad, |f| f.batch_files(Source::Gnomad))?,
            pharmgkb: fields.section(Source::Pharmgkb, |f| {
                Ok(PharmgkbSettings {
                    database: f.string(Source::Pharmgkb, Parameter::Database)?,
                    batch_size: f.batch_size(Source::Pharmgkb)?,
                    path: f.string(Source::Pharmgkb, Parameter::Path)?.into(),
                })
            })?,
            gtex: fields.section(Source::Gtex, |f| {
                Ok(GtexSettings {
                    database: f.string(Source::Gtex, Parameter::Database)?,
                    batch_size: f.batch_size(Source::Gtex)?,
                    filename: f.string(Source::Gtex, Parameter::Filename)?.into(),
                })
            })?,
            spliceai: fields.section(Source::Spliceai, |f| f.batch_files(Source::Spliceai))?,
        })
    }

    /// Target database name of an ingest mode
    pub fn database_for(&self, source: Source) -> Option<&str> {
        match source {
            Source::Db => None,
            Source::Hg19 => self.hg19.as_ref().map(|s| s.database.as_str()),
            Source::Hg38 => self.hg38.as_ref().map(|s| s.database.as_str()),
            Source::Gerp => self.gerp.as_ref().map(|s| s.database.as_str()),
            Source::Gnomad => self.gnomad.as_ref().map(|s| s.database.as_str()),
            Source::Pharmgkb => self.pharmgkb.as_ref().map(|s| s.database.as_str()),
            Source::Gtex => self.gtex.as_ref().map(|s| s.database.as_str()),
            Source::Spliceai => self.spliceai.as_ref().map(|s| s.database.as_str()),
        }
    }

    /// Ingest modes present in this config
    pub fn configured_modes(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.database_for(*s).is_some())
            .collect()
    }
}

/// Typed accessors over an already validated record
struct Fields<'a> {
    record: &'a ConfigRecord,
}

impl Fields<'_> {
    fn section<T>(
        &self,
        source: Source,
        build: impl FnOnce(&Self) -> Result<T, ConfigError>,
    ) -> Result<Option<T>, ConfigError> {
        if self.record.keys().any(|k| k.source == source.as_str()) {
            build(self).map(Some)
        } else {
            Ok(None)
        }
    }

    fn value(&self, source: Source, parameter: Parameter) -> Option<&ConfigValue> {
        self.record.get_by(source.as_str(), parameter.as_str())
    }

    fn require(&self, source: Source, parameter: Parameter) -> Result<&ConfigValue, ConfigError> {
        self.value(source, parameter)
            .ok_or_else(|| ConfigError::MissingKey(format!("{}.{}", source, parameter)))
    }

    fn wrong_type(source: Source, parameter: Parameter, value: &ConfigValue) -> ConfigError {
        ConfigError::WrongType {
            key: format!("{}.{}", source, parameter),
            expected: parameter.value_type().name(),
            found: value.type_name(),
        }
    }

    fn string(&self, source: Source, parameter: Parameter) -> Result<String, ConfigError> {
        let value = self.require(source, parameter)?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| Self::wrong_type(source, parameter, value))
    }

    fn optional_string(&self, source: Source, parameter: Parameter) -> Result<Option<String>, ConfigError> {
        match self.value(source, parameter) {
            Some(_) => self.string(source, parameter).map(Some),
            None => Ok(None),
        }
    }

    fn int(&self, source: Source, parameter: Parameter) -> Result<i64, ConfigError> {
        let value = self.require(source, parameter)?;
        value
            .as_int()
            .ok_or_else(|| Self::wrong_type(source, parameter, value))
    }

    fn list(&self, source: Source, parameter: Parameter) -> Result<Vec<String>, ConfigError> {
        let value = self.require(source, parameter)?;
        value
            .as_list()
            .map(|items| items.to_vec())
            .ok_or_else(|| Self::wrong_type(source, parameter, value))
    }

    fn batch_size(&self, source: Source) -> Result<usize, ConfigError> {
        let n = self.int(source, Parameter::BatchSize)?;
        usize::try_from(n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: format!("{}.batch_size", source),
                reason: "must be a positive integer".to_string(),
            })
    }

    fn fasta(&self, source: Source) -> Result<FastaSettings, ConfigError> {
        Ok(FastaSettings {
            database: self.string(source, Parameter::Database)?,
            fasta_file: self.string(source, Parameter::FastaFile)?.into(),
            chain_file: self
                .optional_string(source, Parameter::ChainFile)?
                .map(PathBuf::from),
        })
    }

    fn batch_files(&self, source: Source) -> Result<BatchFilesSettings, ConfigError> {
        Ok(BatchFilesSettings {
            database: self.string(source, Parameter::Database)?,
            batch_size: self.batch_size(source)?,
            file_list: self.list(source, Parameter::FileList)?,
        })
    }
}
