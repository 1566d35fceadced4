//! Minimal VCF reader: the eight fixed columns plus a parsed INFO map

use std::collections::HashMap;
use std::path::Path;

use super::{ReadError, TextLines};

const FIXED_COLUMNS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: i64,
    pub id: Option<String>,
    pub reference: String,
    pub alt: Vec<String>,
    pub qual: Option<f64>,
    pub filter: Option<String>,
    pub info: Info,
}

/// INFO column. A key mapped to `None` is a flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info(HashMap<String, Option<String>>);

impl Info {
    pub fn parse(field: &str) -> Self {
        if field == "." || field.is_empty() {
            return Self::default();
        }
        let entries = field
            .split(';')
            .filter(|e| !e.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((k, v)) => (k.to_string(), Some(v.to_string())),
                None => (entry.to_string(), None),
            })
            .collect();
        Self(entries)
    }

    /// Raw value; `None` for flags and absent keys
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// First element of a comma-separated value
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.split(',').next())
    }
}

pub struct VcfReader {
    lines: TextLines,
}

impl VcfReader {
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        Ok(Self {
            lines: TextLines::open(path)?,
        })
    }

    pub fn next_record(&mut self) -> Result<Option<VcfRecord>, ReadError> {
        while self.lines.advance()? {
            let line = self.lines.line();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return self.parse(line).map(Some);
        }
        Ok(None)
    }

    fn parse(&self, line: &str) -> Result<VcfRecord, ReadError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < FIXED_COLUMNS {
            return Err(self.lines.malformed(format!(
                "expected at least {} columns, found {}",
                FIXED_COLUMNS,
                fields.len()
            )));
        }

        let pos = fields[1]
            .parse::<i64>()
            .map_err(|_| self.lines.malformed(format!("invalid POS '{}'", fields[1])))?;
        let optional = |s: &str| (s != ".").then(|| s.to_string());

        Ok(VcfRecord {
            chrom: fields[0].to_string(),
            pos,
            id: optional(fields[2]),
            reference: fields[3].to_string(),
            alt: if fields[4] == "." {
                Vec::new()
            } else {
                fields[4].split(',').map(String::from).collect()
            },
            qual: fields[5].parse::<f64>().ok(),
            filter: optional(fields[6]),
            info: Info::parse(fields[7]),
        })
    }

    pub fn malformed(&self, message: impl Into<String>) -> ReadError {
        self.lines.malformed(message)
    }
}

impl Iterator for VcfReader {
    type Item = Result<VcfRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
