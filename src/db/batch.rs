//! Batched inserts
//!
//! Rows are buffered and written `batch_size` at a time, one transaction
//! per batch. `INSERT OR IGNORE` keeps re-runs over the same input from
//! failing on rows that are already stored.

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Result, ToSql};
use std::time::Instant;

/// Log a progress line every this many flushes
pub const DEFAULT_REPORT_EVERY: usize = 1;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: &str) -> Self {
        Cell::Text(value.to_string())
    }

    /// Text, or NULL for a missing value
    pub fn text_or_null(field: &str) -> Self {
        if crate::readers::is_missing(field) {
            Cell::Null
        } else {
            Cell::text(field)
        }
    }

    /// Integer, or NULL for a missing value
    pub fn parse_int(field: &str) -> std::result::Result<Self, String> {
        if crate::readers::is_missing(field) {
            return Ok(Cell::Null);
        }
        field
            .trim()
            .parse::<i64>()
            .map(Cell::Int)
            .map_err(|_| format!("expected an integer, found '{}'", field))
    }

    /// Float, or NULL for a missing value
    pub fn parse_real(field: &str) -> std::result::Result<Self, String> {
        if crate::readers::is_missing(field) {
            return Ok(Cell::Null);
        }
        field
            .trim()
            .parse::<f64>()
            .map(Cell::Real)
            .map_err(|_| format!("expected a number, found '{}'", field))
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Null, Into::into)
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Int(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Cell::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// A target table: its DDL and the columns rows are given in
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub create_sql: &'static str,
}

impl TableSpec {
    fn insert_sql(&self) -> String {
        format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            self.name,
            self.columns.join(", "),
            vec!["?"; self.columns.len()].join(", ")
        )
    }
}

pub struct BatchWriter<'c> {
    conn: &'c Connection,
    table: &'static str,
    width: usize,
    insert_sql: String,
    batch_size: usize,
    report_every: usize,
    buffer: Vec<Vec<Cell>>,
    flushes: usize,
    pushed: u64,
    inserted: u64,
    started: Instant,
}

impl<'c> BatchWriter<'c> {
    /// Create the table if needed and start buffering
    pub fn new(conn: &'c Connection, spec: &TableSpec, batch_size: usize) -> Result<Self> {
        conn.execute_batch(spec.create_sql)?;
        let batch_size = batch_size.max(1);
        Ok(Self {
            conn,
            table: spec.name,
            width: spec.columns.len(),
            insert_sql: spec.insert_sql(),
            batch_size,
            report_every: DEFAULT_REPORT_EVERY,
            buffer: Vec::with_capacity(batch_size),
            flushes: 0,
            pushed: 0,
            inserted: 0,
            started: Instant::now(),
        })
    }

    pub fn report_every(mut self, flushes: usize) -> Self {
        self.report_every = flushes.max(1);
        self
    }

    pub fn push(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.width {
            return Err(rusqlite::Error::InvalidParameterCount(row.len(), self.width));
        }
        self.buffer.push(row);
        self.pushed += 1;
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let conn = self.conn;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for row in self.buffer.drain(..) {
                self.inserted += stmt.execute(params_from_iter(row.iter()))? as u64;
            }
        }
        tx.commit()?;

        self.flushes += 1;
        if self.flushes % self.report_every == 0 {
            self.report("progress");
        }
        Ok(())
    }

    /// Flush what is left and return the number of rows inserted
    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        self.report("Done");
        Ok(self.inserted)
    }

    fn report(&self, note: &str) {
        let elapsed = self.started.elapsed().as_secs_f64();
        tracing::info!(
            table = self.table,
            records = self.pushed,
            inserted = self.inserted,
            elapsed_secs = (elapsed * 10.0).round() / 10.0,
            rate = (self.pushed as f64 / (elapsed + 0.0001)).round(),
            "{}",
            note
        );
    }
}
