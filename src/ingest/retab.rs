//! Per-entity tables derived from the PharmGKB annotations
//!
//! After the annotation files are loaded, the chemicals, diseases, PubMed
//! ids and notes of each annotation are split out into `CHEMICALS`,
//! `DISEASES`, `PMIDS` and `NOTES`, keyed by annotation kind and id. Only
//! annotations on an rsID variant are kept.

use rusqlite::types::Value;
use rusqlite::{params, Connection};

use super::{IngestError, Tally, REPORT_EVERY};
use crate::db::{BatchWriter, Cell, TableSpec};

/// Annotation rows read per query
const PAGE_SIZE: i64 = 1000;

const CHEMICALS: TableSpec = TableSpec {
    name: "CHEMICALS",
    columns: &["Variant", "AssocKind", "AssocID", "ChTitle", "ChID"],
    create_sql: "CREATE TABLE IF NOT EXISTS CHEMICALS(
        Variant    VARCHAR(20),
        AssocKind  VARCHAR(10),
        AssocID    INT(10) NOT NULL,
        ChTitle    VARCHAR(80),
        ChID       VARCHAR(20),
        PRIMARY KEY (AssocKind, AssocID, ChID));
    CREATE INDEX IF NOT EXISTS ChemVariantIdx ON CHEMICALS (Variant);",
};

const DISEASES: TableSpec = TableSpec {
    name: "DISEASES",
    columns: &["Variant", "AssocKind", "AssocID", "DisTitle", "DisID"],
    create_sql: "CREATE TABLE IF NOT EXISTS DISEASES(
        Variant    VARCHAR(20),
        AssocKind  VARCHAR(10),
        AssocID    INT(10) NOT NULL,
        DisTitle   VARCHAR(80),
        DisID      VARCHAR(20),
        PRIMARY KEY (AssocKind, AssocID, DisID));
    CREATE INDEX IF NOT EXISTS DisVariantIdx ON DISEASES (Variant);",
};

const PMIDS: TableSpec = TableSpec {
    name: "PMIDS",
    columns: &["Variant", "AssocKind", "AssocID", "PMID"],
    create_sql: "CREATE TABLE IF NOT EXISTS PMIDS(
        Variant    VARCHAR(20),
        AssocKind  VARCHAR(10),
        AssocID    INT(10) NOT NULL,
        PMID       INT(10),
        PRIMARY KEY (AssocKind, AssocID, PMID));
    CREATE INDEX IF NOT EXISTS PmidVariantIdx ON PMIDS (Variant);",
};

const NOTES: TableSpec = TableSpec {
    name: "NOTES",
    columns: &["Variant", "AssocKind", "AssocID", "Note"],
    create_sql: "CREATE TABLE IF NOT EXISTS NOTES(
        Variant    VARCHAR(20),
        AssocKind  VARCHAR(10),
        AssocID    INT(10) NOT NULL,
        Note       TEXT,
        PRIMARY KEY (AssocKind, AssocID));
    CREATE INDEX IF NOT EXISTS NoteVariantIdx ON NOTES (Variant);",
};

/// How a source value turns into entity rows
#[derive(Debug, Clone, Copy, PartialEq)]
enum Split {
    /// A list of `Title (ID)` entries
    Titled,
    /// A list of PubMed ids, or a single integer
    Pmid,
    /// The whole value
    Single,
}

/// Entity tables, in the order of [`Scan::sources`]
const TARGETS: [(&TableSpec, Split); 4] = [
    (&CHEMICALS, Split::Titled),
    (&DISEASES, Split::Titled),
    (&PMIDS, Split::Pmid),
    (&NOTES, Split::Single),
];

/// A loaded annotation table and the columns feeding each entity table
struct Scan {
    kind: &'static str,
    table: &'static str,
    id: &'static str,
    variant: &'static str,
    sources: [Option<&'static str>; 4],
}

const SCANS: [Scan; 3] = [
    Scan {
        kind: "clinical",
        table: "CAmeta",
        id: "CAID",
        variant: "LOC",
        sources: [Some("RC"), Some("RD"), Some("PMIDS"), Some("AT")],
    },
    Scan {
        kind: "drug",
        table: "PharmVDA",
        id: "AID",
        variant: "VAR",
        sources: [Some("CHEM"), None, Some("PMID"), Some("NOTES")],
    },
    Scan {
        kind: "fa",
        table: "VFA",
        id: "AID",
        variant: "VAR",
        sources: [Some("CHEM"), None, Some("PMID"), Some("NOTES")],
    },
];

struct AnnotationRow {
    id: i64,
    variant: Option<String>,
    values: Vec<Value>,
}

pub fn retabulate(
    conn: &Connection,
    batch_size: usize,
    tally: &mut Tally,
) -> Result<(), IngestError> {
    let mut writers = Vec::with_capacity(TARGETS.len());
    for (spec, split) in TARGETS {
        let writer = BatchWriter::new(conn, spec, batch_size)?.report_every(REPORT_EVERY);
        writers.push((spec.name, split, writer));
    }

    for scan in &SCANS {
        if !table_exists(conn, scan.table)? {
            tracing::debug!(table = scan.table, "annotation table not loaded, skipping");
            continue;
        }
        tracing::info!(table = scan.table, kind = scan.kind, "splitting out annotation entities");

        let mut after = i64::MIN;
        loop {
            let page = read_page(conn, scan, after)?;
            let Some(last) = page.last() else { break };
            after = last.id;

            for row in &page {
                let Some(variant) = row.variant.as_deref() else {
                    continue;
                };
                if !is_rs_variant(variant) {
                    if variant.starts_with("rs") {
                        tracing::warn!(variant, table = scan.table, id = row.id, "malformed rsID, skipping");
                    }
                    continue;
                }
                for ((_, split, writer), value) in writers.iter_mut().zip(&row.values) {
                    for entity in entity_cells(*split, value) {
                        let mut cells =
                            vec![Cell::text(variant), Cell::text(scan.kind), Cell::Int(row.id)];
                        cells.extend(entity);
                        writer.push(cells)?;
                    }
                }
            }
        }
    }

    for (name, _, writer) in writers {
        tally.add(name, writer.finish()?);
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, IngestError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Rows with an id above `after`, in id order. The page is collected so no
/// statement is open while the writers commit.
fn read_page(
    conn: &Connection,
    scan: &Scan,
    after: i64,
) -> Result<Vec<AnnotationRow>, IngestError> {
    let sources: Vec<&str> = scan.sources.iter().map(|c| c.unwrap_or("NULL")).collect();
    let sql = format!(
        "SELECT {id}, {variant}, {sources} FROM {table} WHERE {id} > ?1 ORDER BY {id} LIMIT ?2",
        id = scan.id,
        variant = scan.variant,
        sources = sources.join(", "),
        table = scan.table,
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params![after, PAGE_SIZE], |r| {
            let values = (0..sources.len())
                .map(|i| r.get::<_, Value>(i + 2))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(AnnotationRow {
                id: r.get(0)?,
                variant: r.get(1)?,
                values,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn is_rs_variant(variant: &str) -> bool {
    variant
        .strip_prefix("rs")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Entity columns for one source value; empty values give no rows
fn entity_cells(split: Split, value: &Value) -> Vec<Vec<Cell>> {
    match value {
        Value::Null => Vec::new(),
        Value::Integer(n) if split == Split::Pmid => vec![vec![Cell::Int(*n)]],
        Value::Integer(n) => text_cells(split, &n.to_string()),
        Value::Real(x) => text_cells(split, &x.to_string()),
        Value::Text(s) => text_cells(split, s),
        Value::Blob(b) => text_cells(split, &String::from_utf8_lossy(b)),
    }
}

fn text_cells(split: Split, text: &str) -> Vec<Vec<Cell>> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if split == Split::Single {
        return vec![vec![Cell::text(text)]];
    }
    split_values(text)
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| match split {
            Split::Pmid => vec![v.parse::<i64>().map(Cell::Int).unwrap_or_else(|_| Cell::text(v))],
            _ => {
                let (title, id) = parse_title_id(v);
                vec![Cell::Text(title), Cell::Text(id)]
            }
        })
        .collect()
}

/// Split a list value. A value wrapped in double quotes is a `","`
/// separated list; anything else is split on commas.
fn split_values(value: &str) -> Vec<&str> {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.split("\",\"").collect(),
        None => value.split(',').collect(),
    }
}

/// `Title (ID)` into its parts. Entries without a trailing word id get a
/// synthetic `__<crc32 of title>` id.
fn parse_title_id(value: &str) -> (String, String) {
    if let Some(body) = value.trim_end().strip_suffix(')') {
        if let Some(open) = body.rfind('(') {
            let (title, id) = (&body[..open], &body[open + 1..]);
            let word = !id.is_empty() && id.chars().all(|c| c.is_alphanumeric() || c == '_');
            if !title.is_empty() && word {
                return (title.trim().to_string(), id.to_string());
            }
        }
    }
    let title = value.trim();
    (title.to_string(), format!("__{}", crc32fast::hash(title.as_bytes())))
}
