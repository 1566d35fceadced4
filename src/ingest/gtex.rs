//! GTEx median gene expression per tissue
//!
//! Input is a GCT file: a version line, a dimensions line, then a header
//! `Name Description <tissue>...` followed by one row per gene.

use rusqlite::Connection;

use super::{tsv_fields, IngestError, Tally, REPORT_EVERY};
use crate::config::GtexSettings;
use crate::db::{BatchWriter, Cell, TableSpec};
use crate::readers::TextLines;

const HEADER_LINE: usize = 3;
const FIRST_TISSUE_COLUMN: usize = 2;

const GENE: TableSpec = TableSpec {
    name: "GTexGENE",
    columns: &["GeneName", "Description", "TopT1", "TopT2", "TopT3"],
    create_sql: "CREATE TABLE IF NOT EXISTS GTexGENE(
        GeneName       VARCHAR(24),
        Description    VARCHAR(19),
        TopT1          INT(2),
        TopT2          INT(2),
        TopT3          INT(2),
        PRIMARY KEY(GeneName));",
};

const TISSUE: TableSpec = TableSpec {
    name: "GTexTISSUE",
    columns: &["TissueNo", "Name"],
    create_sql: "CREATE TABLE IF NOT EXISTS GTexTISSUE(
        TissueNo        INT(2),
        Name            VARCHAR(41),
        PRIMARY KEY(TissueNo));",
};

const GENE2TISSUE: TableSpec = TableSpec {
    name: "GTexGENE2TISSUE",
    columns: &["GeneName", "TissueNo", "Expression", "RelExp"],
    create_sql: "CREATE TABLE IF NOT EXISTS GTexGENE2TISSUE(
        GeneName         VARCHAR(24),
        TissueNo         INT(2),
        Expression       FLOAT,
        RelExp           FLOAT,
        PRIMARY KEY(GeneName, TissueNo));",
};

/// Tissues are numbered by their 1-based column in the file
fn tissue_no(column: usize) -> i64 {
    column as i64 + 1
}

pub fn ingest(
    conn: &Connection,
    settings: &GtexSettings,
    tally: &mut Tally,
) -> Result<(), IngestError> {
    let path = &settings.filename;
    tracing::info!(file = %path.display(), "loading GTEx expression");

    let mut lines = TextLines::open(path)?;
    let mut tissues = BatchWriter::new(conn, &TISSUE, settings.batch_size)?;
    let mut genes = BatchWriter::new(conn, &GENE, settings.batch_size)?.report_every(REPORT_EVERY);
    let mut gene2tissue =
        BatchWriter::new(conn, &GENE2TISSUE, settings.batch_size)?.report_every(REPORT_EVERY);

    let mut width: Option<usize> = None;
    while lines.advance()? {
        let fields = tsv_fields(lines.line());

        if lines.line_no() < HEADER_LINE {
            continue;
        }
        if lines.line_no() == HEADER_LINE {
            if fields.len() <= FIRST_TISSUE_COLUMN {
                return Err(lines.malformed("header has no tissue columns").into());
            }
            for (column, name) in fields.iter().enumerate().skip(FIRST_TISSUE_COLUMN) {
                tissues.push(vec![Cell::Int(tissue_no(column)), Cell::text(name)])?;
            }
            width = Some(fields.len());
            continue;
        }

        if Some(fields.len()) != width {
            return Err(lines
                .malformed(format!(
                    "expected {} columns, found {}",
                    width.unwrap_or_default(),
                    fields.len()
                ))
                .into());
        }

        let mut ranked = Vec::with_capacity(fields.len() - FIRST_TISSUE_COLUMN);
        for (column, value) in fields.iter().enumerate().skip(FIRST_TISSUE_COLUMN) {
            let expression = value
                .trim()
                .parse::<f64>()
                .map_err(|_| lines.malformed(format!("invalid expression '{}'", value)))?;
            ranked.push((expression, tissue_no(column)));
        }
        // stable: equal expressions keep column order
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let top = ranked[0].0;
        if top <= 0.0 {
            continue;
        }

        let gene = fields[0];
        let ranked_tissue = |rank: usize| -> Cell {
            match ranked.get(rank) {
                Some((expression, tissue)) if *expression > 0.0 => Cell::Int(*tissue),
                _ => Cell::Null,
            }
        };
        genes.push(vec![
            Cell::text(gene),
            Cell::text(fields[1]),
            Cell::Int(ranked[0].1),
            ranked_tissue(1),
            ranked_tissue(2),
        ])?;

        for (expression, tissue) in ranked.iter().take_while(|(e, _)| *e > 0.0) {
            gene2tissue.push(vec![
                Cell::text(gene),
                Cell::Int(*tissue),
                Cell::Real(*expression),
                Cell::Real(expression / top),
            ])?;
        }
    }

    if width.is_none() {
        return Err(IngestError::input(path, "file ends before the header line"));
    }

    tally.add(TISSUE.name, tissues.finish()?);
    tally.add(GENE.name, genes.finish()?);
    tally.add(GENE2TISSUE.name, gene2tissue.finish()?);
    tally.file(path);
    Ok(())
}
