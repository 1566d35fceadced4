//! SpliceAI splice-site predictions

use rusqlite::Connection;

use super::{IngestError, Tally, REPORT_EVERY};
use crate::config::BatchFilesSettings;
use crate::db::{BatchWriter, Cell, TableSpec};
use crate::files::extend_file_list;
use crate::readers::{VcfReader, VcfRecord};

const DELTA_POSITIONS: [&str; 4] = ["DP_AG", "DP_AL", "DP_DG", "DP_DL"];
const DELTA_SCORES: [&str; 4] = ["DS_AG", "DS_AL", "DS_DG", "DS_DL"];
const ANNOTATIONS: [&str; 3] = ["SYMBOL", "TYPE", "STRAND"];

const SPLICEAI: TableSpec = TableSpec {
    name: "SPLICEAI",
    columns: &[
        "CHROM", "POS", "ID", "REF", "ALT", "DP_AG", "DP_AL", "DP_DG", "DP_DL", "DS_AG", "DS_AL",
        "DS_DG", "DS_DL", "SYMBOL", "TYPE", "STRAND", "MAX_DS",
    ],
    create_sql: "CREATE TABLE IF NOT EXISTS SPLICEAI (
        CHROM varchar(4), POS INT, ID varchar(20), REF varchar(512), ALT varchar(2048),
        DP_AG INT, DP_AL INT, DP_DG INT, DP_DL INT,
        DS_AG FLOAT, DS_AL FLOAT, DS_DG FLOAT, DS_DL FLOAT,
        SYMBOL varchar(20), TYPE varchar(1), STRAND varchar(1), MAX_DS FLOAT);
    CREATE UNIQUE INDEX IF NOT EXISTS PosIdx ON SPLICEAI (POS, CHROM, REF, ALT, ID);
    CREATE INDEX IF NOT EXISTS RsIdIdx ON SPLICEAI (ID);",
};

pub fn ingest(
    conn: &Connection,
    settings: &BatchFilesSettings,
    tally: &mut Tally,
) -> Result<(), IngestError> {

    for path in extend_file_list(&settings.file_list) {
        tracing::info!(file = %path.display(), "loading SpliceAI scores");

        let mut reader = VcfReader::open(&path)?;
        let mut writer = BatchWriter::new(conn, &SPLICEAI, settings.batch_size)?.report_every(REPORT_EVERY);

        while let Some(record) = reader.next_record()? {
            let row = splice_row(&record).map_err(|m| reader.malformed(m))?;
            writer.push(row)?;
        }

        tally.add(SPLICEAI.name, writer.finish()?);
        tally.file(&path);
    }

    Ok(())
}

fn splice_row(record: &VcfRecord) -> Result<Vec<Cell>, String> {
    let alt = match record.alt.as_slice() {
        [alt] => alt,
        alts => return Err(format!("expected exactly one ALT allele, found {}", alts.len())),
    };

    let mut row = vec![
        Cell::text(&record.chrom),
        Cell::Int(record.pos),
        record.id.clone().into(),
        Cell::text(&record.reference),
        Cell::text(alt),
    ];

    for key in DELTA_POSITIONS {
        let value = record.info.get(key).unwrap_or("");
        row.push(Cell::parse_int(value).map_err(|m| format!("INFO {}: {}", key, m))?);
    }

    let mut max_ds: Option<f64> = None;
    for key in DELTA_SCORES {
        let value = record.info.get(key).unwrap_or("");
        let cell = Cell::parse_real(value).map_err(|m| format!("INFO {}: {}", key, m))?;
        if let Cell::Real(score) = cell {
            max_ds = Some(max_ds.map_or(score, |m| m.max(score)));
        }
        row.push(cell);
    }

    for key in ANNOTATIONS {
        row.push(Cell::text_or_null(record.info.get(key).unwrap_or("")));
    }
    row.push(max_ds.into());
    Ok(row)
}
