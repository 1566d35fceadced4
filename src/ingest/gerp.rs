//! GERP conservation scores
//!
//! One `.maf.rates` file per chromosome with two tab-separated columns,
//! GerpN and GerpRS. The position is the line number.

use rusqlite::Connection;

use super::{tsv_fields, IngestError, Tally, REPORT_EVERY};
use crate::config::BatchFilesSettings;
use crate::db::{BatchWriter, Cell, TableSpec};
use crate::files::{detect_file_chrom, extend_file_list};
use crate::readers::TextLines;

const GERP: TableSpec = TableSpec {
    name: "GERP",
    columns: &["Chrom", "Pos", "GerpN", "GerpRS"],
    create_sql: "CREATE TABLE IF NOT EXISTS GERP(
        Chrom   VARCHAR(4),
        Pos     INT(11),
        GerpN   DOUBLE,
        GerpRS  DOUBLE,
        PRIMARY KEY (Pos, Chrom));",
};

pub fn ingest(
    conn: &Connection,
    settings: &BatchFilesSettings,
    tally: &mut Tally,
) -> Result<(), IngestError> {

    for path in extend_file_list(&settings.file_list) {
        let chrom = detect_file_chrom(&path)
            .ok_or_else(|| IngestError::input(&path, "cannot detect chromosome from file name"))?;
        tracing::info!(chrom = %chrom, file = %path.display(), "loading conservation scores");

        let mut lines = TextLines::open(&path)?;
        let mut writer = BatchWriter::new(conn, &GERP, settings.batch_size)?.report_every(REPORT_EVERY);

        while lines.advance()? {
            let fields = tsv_fields(lines.line());
            if fields.len() != 2 {
                return Err(lines
                    .malformed(format!("expected 2 columns, found {}", fields.len()))
                    .into());
            }
            let gerp_n = Cell::parse_real(fields[0]).map_err(|m| lines.malformed(m))?;
            let gerp_rs = Cell::parse_real(fields[1]).map_err(|m| lines.malformed(m))?;
            writer.push(vec![
                Cell::text(&chrom),
                Cell::Int(lines.line_no() as i64),
                gerp_n,
                gerp_rs,
            ])?;
        }

        tally.add(GERP.name, writer.finish()?);
        tally.file(&path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn settings(patterns: Vec<String>) -> BatchFilesSettings {
        BatchFilesSettings {
            database: "conservation".into(),
            batch_size: 2,
            file_list: patterns,
        }
    }

    #[test]
    fn test_positions_and_missing_scores() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("chr1.maf.rates"), "0.5\t-1.2\nNA\tNA\n2\t3.5\n").unwrap();
        fs::write(dir.path().join("chrX.maf.rates"), "1\t1\n").unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let pattern = format!("{}/chr*.maf.rates", dir.path().display());
        let mut tally = Tally::default();
        ingest(&conn, &settings(vec![pattern]), &mut tally).unwrap();

        assert_eq!(tally.tables.get("GERP"), Some(&4));
        assert_eq!(tally.files.len(), 2);

        let (n, rs): (Option<f64>, Option<f64>) = conn
            .query_row("SELECT GerpN, GerpRS FROM GERP WHERE Chrom = '1' AND Pos = 2", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((n, rs), (None, None));

        let rs: f64 = conn
            .query_row("SELECT GerpRS FROM GERP WHERE Chrom = '1' AND Pos = 3", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rs, 3.5);

        let chroms: i64 = conn
            .query_row("SELECT COUNT(*) FROM GERP WHERE Chrom = 'X'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(chroms, 1);
    }

    #[test]
    fn test_undetectable_chromosome() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.rates");
        fs::write(&path, "1\t1\n").unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let files = settings(vec![path.to_string_lossy().into_owned()]);
        let err = ingest(&conn, &files, &mut Tally::default()).unwrap_err();
        assert!(err.to_string().contains("cannot detect chromosome"));
    }

    #[test]
    fn test_bad_score() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chr2.maf.rates");
        fs::write(&path, "1\t1\nx\t1\n").unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let files = settings(vec![path.to_string_lossy().into_owned()]);
        let err = ingest(&conn, &files, &mut Tally::default()).unwrap_err();
        assert!(err.to_string().contains("chr2.maf.rates:2: expected a number"));
    }
}
