//! hg19 / hg38 reference sequence, one row per base

use rusqlite::Connection;

use super::{IngestError, Tally, REPORT_EVERY};
use crate::config::{FastaSettings, Source};
use crate::db::{BatchWriter, Cell, TableSpec};
use crate::readers::fasta::DEFAULT_BLOCK_SIZE;
use crate::readers::{FastaReader, LiftOver};

const HG19: TableSpec = TableSpec {
    name: "HG19",
    columns: &["Chrom", "Pos", "Ref"],
    create_sql: "CREATE TABLE IF NOT EXISTS HG19(
        Chrom VARCHAR(2),
        Pos   INT(11),
        Ref   CHAR(1),
        PRIMARY KEY (Pos, Chrom));",
};

const HG38: TableSpec = TableSpec {
    name: "HG38",
    columns: &["Chrom", "Pos", "Ref", "hg19"],
    create_sql: "CREATE TABLE IF NOT EXISTS HG38(
        Chrom VARCHAR(2),
        Pos   INT(11),
        Ref   CHAR(1),
        hg19  INT(11),
        PRIMARY KEY (Pos, Chrom));",
};

pub fn ingest(
    conn: &Connection,
    assembly: Source,
    settings: &FastaSettings,
    tally: &mut Tally,
) -> Result<(), IngestError> {
    let spec = if assembly == Source::Hg38 { &HG38 } else { &HG19 };

    let liftover = match (&settings.chain_file, assembly) {
        (Some(chain), Source::Hg38) => Some(LiftOver::load(chain)?),
        (None, Source::Hg38) => {
            tracing::warn!("hg38.chain_file not set, hg19 column stays NULL");
            None
        }
        _ => None,
    };

    let mut writer = BatchWriter::new(conn, spec, DEFAULT_BLOCK_SIZE)?.report_every(REPORT_EVERY);
    let reader = FastaReader::open(&settings.fasta_file)?.block_size(DEFAULT_BLOCK_SIZE);

    for block in reader {
        let block = block?;
        for (pos, base) in block.bases() {
            let mut row = vec![
                Cell::text(&block.chrom),
                Cell::Int(pos as i64),
                Cell::Text(base.to_string()),
            ];
            if assembly == Source::Hg38 {
                let hg19 = liftover
                    .as_ref()
                    .and_then(|lo| lo.convert(&block.chrom, pos))
                    .map(|lifted| lifted.pos as i64);
                row.push(hg19.into());
            }
            writer.push(row)?;
        }
    }

    tally.add(spec.name, writer.finish()?);
    tally.file(&settings.fasta_file);
    Ok(())
}
