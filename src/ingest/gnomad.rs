//! gnomAD population variants
//!
//! Site VCFs from the exome and genome releases share the `VARIANTS` table;
//! the SOURCE column tells them apart.

use rusqlite::Connection;
use std::path::Path;

use super::{IngestError, Tally, REPORT_EVERY};
use crate::config::BatchFilesSettings;
use crate::db::{BatchWriter, Cell, TableSpec};
use crate::files::{detect_file_chrom, extend_file_list};
use crate::readers::{VcfReader, VcfRecord};

#[derive(Clone, Copy)]
enum Kind {
    Int,
    Real,
}

/// INFO fields copied into VARIANTS, in column order after REF
const INFO_FIELDS: &[(&str, Kind)] = &[
    ("nhomalt", Kind::Int),
    ("faf95", Kind::Real),
    ("faf99", Kind::Real),
    ("AC", Kind::Int),
    ("AN", Kind::Int),
    ("AF", Kind::Real),
    ("hem", Kind::Int),
    ("AC_afr", Kind::Int),
    ("AC_amr", Kind::Int),
    ("AC_asj", Kind::Int),
    ("AC_eas", Kind::Int),
    ("AC_fin", Kind::Int),
    ("AC_nfe", Kind::Int),
    ("AC_sas", Kind::Int),
    ("AC_oth", Kind::Int),
    ("AC_raw", Kind::Int),
    ("AC_male", Kind::Int),
    ("AC_female", Kind::Int),
    ("AN_afr", Kind::Int),
    ("AN_amr", Kind::Int),
    ("AN_asj", Kind::Int),
    ("AN_eas", Kind::Int),
    ("AN_fin", Kind::Int),
    ("AN_nfe", Kind::Int),
    ("AN_sas", Kind::Int),
    ("AN_oth", Kind::Int),
    ("AN_raw", Kind::Int),
    ("AN_male", Kind::Int),
    ("AN_female", Kind::Int),
    ("AF_afr", Kind::Real),
    ("AF_amr", Kind::Real),
    ("AF_asj", Kind::Real),
    ("AF_eas", Kind::Real),
    ("AF_fin", Kind::Real),
    ("AF_nfe", Kind::Real),
    ("AF_sas", Kind::Real),
    ("AF_oth", Kind::Real),
    ("AF_raw", Kind::Real),
    ("AF_male", Kind::Real),
    ("AF_female", Kind::Real),
];

const VARIANTS: TableSpec = TableSpec {
    name: "VARIANTS",
    columns: &[
        "SOURCE", "CHROM", "POS", "ALT", "REF", "nhomalt", "faf95", "faf99", "AC", "AN", "AF",
        "hem", "AC_afr", "AC_amr", "AC_asj", "AC_eas", "AC_fin", "AC_nfe", "AC_sas", "AC_oth",
        "AC_raw", "AC_male", "AC_female", "AN_afr", "AN_amr", "AN_asj", "AN_eas", "AN_fin",
        "AN_nfe", "AN_sas", "AN_oth", "AN_raw", "AN_male", "AN_female", "AF_afr", "AF_amr",
        "AF_asj", "AF_eas", "AF_fin", "AF_nfe", "AF_sas", "AF_oth", "AF_raw", "AF_male",
        "AF_female",
    ],
    create_sql: "CREATE TABLE IF NOT EXISTS VARIANTS(
        SOURCE varchar(1), CHROM varchar(4), POS int(11), ALT varchar(2048), REF varchar(512),
        nhomalt int(11), faf95 double, faf99 double, AC int(11), AN int(11), AF double, hem int(11),
        AC_afr int(11), AC_amr int(11), AC_asj int(11), AC_eas int(11), AC_fin int(11),
        AC_nfe int(11), AC_sas int(11), AC_oth int(11), AC_raw int(11), AC_male int(11),
        AC_female int(11),
        AN_afr int(11), AN_amr int(11), AN_asj int(11), AN_eas int(11), AN_fin int(11),
        AN_nfe int(11), AN_sas int(11), AN_oth int(11), AN_raw int(11), AN_male int(11),
        AN_female int(11),
        AF_afr double, AF_amr double, AF_asj double, AF_eas double, AF_fin double,
        AF_nfe double, AF_sas double, AF_oth double, AF_raw double, AF_male double,
        AF_female double,
        PRIMARY KEY(POS, CHROM, SOURCE, ALT, REF));",
};

/// `e` for exome files, `g` for genome files
fn release_source(path: &Path) -> Result<&'static str, IngestError> {
    let name = path.to_string_lossy();
    if name.contains("exomes") {
        Ok("e")
    } else if name.contains("genomes") {
        Ok("g")
    } else {
        Err(IngestError::input(path, "file name names neither exomes nor genomes"))
    }
}

pub fn ingest(
    conn: &Connection,
    settings: &BatchFilesSettings,
    tally: &mut Tally,
) -> Result<(), IngestError> {

    for path in extend_file_list(&settings.file_list) {
        let source = release_source(&path)?;
        tracing::info!(
            chrom = detect_file_chrom(&path).as_deref().unwrap_or("?"),
            file = %path.display(),
            "loading gnomAD sites"
        );

        let mut reader = VcfReader::open(&path)?;
        let mut writer = BatchWriter::new(conn, &VARIANTS, settings.batch_size)?.report_every(REPORT_EVERY);

        while let Some(record) = reader.next_record()? {
            let row = variant_row(source, &record).map_err(|m| reader.malformed(m))?;
            writer.push(row)?;
        }

        tally.add(VARIANTS.name, writer.finish()?);
        tally.file(&path);
    }

    Ok(())
}

fn variant_row(source: &str, record: &VcfRecord) -> Result<Vec<Cell>, String> {
    let alt = match record.alt.as_slice() {
        [alt] => alt,
        alts => return Err(format!("expected exactly one ALT allele, found {}", alts.len())),
    };

    let mut row = Vec::with_capacity(VARIANTS.columns.len());
    row.push(Cell::text(source));
    row.push(Cell::text(&record.chrom));
    row.push(Cell::Int(record.pos));
    row.push(Cell::text(alt));
    row.push(Cell::text(&record.reference));

    for (field, kind) in INFO_FIELDS {
        let cell = match record.info.first(field) {
            None => Cell::Null,
            Some(value) => {
                let parsed = match kind {
                    Kind::Int => Cell::parse_int(value),
                    Kind::Real => Cell::parse_real(value),
                };
                parsed.map_err(|m| format!("INFO {}: {}", field, m))?
            }
        };
        row.push(cell);
    }
    Ok(row)
}
