//! PharmGKB annotation tables
//!
//! `pharmgkb.path` is the unpacked annotations directory. Each known TSV
//! becomes one table; the first line of each file is a header. The loaded
//! tables are then split into per-entity tables by [`retabulate`].

use rusqlite::Connection;
use std::fs;
use std::path::Path;

use super::retab::retabulate;
use super::{tsv_fields, IngestError, Tally, REPORT_EVERY};
use crate::config::PharmgkbSettings;
use crate::db::{BatchWriter, Cell, TableSpec};
use crate::readers::TextLines;

/// One annotation file and how its rows map onto the table
struct Annotation {
    file: &'static str,
    table: TableSpec,
    /// Integer columns, by index in the table
    int_columns: &'static [usize],
    /// Source column that is not stored
    dropped: Option<usize>,
    /// Free-text column that may itself contain tabs; surplus fields
    /// after it are glued back with `_`
    overflow: Option<usize>,
}

impl Annotation {
    fn source_width(&self) -> usize {
        self.table.columns.len() + usize::from(self.dropped.is_some())
    }
}

const CLINICAL_ANN: Annotation = Annotation {
    file: "clinical_ann.tsv",
    table: TableSpec {
        name: "CA",
        columns: &["GPID", "GTYPE", "CPTYPE"],
        create_sql: "CREATE TABLE IF NOT EXISTS CA(
            GPID    INT(10),
            GTYPE   TEXT,
            CPTYPE  TEXT,
            PRIMARY KEY (GPID));",
    },
    int_columns: &[0],
    dropped: None,
    overflow: None,
};

/// Column of `clinical_ann_metadata.tsv` holding the clinical annotation ids
const GENOTYPE_PHENOTYPE_IDS: usize = 5;

const CLINICAL_ANN_METADATA: Annotation = Annotation {
    file: "clinical_ann_metadata.tsv",
    table: TableSpec {
        name: "CAmeta",
        columns: &[
            "CAID", "LOC", "GEN", "LOE", "CAT", "AT", "VAIDS", "VA", "PMIDS", "EC", "RC", "RD",
            "RACE", "CHR",
        ],
        create_sql: "CREATE TABLE IF NOT EXISTS CAmeta(
            CAID   INT(10),
            LOC    TEXT,
            GEN    TEXT,
            LOE    VARCHAR(2),
            CAT    VARCHAR(50),
            AT     TEXT,
            VAIDS  TEXT,
            VA     TEXT,
            PMIDS  TEXT,
            EC     INT(3),
            RC     TEXT,
            RD     TEXT,
            RACE   VARCHAR(51),
            CHR    VARCHAR(5),
            PRIMARY KEY (CAID));",
    },
    int_columns: &[0, 9],
    dropped: Some(GENOTYPE_PHENOTYPE_IDS),
    overflow: None,
};

const CAMETA2CA: TableSpec = TableSpec {
    name: "CAmeta2CA",
    columns: &["CAID_CAmeta", "GPID_CA"],
    create_sql: "CREATE TABLE IF NOT EXISTS CAmeta2CA(
        CAID_CAmeta  INT(10),
        GPID_CA      INT(10),
        PRIMARY KEY (CAID_CAmeta, GPID_CA));",
};

const STUDY_PARAMETERS: Annotation = Annotation {
    file: "study_parameters.tsv",
    table: TableSpec {
        name: "SPA",
        columns: &[
            "SPID", "ST", "SC", "SCT", "CH", "CHT", "FIC", "AFCS", "FICT", "AFCT", "PVO", "PV",
            "RST", "RS", "CSTART", "CSTOP", "RACE",
        ],
        create_sql: "CREATE TABLE IF NOT EXISTS SPA(
            SPID    INT(10),
            ST      VARCHAR(56),
            SC      VARCHAR(6),
            SCT     VARCHAR(6),
            CH      TEXT,
            CHT     VARCHAR(12),
            FIC     VARCHAR(9),
            AFCS    VARCHAR(57),
            FICT    VARCHAR(10),
            AFCT    VARCHAR(57),
            PVO     VARCHAR(59),
            PV      VARCHAR(10),
            RST     VARCHAR(7),
            RS      VARCHAR(8),
            CSTART  VARCHAR(10),
            CSTOP   VARCHAR(13),
            RACE    VARCHAR(61),
            PRIMARY KEY (SPID));",
    },
    int_columns: &[0],
    dropped: None,
    overflow: Some(4),
};

/// Study parameter ids, kept in SPA instead
const STUDY_PARAMETERS_COLUMN: usize = 9;

const VAR_FA_ANN: Annotation = Annotation {
    file: "var_fa_ann.tsv",
    table: TableSpec {
        name: "VFA",
        columns: &[
            "AID", "VAR", "GENE", "CHEM", "PMID", "PCAT", "SIGN", "NOTES", "SENT", "AL", "CHROM",
        ],
        create_sql: "CREATE TABLE IF NOT EXISTS VFA(
            AID    INT(10),
            VAR    TEXT,
            GENE   VARCHAR(167),
            CHEM   TEXT,
            PMID   INT(10),
            PCAT   VARCHAR(26),
            SIGN   VARCHAR(10),
            NOTES  TEXT,
            SENT   TEXT,
            AL     VARCHAR(189),
            CHROM  VARCHAR(5),
            PRIMARY KEY (AID));",
    },
    int_columns: &[0, 4],
    dropped: Some(STUDY_PARAMETERS_COLUMN),
    overflow: None,
};

const VAR_DRUG_ANN: Annotation = Annotation {
    file: "var_drug_ann.tsv",
    table: TableSpec {
        name: "PharmVDA",
        columns: &[
            "AID", "VAR", "GENE", "CHEM", "PMID", "PCAT", "SIGN", "NOTES", "SENT", "AL", "CHROM",
        ],
        create_sql: "CREATE TABLE IF NOT EXISTS PharmVDA(
            AID    INT(10),
            VAR    TEXT,
            GENE   TEXT,
            CHEM   TEXT,
            PMID   INT(10),
            PCAT   VARCHAR(46),
            SIGN   VARCHAR(10),
            NOTES  BLOB,
            SENT   TEXT,
            AL     TEXT,
            CHROM  VARCHAR(5),
            PRIMARY KEY (AID));",
    },
    int_columns: &[0, 4],
    dropped: Some(STUDY_PARAMETERS_COLUMN),
    overflow: None,
};

const ANNOTATIONS: [&Annotation; 5] = [
    &CLINICAL_ANN,
    &CLINICAL_ANN_METADATA,
    &STUDY_PARAMETERS,
    &VAR_FA_ANN,
    &VAR_DRUG_ANN,
];

pub fn ingest(
    conn: &Connection,
    settings: &PharmgkbSettings,
    tally: &mut Tally,
) -> Result<(), IngestError> {
    let dir = &settings.path;
    let meta = fs::metadata(dir).map_err(|source| IngestError::Io {
        path: dir.clone(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(IngestError::input(dir, "expected the annotations directory"));
    }

    for annotation in ANNOTATIONS {
        let path = dir.join(annotation.file);
        if !path.is_file() {
            tracing::warn!(file = %path.display(), "annotation file missing, skipping");
            continue;
        }
        tracing::info!(file = %path.display(), table = annotation.table.name, "loading annotations");
        load(conn, &path, annotation, settings.batch_size, tally)?;
        tally.file(&path);
    }
    retabulate(conn, settings.batch_size, tally)
}

fn load(
    conn: &Connection,
    path: &Path,
    annotation: &Annotation,
    batch_size: usize,
    tally: &mut Tally,
) -> Result<(), IngestError> {
    let mut lines = TextLines::open(path)?;
    let mut writer = BatchWriter::new(conn, &annotation.table, batch_size)?.report_every(REPORT_EVERY);
    let mut links = if annotation.table.name == CLINICAL_ANN_METADATA.table.name {
        Some(BatchWriter::new(conn, &CAMETA2CA, batch_size)?.report_every(REPORT_EVERY))
    } else {
        None
    };

    // header
    if !lines.advance()? {
        return Err(IngestError::input(path, "empty annotation file"));
    }

    while lines.advance()? {
        if lines.line().is_empty() {
            continue;
        }
        let mut fields: Vec<String> = tsv_fields(lines.line()).into_iter().map(String::from).collect();

        if let Some(column) = annotation.overflow {
            while fields.len() > annotation.source_width() && fields.len() > column + 1 {
                let surplus = fields.remove(column + 1);
                fields[column].push('_');
                fields[column].push_str(&surplus);
            }
        }
        if fields.len() != annotation.source_width() {
            return Err(lines
                .malformed(format!(
                    "expected {} columns, found {}",
                    annotation.source_width(),
                    fields.len()
                ))
                .into());
        }

        if let Some(link_writer) = links.as_mut() {
            let caid = Cell::parse_int(&fields[0]).map_err(|m| lines.malformed(m))?;
            for gpid in fields[GENOTYPE_PHENOTYPE_IDS]
                .replace('"', "")
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
            {
                let gpid = Cell::parse_int(gpid).map_err(|m| lines.malformed(m))?;
                link_writer.push(vec![caid.clone(), gpid])?;
            }
        }

        if let Some(column) = annotation.dropped {
            fields.remove(column);
        }

        let mut row = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let cell = if annotation.int_columns.contains(&index) {
                Cell::parse_int(field).map_err(|m| {
                    lines.malformed(format!("{}: {}", annotation.table.columns[index], m))
                })?
            } else if field == "NA" {
                Cell::Null
            } else {
                Cell::text(field)
            };
            row.push(cell);
        }
        writer.push(row)?;
    }

    tally.add(annotation.table.name, writer.finish()?);
    if let Some(link_writer) = links {
        tally.add(CAMETA2CA.name, link_writer.finish()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(path: &Path) -> PharmgkbSettings {
        PharmgkbSettings {
            database: "pharmgkb".into(),
            batch_size: 100,
            path: path.to_path_buf(),
        }
    }

    fn row(fields: &[&str]) -> String {
        fields.join("\t")
    }

    #[test]
    fn test_clinical_annotations_and_links() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("clinical_ann.tsv"),
            "Genotype-Phenotype ID\tGenotype\tClinical Phenotype\n1447\tAA\tNA\n1448\tAG\tPoor metabolizer\n",
        )
        .unwrap();
        let meta_row = row(&[
            "981", "rs1", "CYP2D6", "1A", "Toxicity", "\"1447,1448\"", "drug", "NA", "x", "123",
            "7", "rc", "rd", "European", "chr22",
        ]);
        fs::write(
            dir.path().join("clinical_ann_metadata.tsv"),
            format!("header\n{}\n", meta_row),
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let mut tally = Tally::default();
        ingest(&conn, &settings(dir.path()), &mut tally).unwrap();
        assert_eq!(tally.tables.get("CA"), Some(&2));
        assert_eq!(tally.tables.get("CAmeta"), Some(&1));
        assert_eq!(tally.tables.get("CAmeta2CA"), Some(&2));
        assert_eq!(tally.files.len(), 2);

        let cptype: Option<String> = conn
            .query_row("SELECT CPTYPE FROM CA WHERE GPID = 1447", [], |r| r.get(0))
            .unwrap();
        assert_eq!(cptype, None);

        // the id list column is not stored, so AT holds the field after it
        let (at, vaids, ec, chr): (String, Option<String>, i64, String) = conn
            .query_row("SELECT AT, VAIDS, EC, CHR FROM CAmeta WHERE CAID = 981", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })
            .unwrap();
        assert_eq!(at, "drug");
        assert_eq!(vaids, None);
        assert_eq!(ec, 7);
        assert_eq!(chr, "chr22");

        let links: i64 = conn
            .query_row("SELECT COUNT(*) FROM CAmeta2CA WHERE CAID_CAmeta = 981", [], |r| r.get(0))
            .unwrap();
        assert_eq!(links, 2);
    }

    #[test]
    fn test_study_parameters_overflow() {
        let dir = tempdir().unwrap();
        let mut fields = vec!["77", "case/control", "100", "200", "age", "extra"];
        fields.extend(["phen", "0.1", "A", "0.2", "G", "=", "0.01", "OR", "1.5", "1.1", "2.0", "Asian"]);
        fs::write(dir.path().join("study_parameters.tsv"), format!("header\n{}\n", row(&fields))).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        ingest(&conn, &settings(dir.path()), &mut Tally::default()).unwrap();

        let (ch, race): (String, String) = conn
            .query_row("SELECT CH, RACE FROM SPA WHERE SPID = 77", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(ch, "age_extra");
        assert_eq!(race, "Asian");
    }

    #[test]
    fn test_variant_annotations_drop_study_parameters() {
        let dir = tempdir().unwrap();
        let fields = [
            "608431", "rs4149056", "SLCO1B1", "simvastatin", "12345", "Efficacy", "yes", "NA",
            "Allele C is associated", "9001", "C", "chr12",
        ];
        fs::write(dir.path().join("var_drug_ann.tsv"), format!("header\n{}\n", row(&fields))).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let mut tally = Tally::default();
        ingest(&conn, &settings(dir.path()), &mut tally).unwrap();
        assert_eq!(tally.tables.get("PharmVDA"), Some(&1));
        assert!(tally.tables.get("VFA").is_none());

        let (pmid, al, notes): (i64, String, Option<String>) = conn
            .query_row("SELECT PMID, AL, NOTES FROM PharmVDA WHERE AID = 608431", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(pmid, 12345);
        assert_eq!(al, "C");
        assert_eq!(notes, None);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempdir().unwrap();
        let fields = [
            "1449", "rs1799853", "CYP2C9", "warfarin (PA451906)", "NA", "Metabolism", "yes",
            "reduced", "Allele T is associated", "9002", "T", "chr10",
        ];
        fs::write(dir.path().join("var_fa_ann.tsv"), format!("header\n{}\n", row(&fields))).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        let mut tally = Tally::default();
        ingest(&conn, &settings(dir.path()), &mut tally).unwrap();
        assert_eq!(tally.files, vec![dir.path().join("var_fa_ann.tsv")]);
        assert_eq!(tally.tables.get("VFA"), Some(&1));
        for absent in ["CA", "CAmeta", "CAmeta2CA", "SPA", "PharmVDA"] {
            assert!(tally.tables.get(absent).is_none(), "{absent}");
        }
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('CA', 'SPA')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);

        let (title, id): (String, String) = conn
            .query_row("SELECT ChTitle, ChID FROM CHEMICALS WHERE AssocKind = 'fa'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((title.as_str(), id.as_str()), ("warfarin", "PA451906"));
        assert_eq!(tally.tables.get("NOTES"), Some(&1));
        assert_eq!(tally.tables.get("PMIDS"), Some(&0));
    }

    #[test]
    fn test_wrong_column_count() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clinical_ann.tsv"), "header\n1\tAA\n").unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let err = ingest(&conn, &settings(dir.path()), &mut Tally::default()).unwrap_err();
        assert!(err.to_string().contains("clinical_ann.tsv:2: expected 3 columns, found 2"));
    }

    #[test]
    fn test_path_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("annotations");
        fs::write(&file, "").unwrap();
        let conn = Connection::open_in_memory().unwrap();
        assert!(ingest(&conn, &settings(&file), &mut Tally::default()).is_err());
        let absent = settings(&dir.path().join("absent"));
        assert!(ingest(&conn, &absent, &mut Tally::default()).is_err());
    }
}
