//! Show which input files each ingest mode would read

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{load_resolved, ToolError};
use crate::config::{IngestConfig, Source};
use crate::files::{detect_file_chrom, extend_file_list};

#[derive(Debug, Serialize)]
pub struct FilesOutput {
    pub sources: Vec<SourceFiles>,
    pub missing: usize,
}

#[derive(Debug, Serialize)]
pub struct SourceFiles {
    pub source: Source,
    pub patterns: Vec<String>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrom: Option<String>,
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Input patterns of one mode
fn patterns_for(config: &IngestConfig, source: Source) -> Vec<String> {
    match source {
        Source::Db => Vec::new(),
        Source::Hg19 | Source::Hg38 => {
            let settings = if source == Source::Hg19 { &config.hg19 } else { &config.hg38 };
            settings
                .iter()
                .flat_map(|s| std::iter::once(&s.fasta_file).chain(s.chain_file.as_ref()))
                .map(|p| path_text(p))
                .collect()
        }
        Source::Gerp => config.gerp.iter().flat_map(|s| s.file_list.clone()).collect(),
        Source::Gnomad => config.gnomad.iter().flat_map(|s| s.file_list.clone()).collect(),
        Source::Spliceai => config.spliceai.iter().flat_map(|s| s.file_list.clone()).collect(),
        Source::Pharmgkb => config.pharmgkb.iter().map(|s| path_text(&s.path)).collect(),
        Source::Gtex => config.gtex.iter().map(|s| path_text(&s.filename)).collect(),
    }
}

pub fn list_files(config: &Path, mode: Option<Source>, root: Option<&Path>) -> Result<FilesOutput, ToolError> {
    let (record, _) = load_resolved(config, root)?;
    let settings = IngestConfig::from_record(&record)?;

    let modes: Vec<Source> = match mode {
        Some(m) => vec![m],
        None => settings.configured_modes(),
    };

    // Expanding walks directory trees, one mode per thread
    let sources: Vec<SourceFiles> = modes
        .par_iter()
        .map(|&source| {
            let patterns = patterns_for(&settings, source);
            let files = extend_file_list(&patterns)
                .into_iter()
                .map(|path| FileEntry {
                    exists: path.exists(),
                    chrom: detect_file_chrom(&path),
                    path,
                })
                .collect();
            SourceFiles {
                source,
                patterns,
                files,
            }
        })
        .collect();

    let missing = sources
        .iter()
        .flat_map(|s| &s.files)
        .filter(|f| !f.exists)
        .count();
    if missing > 0 {
        tracing::warn!(missing, "some configured input files do not exist");
    }

    Ok(FilesOutput { sources, missing })
}
