//! Streaming readers for the input formats
//!
//! Every reader sits on [`open_text`], which transparently decodes gzip and
//! BGZF (multi-member gzip) input.

pub mod chain;
pub mod fasta;
pub mod vcf;

pub use chain::LiftOver;
pub use fasta::FastaReader;
pub use vcf::{VcfReader, VcfRecord};

use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Read error in {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}:{line}: {message}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Open a text file, decompressing gzip/BGZF when the magic bytes say so
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead + Send>, ReadError> {
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let is_gzip = reader
        .fill_buf()
        .map(|buf| buf.starts_with(&GZIP_MAGIC))
        .map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Line iterator that tracks 1-based line numbers and strips line endings
pub struct TextLines {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
    buf: String,
}

impl TextLines {
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        Ok(Self::from_reader(path, open_text(path)?))
    }

    pub fn from_reader(path: &Path, reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            path: path.to_path_buf(),
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// Line number of the most recently returned line
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    pub fn malformed(&self, message: impl Into<String>) -> ReadError {
        ReadError::Malformed {
            path: self.path.clone(),
            line: self.line_no,
            message: message.into(),
        }
    }

    /// Advance to the next line; `false` at end of input
    pub fn advance(&mut self) -> Result<bool, ReadError> {
        self.buf.clear();
        let n = self
            .reader
            .read_line(&mut self.buf)
            .map_err(|source| ReadError::Io {
                path: self.path.clone(),
                source,
            })?;
        if n == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        let len = self.buf.trim_end_matches(['\n', '\r']).len();
        self.buf.truncate(len);
        Ok(true)
    }

    /// The current line without its line ending
    pub fn line(&self) -> &str {
        &self.buf
    }
}

/// `NA`, `.` and the empty string all mean "no value"
pub fn is_missing(field: &str) -> bool {
    matches!(field, "" | "NA" | ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_plain_text_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.tsv");
        std::fs::write(&path, "one\r\ntwo\nthree").unwrap();

        let mut lines = TextLines::open(&path).unwrap();
        let mut seen = Vec::new();
        while lines.advance().unwrap() {
            seen.push(lines.line().to_string());
        }
        assert_eq!(seen, vec!["one", "two", "three"]);
        assert_eq!(lines.line_no(), 3);
    }

    #[test]
    fn test_multi_member_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.vcf.bgz");

        // BGZF is a concatenation of independent gzip members
        let mut bytes = Vec::new();
        for chunk in ["first\n", "second\n"] {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(chunk.as_bytes()).unwrap();
            bytes.extend(enc.finish().unwrap());
        }
        std::fs::write(&path, bytes).unwrap();

        let mut lines = TextLines::open(&path).unwrap();
        assert!(lines.advance().unwrap());
        assert_eq!(lines.line(), "first");
        assert!(lines.advance().unwrap());
        assert_eq!(lines.line(), "second");
        assert!(!lines.advance().unwrap());
    }

    #[test]
    fn test_open_missing_file() {
        let err = open_text(Path::new("/nonexistent/file.tsv")).err().unwrap();
        assert!(matches!(err, ReadError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/file.tsv"));
    }

    #[test]
    fn test_malformed_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.tsv");
        std::fs::write(&path, "x\ny\n").unwrap();

        let mut lines = TextLines::open(&path).unwrap();
        lines.advance().unwrap();
        lines.advance().unwrap();
        let err = lines.malformed("bad row");
        assert!(err.to_string().ends_with("a.tsv:2: bad row"));
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing("NA"));
        assert!(is_missing("."));
        assert!(is_missing(""));
        assert!(!is_missing("0"));
    }
}
