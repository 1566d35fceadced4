//! Block reader for reference FASTA files
//!
//! Yields runs of up to `block_size` bases with their 1-based start
//! position. Reading stops at the first chromosome whose name contains `_`;
//! everything after the primary assembly is alt/random contigs.

use std::path::Path;

use super::{ReadError, TextLines};

pub const DEFAULT_BLOCK_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaBlock {
    pub chrom: String,
    pub start: u64,
    pub letters: String,
}

impl FastaBlock {
    /// `(position, base)` pairs of the block
    pub fn bases(&self) -> impl Iterator<Item = (u64, char)> + '_ {
        self.letters
            .chars()
            .enumerate()
            .map(move |(i, c)| (self.start + i as u64, c))
    }
}

pub struct FastaReader {
    lines: TextLines,
    block_size: usize,
    chrom: Option<String>,
    next_pos: u64,
    line_width: Option<usize>,
    saw_short_line: bool,
    pending_header: Option<String>,
    /// Bases read past the end of the previous block
    carry: String,
    finished: bool,
}

impl FastaReader {
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        Ok(Self {
            lines: TextLines::open(path)?,
            block_size: DEFAULT_BLOCK_SIZE,
            chrom: None,
            next_pos: 1,
            line_width: None,
            saw_short_line: false,
            pending_header: None,
            carry: String::new(),
            finished: false,
        })
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn next_block(&mut self) -> Result<Option<FastaBlock>, ReadError> {
        if self.finished {
            return Ok(None);
        }

        let mut letters = std::mem::take(&mut self.carry);
        let mut start = self.next_pos;

        while letters.len() < self.block_size {
            let line = match self.pending_header.take() {
                Some(header) => header,
                None => {
                    if !self.lines.advance()? {
                        break;
                    }
                    self.lines.line().to_string()
                }
            };

            if let Some(header) = line.strip_prefix('>') {
                if !letters.is_empty() {
                    self.pending_header = Some(line);
                    break;
                }
                let name = header
                    .split_whitespace()
                    .next()
                    .and_then(|h| h.strip_prefix("chr"))
                    .ok_or_else(|| self.lines.malformed("header must start with '>chr'"))?;
                if name.contains('_') {
                    tracing::debug!(contig = name, "reached extra contigs, stopping");
                    self.finished = true;
                    return Ok(None);
                }
                self.chrom = Some(name.to_string());
                self.next_pos = 1;
                start = 1;
                self.line_width = None;
                self.saw_short_line = false;
                continue;
            }

            let seq = line.trim_end();
            if seq.is_empty() {
                continue;
            }
            if self.chrom.is_none() {
                return Err(self.lines.malformed("sequence before the first header"));
            }
            if !seq.is_ascii() {
                return Err(self.lines.malformed("sequence line holds non-ASCII characters"));
            }
            self.check_width(seq.len())?;
            letters.push_str(seq);
        }

        if letters.len() > self.block_size {
            self.carry = letters.split_off(self.block_size);
        }

        if letters.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        let chrom = self
            .chrom
            .clone()
            .ok_or_else(|| self.lines.malformed("sequence before the first header"))?;
        self.next_pos += letters.len() as u64;
        Ok(Some(FastaBlock {
            chrom,
            start,
            letters,
        }))
    }

    /// Only the last line of a chromosome may be shorter than the others
    fn check_width(&mut self, width: usize) -> Result<(), ReadError> {
        if self.saw_short_line {
            return Err(self.lines.malformed("short sequence line before the end of a chromosome"));
        }
        match self.line_width {
            None => self.line_width = Some(width),
            Some(w) if width > w => {
                return Err(self
                    .lines
                    .malformed(format!("sequence line of {} bases, expected {}", width, w)));
            }
            Some(w) if width < w => self.saw_short_line = true,
            Some(_) => {}
        }
        Ok(())
    }
}

impl Iterator for FastaReader {
    type Item = Result<FastaBlock, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reader(text: &str, block_size: usize) -> (tempfile::TempDir, FastaReader) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ref.fasta");
        std::fs::write(&path, text).unwrap();
        let reader = FastaReader::open(&path).unwrap().block_size(block_size);
        (dir, reader)
    }

    #[test]
    fn test_blocks_and_positions() {
        let (_dir, reader) = reader(">chr1\nACGT\nACGT\nAC\n>chr2\nTTTT\nGG\n", 8);
        let blocks: Vec<FastaBlock> = reader.collect::<Result<_, _>>().unwrap();

        assert_eq!(
            blocks,
            vec![
                FastaBlock { chrom: "1".into(), start: 1, letters: "ACGTACGT".into() },
                FastaBlock { chrom: "1".into(), start: 9, letters: "AC".into() },
                FastaBlock { chrom: "2".into(), start: 1, letters: "TTTTGG".into() },
            ]
        );

        let bases: Vec<(u64, char)> = blocks[1].bases().collect();
        assert_eq!(bases, vec![(9, 'A'), (10, 'C')]);
    }

    #[test]
    fn test_stops_at_extra_contigs() {
        let (_dir, reader) = reader(">chrM\nNNNN\n>chr1_gl000191_random\nACGT\n>chr2\nAAAA\n", 100);
        let blocks: Vec<FastaBlock> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].chrom, "M");
    }

    #[test]
    fn test_block_never_exceeds_block_size() {
        let (_dir, reader) = reader(">chr1\nACGTA\nCG\n>chr2\nTTTT\n", 3);
        let blocks: Vec<FastaBlock> = reader.collect::<Result<_, _>>().unwrap();

        assert_eq!(
            blocks,
            vec![
                FastaBlock { chrom: "1".into(), start: 1, letters: "ACG".into() },
                FastaBlock { chrom: "1".into(), start: 4, letters: "TAC".into() },
                FastaBlock { chrom: "1".into(), start: 7, letters: "G".into() },
                FastaBlock { chrom: "2".into(), start: 1, letters: "TTT".into() },
                FastaBlock { chrom: "2".into(), start: 4, letters: "T".into() },
            ]
        );
        assert!(blocks.iter().all(|b| b.letters.len() <= 3));
    }

    #[test]
    fn test_header_must_name_chromosome() {
        let (_dir, mut reader) = reader(">scaffold1\nACGT\n", 100);
        let err = reader.next_block().unwrap_err();
        assert!(err.to_string().contains("header must start with '>chr'"));
    }

    #[test]
    fn test_irregular_line_width() {
        let (_dir, mut reader) = reader(">chr1\nACGT\nAC\nACGT\n", 100);
        let err = reader.next_block().unwrap_err();
        assert!(err.to_string().contains(":4: short sequence line"));
    }

    #[test]
    fn test_empty_input() {
        let (_dir, mut reader) = reader("", 100);
        assert!(reader.next_block().unwrap().is_none());
        assert!(reader.next_block().unwrap().is_none());
    }
}
