//! UCSC chain files and coordinate liftover
//!
//! A chain header reads
//! `chain score tName tSize tStrand tStart tEnd qName qSize qStrand qStart qEnd id`
//! followed by `size dt dq` alignment lines and a final `size` line.
//! Coordinates in the file are 0-based; the public API is 1-based.

use std::collections::HashMap;
use std::path::Path;

use super::{ReadError, TextLines};

#[derive(Debug, Clone)]
struct Block {
    source_start: u64,
    source_end: u64,
    target_chrom: String,
    target_start: u64,
    target_size: u64,
    reverse: bool,
    /// Position of the owning chain in the file
    chain: usize,
}

/// Blocks of one source chromosome sorted by start, with the furthest
/// end reached by any block up to each index
#[derive(Debug, Default)]
struct ChromBlocks {
    blocks: Vec<Block>,
    reach: Vec<u64>,
}

/// A 1-based position in the target assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedPosition {
    pub chrom: String,
    pub pos: u64,
}

#[derive(Debug, Default)]
pub struct LiftOver {
    chroms: HashMap<String, ChromBlocks>,
}

struct ChainHeader {
    source_chrom: String,
    target_chrom: String,
    target_size: u64,
    reverse: bool,
    source_pos: u64,
    target_pos: u64,
    ordinal: usize,
}

impl LiftOver {
    pub fn load(path: &Path) -> Result<Self, ReadError> {
        let mut lines = TextLines::open(path)?;
        let mut liftover = LiftOver::default();
        let mut current: Option<ChainHeader> = None;
        let mut chains = 0;

        while lines.advance()? {
            let line = lines.line().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();

            if fields[0] == "chain" {
                if current.is_some() {
                    return Err(lines.malformed("chain header before the previous chain ended"));
                }
                current = Some(parse_header(&fields, chains).map_err(|m| lines.malformed(m))?);
                chains += 1;
                continue;
            }

            let Some(chain) = current.as_mut() else {
                return Err(lines.malformed("alignment line outside of a chain"));
            };
            let numbers: Vec<u64> = fields
                .iter()
                .map(|f| f.parse::<u64>())
                .collect::<Result<_, _>>()
                .map_err(|_| lines.malformed("alignment line must hold integers"))?;

            let (size, gaps) = match numbers.as_slice() {
                [size] => (*size, None),
                [size, dt, dq] => (*size, Some((*dt, *dq))),
                _ => return Err(lines.malformed("alignment line must have 1 or 3 fields")),
            };

            liftover
                .chroms
                .entry(chain.source_chrom.clone())
                .or_default()
                .blocks
                .push(Block {
                    source_start: chain.source_pos,
                    source_end: chain.source_pos + size,
                    target_chrom: chain.target_chrom.clone(),
                    target_start: chain.target_pos,
                    target_size: chain.target_size,
                    reverse: chain.reverse,
                    chain: chain.ordinal,
                });

            match gaps {
                Some((dt, dq)) => {
                    chain.source_pos += size + dt;
                    chain.target_pos += size + dq;
                }
                None => current = None,
            }
        }

        for chrom in liftover.chroms.values_mut() {
            chrom.blocks.sort_by_key(|b| b.source_start);
            let mut furthest = 0;
            chrom.reach = chrom
                .blocks
                .iter()
                .map(|b| {
                    furthest = furthest.max(b.source_end);
                    furthest
                })
                .collect();
        }
        tracing::debug!(
            chains,
            chromosomes = liftover.chroms.len(),
            blocks = liftover.chroms.values().map(|c| c.blocks.len()).sum::<usize>(),
            "loaded chain file"
        );
        Ok(liftover)
    }

    /// Map a 1-based position. Chromosome names with or without the `chr`
    /// prefix are accepted. Where chains overlap, the one listed first in
    /// the file wins.
    pub fn convert(&self, chrom: &str, pos: u64) -> Option<LiftedPosition> {
        if pos == 0 {
            return None;
        }
        let chrom = self
            .chroms
            .get(chrom)
            .or_else(|| self.chroms.get(&format!("chr{}", chrom)))?;

        let p = pos - 1;
        let end = chrom.blocks.partition_point(|b| b.source_start <= p);
        // Walk back only while an earlier block can still reach p
        let block = (0..end)
            .rev()
            .take_while(|&i| chrom.reach[i] > p)
            .map(|i| &chrom.blocks[i])
            .filter(|b| p < b.source_end)
            .min_by_key(|b| b.chain)?;

        let forward = block.target_start + (p - block.source_start);
        let target = if block.reverse {
            block.target_size.checked_sub(forward + 1)?
        } else {
            forward
        };
        Some(LiftedPosition {
            chrom: block.target_chrom.clone(),
            pos: target + 1,
        })
    }
}

fn parse_header(fields: &[&str], ordinal: usize) -> Result<ChainHeader, String> {
    if fields.len() < 12 {
        return Err(format!("chain header has {} fields, expected 13", fields.len()));
    }
    let number = |i: usize| {
        fields[i]
            .parse::<u64>()
            .map_err(|_| format!("invalid number '{}' in chain header", fields[i]))
    };
    Ok(ChainHeader {
        source_chrom: fields[2].to_string(),
        source_pos: number(5)?,
        target_chrom: fields[7].to_string(),
        target_size: number(8)?,
        reverse: fields[9] == "-",
        target_pos: number(10)?,
        ordinal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // chr1: [100, 110) -> chr1 [200, 210), gap, [115, 120) -> [220, 225)
    // chr2: [0, 10) -> reverse strand of chr2 (size 1000) starting at 0
    const CHAIN: &str = "\
chain 1000 chr1 5000 + 100 120 chr1 6000 + 200 225 1
10 5 10
5

chain 500 chr2 3000 + 0 10 chr2 1000 - 0 10 2
10
";

    fn load() -> (tempfile::TempDir, LiftOver) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hg38ToHg19.over.chain");
        std::fs::write(&path, CHAIN).unwrap();
        let liftover = LiftOver::load(&path).unwrap();
        (dir, liftover)
    }

    #[test]
    fn test_forward_strand() {
        let (_dir, lo) = load();
        // 1-based 101 is 0-based 100, the first aligned base
        assert_eq!(
            lo.convert("chr1", 101),
            Some(LiftedPosition { chrom: "chr1".into(), pos: 201 })
        );
        assert_eq!(lo.convert("1", 110).map(|l| l.pos), Some(210));
        // second block starts after a 5 base gap on source, 10 on target
        assert_eq!(lo.convert("1", 116).map(|l| l.pos), Some(221));
    }

    #[test]
    fn test_unaligned_positions() {
        let (_dir, lo) = load();
        assert_eq!(lo.convert("1", 100), None);
        assert_eq!(lo.convert("1", 111), None);
        assert_eq!(lo.convert("1", 121), None);
        assert_eq!(lo.convert("3", 5), None);
        assert_eq!(lo.convert("1", 0), None);
    }

    #[test]
    fn test_reverse_strand() {
        let (_dir, lo) = load();
        // 0-based 0 maps to reverse offset 0, i.e. forward 999
        assert_eq!(lo.convert("2", 1).map(|l| l.pos), Some(1000));
        assert_eq!(lo.convert("2", 10).map(|l| l.pos), Some(991));
    }

    #[test]
    fn test_overlapping_chains() {
        // A long chain with a short one starting inside it
        let text = "\
chain 900 chr1 5000 + 100 300 chr1 6000 + 1000 1200 1
200

chain 50 chr1 5000 + 150 160 chr5 9000 + 0 10 2
10
";
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlap.chain");
        std::fs::write(&path, text).unwrap();
        let lo = LiftOver::load(&path).unwrap();

        // past the short block, still inside the long one
        assert_eq!(
            lo.convert("chr1", 171),
            Some(LiftedPosition { chrom: "chr1".into(), pos: 1071 })
        );
        // covered by both; the first chain wins
        assert_eq!(
            lo.convert("chr1", 155),
            Some(LiftedPosition { chrom: "chr1".into(), pos: 1055 })
        );
        assert_eq!(lo.convert("chr1", 300).map(|l| l.pos), Some(1200));
        assert_eq!(lo.convert("chr1", 301), None);
    }

    #[test]
    fn test_malformed_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.chain");
        std::fs::write(&path, "10 5 10\n").unwrap();
        let err = LiftOver::load(&path).unwrap_err();
        assert!(err.to_string().contains("outside of a chain"));
    }
}
