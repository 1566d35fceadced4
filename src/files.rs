//! File-list expansion and chromosome detection
//!
//! Config file lists are glob-like patterns. `*` matches any run of
//! characters inside a single path segment and may appear in any segment.

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const WILDCARD: char = '*';

/// Expand patterns in order. Matches of one pattern are sorted.
/// Literal paths pass through untouched so the reader can report them.
pub fn extend_file_list<S: AsRef<str>>(patterns: &[S]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !pattern.contains(WILDCARD) {
            push_unique(&mut result, PathBuf::from(pattern));
            continue;
        }

        let matches = expand_pattern(pattern);
        if matches.is_empty() {
            tracing::warn!(pattern, "file pattern matched nothing");
        }
        for path in matches {
            push_unique(&mut result, path);
        }
    }
    result
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let components: Vec<Component> = Path::new(pattern).components().collect();
    let first_wild = components
        .iter()
        .position(|c| c.as_os_str().to_string_lossy().contains(WILDCARD))
        .unwrap_or(components.len());

    let base: PathBuf = components[..first_wild].iter().collect();
    let segments: Vec<String> = components[first_wild..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let walk_root = if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base.clone()
    };

    // Data roots are often assembled from symlinks
    let mut matches: Vec<PathBuf> = WalkDir::new(&walk_root)
        .follow_links(true)
        .min_depth(segments.len())
        .max_depth(segments.len())
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(&walk_root).ok()?;
            let names: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let all_match = names.len() == segments.len()
                && names.iter().zip(&segments).all(|(n, s)| wildcard_match(s, n));
            all_match.then(|| base.join(relative))
        })
        .collect();

    matches.sort();
    matches
}

/// Match `text` against `pattern` where `*` matches any run of characters
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == WILDCARD {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == WILDCARD)
}

/// Find the chromosome a per-chromosome file holds: a `chr<N>` token in
/// the file name, or the token after `.sites.` as in gnomAD releases
pub fn detect_file_chrom(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();

    for (idx, _) in name.match_indices("chr") {
        let token: String = name[idx + 3..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if let Some(chrom) = normalize_chrom(&token) {
            return Some(chrom);
        }
    }

    let (_, rest) = name.split_once(".sites.")?;
    let token = rest.split('.').next()?;
    normalize_chrom(token)
}

/// Canonical chromosome name: 1-22, X, Y, M or MT
pub fn normalize_chrom(token: &str) -> Option<String> {
    let upper = token.to_ascii_uppercase();
    match upper.as_str() {
        "X" | "Y" | "M" | "MT" => Some(upper),
        n => match n.parse::<u8>() {
            Ok(num) if (1..=22).contains(&num) && !n.starts_with('0') => Some(n.to_string()),
            _ => None,
        },
    }
}
