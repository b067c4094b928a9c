//! File collector.
//!
//! Expands glob patterns against a checked-out tree and reads the matching
//! text files. Patterns are relative to the tree root; `*`, `?` and `[...]`
//! stay within one path component while `**` spans any number of
//! directories. Hidden entries only match patterns that name them
//! explicitly, and `.git` is never walked.
//!
//! Binary and undecodable files are skipped with a log line. Collection stops
//! as soon as `max_files` files have been read.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::models::{truncate_lines, CollectedFile, FileContent};

/// Number of leading bytes inspected by the binary heuristic.
const BINARY_SNIFF_BYTES: u64 = 1024;

struct Candidate {
    path: PathBuf,
    relative: String,
    hidden: bool,
}

pub fn collect_files(
    root: &Path,
    patterns: &[String],
    max_files: usize,
    max_lines: usize,
) -> Result<FileContent> {
    let candidates = list_candidates(root)?;

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    'patterns: for pattern in patterns {
        let pattern = strip_current_dir(pattern.trim());
        if pattern.is_empty() {
            continue;
        }
        let matcher = build_matcher(pattern)?;
        let allow_hidden = pattern.starts_with('.') || pattern.contains("/.");

        for candidate in &candidates {
            if files.len() >= max_files {
                break 'patterns;
            }
            if candidate.hidden && !allow_hidden {
                continue;
            }
            if !matcher.is_match(&candidate.relative) {
                continue;
            }
            if !seen.insert(candidate.path.clone()) {
                continue;
            }
            if let Some(file) = read_candidate(candidate, max_lines) {
                files.push(file);
            }
        }
    }

    info!("Collected {} files from {}", files.len(), root.display());
    Ok(FileContent::new(files))
}

fn read_candidate(candidate: &Candidate, max_lines: usize) -> Option<CollectedFile> {
    let path = &candidate.path;
    match is_binary_file(path) {
        Ok(true) => {
            warn!("Skipping binary file: {}", path.display());
            return None;
        }
        Ok(false) => {}
        Err(e) => {
            error!("Error reading file {}: {:#}", path.display(), e);
            return None;
        }
    }

    let started = Instant::now();
    match std::fs::read_to_string(path) {
        Ok(text) => {
            info!(
                "Read file: {} in {:.2} seconds",
                path.display(),
                started.elapsed().as_secs_f64()
            );
            Some(CollectedFile {
                path: path.clone(),
                relative_path: candidate.relative.clone(),
                text: truncate_lines(&text, max_lines),
            })
        }
        Err(e) => {
            error!("Error reading file {}: {}", path.display(), e);
            None
        }
    }
}

/// Every regular file under `root` (following symlinks to files), sorted by
/// path, with `.git` pruned.
fn list_candidates(root: &Path) -> Result<Vec<Candidate>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    let mut candidates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let hidden = relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        candidates.push(Candidate {
            path: path.to_path_buf(),
            relative: rel_str,
            hidden,
        });
    }

    Ok(candidates)
}

/// Drop leading `./` components; candidates are matched as bare relative paths.
fn strip_current_dir(mut pattern: &str) -> &str {
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }
    pattern
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
    Ok(glob.compile_matcher())
}

/// A file is binary when its first KiB holds a byte outside the text set:
/// BEL, BS, TAB, LF, FF, CR, ESC and everything from 0x20 upwards.
pub fn is_binary_file(path: &Path) -> Result<bool> {
    let mut chunk = Vec::with_capacity(BINARY_SNIFF_BYTES as usize);
    File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .take(BINARY_SNIFF_BYTES)
        .read_to_end(&mut chunk)?;
    Ok(chunk.iter().any(|b| !is_text_byte(*b)))
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, 7 | 8 | 9 | 10 | 12 | 13 | 27) || b >= 0x20
}
