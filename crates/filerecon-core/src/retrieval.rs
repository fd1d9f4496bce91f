//! Prefix search across a directory tree and serial copy of every match.
//!
//! Retrieval matches file names that *start with* a requested token. That is
//! intentionally different from the audit scan, which extracts a numeric id
//! from each name: here the user asks for exact names, there the folder is
//! checked against a list of ids.

use crate::cancel::CancelToken;
use crate::error::{Error, ErrorKind};
use crate::pool::WorkerPool;
use crate::progress::{Phase, ProgressReporter};
use crate::resolver::{self, DuplicatePolicy};
use crate::scanner::walk;
use crate::token::Token;
use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Every file found for each requested token, in request order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSet {
    pub matches: Vec<(Token, Vec<PathBuf>)>,
    pub directories_total: usize,
    pub directories_searched: usize,
    pub cancelled: bool,
}

impl MatchSet {
    pub fn file_count(&self) -> usize {
        self.matches.iter().map(|(_, paths)| paths.len()).sum()
    }

    pub fn get(&self, token: &str) -> Option<&[PathBuf]> {
        self.matches
            .iter()
            .find(|(t, _)| t.as_str() == token)
            .map(|(_, paths)| paths.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CopyOutcome {
    Copied { destination: PathBuf },
    /// The duplicate policy decided not to copy.
    SkippedDuplicatePolicy { destination: PathBuf },
    Error { kind: ErrorKind, detail: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyRecord {
    pub token: Token,
    pub source: PathBuf,
    pub outcome: CopyOutcome,
}

/// Full context of one failed file operation.
#[derive(Debug, Clone, Serialize)]
pub struct FileErrorRecord {
    pub token: String,
    pub file_name: String,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    pub requested: usize,
    /// Directories whose listing completed.
    pub searched: usize,
    pub total_directories: usize,
    /// Matching files, counting every duplicate.
    pub found: usize,
    pub copied: usize,
    pub skipped: usize,
    pub errors: usize,
    pub bytes_copied: u64,
    pub not_found: Vec<Token>,
    /// Tokens that matched more than one file, with the match count.
    pub duplicate_files: BTreeMap<Token, usize>,
    pub outcomes: Vec<CopyRecord>,
    pub error_details: Vec<FileErrorRecord>,
    pub cancelled: bool,
}

pub struct RetrievalCopier<'a> {
    pool: &'a WorkerPool,
    ignore_patterns: &'a [Pattern],
}

impl<'a> RetrievalCopier<'a> {
    pub fn new(pool: &'a WorkerPool, ignore_patterns: &'a [Pattern]) -> Self {
        Self {
            pool,
            ignore_patterns,
        }
    }

    /// Scan phase only: find every file whose name starts with a token.
    pub fn search(
        &self,
        root: &Path,
        tokens: &[Token],
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> MatchSet {
        self.search_excluding(root, tokens, None, cancel, reporter)
    }

    /// Like `search`, skipping every directory at or below `excluded`.
    fn search_excluding(
        &self,
        root: &Path,
        tokens: &[Token],
        excluded: Option<&Path>,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> MatchSet {
        reporter.on_phase_start(Phase::Enumerate);
        let enumerate_start = Instant::now();
        let mut dirs = walk::enumerate_directories(root, self.ignore_patterns, cancel);
        let enumeration_cancelled = cancel.is_cancelled();
        if let Some(excluded) = excluded {
            dirs.retain(|dir| !dir.starts_with(excluded));
            debug!("Excluding destination {} from the search", excluded.display());
        }
        reporter.on_phase_complete(
            Phase::Enumerate,
            dirs.len(),
            enumerate_start.elapsed().as_secs_f64(),
        );
        info!("Found {} directories under {}", dirs.len(), root.display());

        let total = dirs.len();
        let mut found: Vec<Vec<PathBuf>> = vec![Vec::new(); tokens.len()];

        reporter.on_phase_start(Phase::Scan);
        let scan_start = Instant::now();
        let outcome = self.pool.run(
            dirs,
            cancel,
            |dir| match_directory(&dir, tokens),
            |done, hits| {
                for (token_idx, path) in hits {
                    found[token_idx].push(path);
                }
                reporter.on_progress(done, total, &format!("Scanning {}/{}", done, total));
            },
        );
        reporter.on_phase_complete(Phase::Scan, outcome.completed, scan_start.elapsed().as_secs_f64());

        let cancelled = enumeration_cancelled || outcome.cancelled;
        if cancelled {
            warn!(
                "Search cancelled after {}/{} directories",
                outcome.completed, total
            );
        }

        MatchSet {
            matches: tokens.iter().cloned().zip(found).collect(),
            directories_total: total,
            directories_searched: outcome.completed,
            cancelled,
        }
    }

    /// Search, then copy every match into `destination`.
    ///
    /// The first match of a token keeps its name; the K-th extra match is
    /// written as `{stem}_copyK{ext}`. The duplicate policy is consulted only
    /// when that computed name already exists on disk.
    pub fn retrieve_and_copy(
        &self,
        root: &Path,
        tokens: &[Token],
        destination: &Path,
        policy: DuplicatePolicy,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<SearchStats, Error> {
        fs::create_dir_all(destination)?;
        info!(
            "Searching {} for {} names, copying to {}",
            root.display(),
            tokens.len(),
            destination.display()
        );

        let excluded = destination_inside(root, destination);
        let match_set =
            self.search_excluding(root, tokens, excluded.as_deref(), cancel, reporter);
        let mut stats = SearchStats {
            requested: tokens.len(),
            searched: match_set.directories_searched,
            total_directories: match_set.directories_total,
            cancelled: match_set.cancelled,
            ..SearchStats::default()
        };

        let total_files = match_set.file_count();
        let mut done = 0;

        reporter.on_phase_start(Phase::Copy);
        let copy_start = Instant::now();
        for (token, paths) in match_set.matches {
            if paths.is_empty() {
                stats.not_found.push(token);
                continue;
            }

            stats.found += paths.len();
            if paths.len() > 1 {
                warn!("'{}' matched {} files", token, paths.len());
                stats.duplicate_files.insert(token.clone(), paths.len());
            }

            for (idx, source) in paths.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    stats.cancelled = true;
                    break;
                }

                let target = multiplicity_name(destination, &source, idx);
                let outcome = copy_with_policy(&source, &target, policy);
                record_outcome(&mut stats, &token, &source, &target, outcome);

                done += 1;
                reporter.on_progress(done, total_files, &format!("Copying {}/{}", done, total_files));
            }
        }
        reporter.on_phase_complete(Phase::Copy, stats.copied, copy_start.elapsed().as_secs_f64());

        info!(
            "Copied {} of {} found files ({} skipped, {} errors, {} names not found)",
            stats.copied,
            stats.found,
            stats.skipped,
            stats.errors,
            stats.not_found.len()
        );
        Ok(stats)
    }
}

/// `destination` spelled the way the walk under `root` spells it, when it is
/// a strict subdirectory of `root`.
fn destination_inside(root: &Path, destination: &Path) -> Option<PathBuf> {
    let root_canonical = fs::canonicalize(root).ok()?;
    let dest_canonical = fs::canonicalize(destination).ok()?;
    let relative = dest_canonical.strip_prefix(&root_canonical).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(relative))
}

/// Prefix-match every file in `dir` against every token. Returns
/// `(token index, path)` pairs; one file may match several tokens.
fn match_directory(dir: &Path, tokens: &[Token]) -> Vec<(usize, PathBuf)> {
    let mut hits = Vec::new();
    for (name, path) in walk::list_files(dir) {
        for (idx, token) in tokens.iter().enumerate() {
            if name.starts_with(token.as_str()) {
                hits.push((idx, path.clone()));
            }
        }
    }
    hits
}

/// Destination for the `idx`-th match of a token.
fn multiplicity_name(destination: &Path, source: &Path, idx: usize) -> PathBuf {
    if idx == 0 {
        let name = source.file_name().unwrap_or(source.as_os_str());
        return destination.join(name);
    }
    let (stem, ext) = resolver::split_name(source);
    destination.join(format!("{}_copy{}{}", stem, idx, ext))
}

enum Copied {
    Done { destination: PathBuf, bytes: u64 },
    Skipped,
}

fn copy_with_policy(source: &Path, target: &Path, policy: DuplicatePolicy) -> Result<Copied, Error> {
    let destination = if target.exists() {
        match resolver::resolve(target, source, policy)? {
            Some(path) => path,
            None => return Ok(Copied::Skipped),
        }
    } else {
        target.to_path_buf()
    };

    let bytes = copy_preserving_mtime(source, &destination)?;
    Ok(Copied::Done { destination, bytes })
}

/// `fs::copy` plus the source modification time.
pub(crate) fn copy_preserving_mtime(source: &Path, destination: &Path) -> io::Result<u64> {
    let bytes = fs::copy(source, destination)?;
    if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
        if let Ok(file) = OpenOptions::new().write(true).open(destination) {
            if let Err(e) = file.set_modified(modified) {
                debug!("Could not set mtime on {}: {}", destination.display(), e);
            }
        }
    }
    Ok(bytes)
}

fn record_outcome(
    stats: &mut SearchStats,
    token: &Token,
    source: &Path,
    target: &Path,
    result: Result<Copied, Error>,
) {
    let outcome = match result {
        Ok(Copied::Done { destination, bytes }) => {
            stats.copied += 1;
            stats.bytes_copied += bytes;
            debug!("Copied {} -> {}", source.display(), destination.display());
            CopyOutcome::Copied { destination }
        }
        Ok(Copied::Skipped) => {
            stats.skipped += 1;
            CopyOutcome::SkippedDuplicatePolicy {
                destination: target.to_path_buf(),
            }
        }
        Err(err) => {
            let kind = ErrorKind::from(&err);
            error!(
                "Error copying {} -> {}: [{}] {}",
                source.display(),
                target.display(),
                kind.as_str(),
                err
            );
            stats.errors += 1;
            stats.error_details.push(FileErrorRecord {
                token: token.to_string(),
                file_name: file_name_of(source),
                source_path: source.to_path_buf(),
                destination_path: target.to_path_buf(),
                kind,
                message: err.to_string(),
                timestamp: Utc::now(),
            });
            CopyOutcome::Error {
                kind,
                detail: err.to_string(),
            }
        }
    };

    stats.outcomes.push(CopyRecord {
        token: token.clone(),
        source: source.to_path_buf(),
        outcome,
    });
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
