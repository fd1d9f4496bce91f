//! Rename-and-file workflow for identifiers decoded outside this crate.
//!
//! Each file in an input folder is asked for its identifier (QR content,
//! a token in its name, a row in a lookup table). Identified files move to
//! `output/{identifier}{ext}`; the rest move to an error folder untouched.

use crate::cancel::CancelToken;
use crate::error::{Error, ErrorKind};
use crate::progress::{Phase, ProgressReporter};
use crate::resolver::{self, DuplicatePolicy};
use crate::retrieval::{copy_preserving_mtime, file_name_of, FileErrorRecord};
use crate::token::TokenPattern;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Supplies the identifier a file should be renamed to.
pub trait IdentifierSource {
    /// `Ok(None)` means the file carries no identifier.
    fn identify(&self, path: &Path) -> Result<Option<String>, Error>;
}

/// Identifier taken from the file name with a token pattern.
pub struct FilenamePattern {
    pattern: TokenPattern,
}

impl FilenamePattern {
    pub fn new(pattern: TokenPattern) -> Self {
        Self { pattern }
    }
}

impl IdentifierSource for FilenamePattern {
    fn identify(&self, path: &Path) -> Result<Option<String>, Error> {
        Ok(self
            .pattern
            .extract(&file_name_of(path))
            .map(|token| token.to_string()))
    }
}

/// Explicit file name -> identifier table, typically produced by an external
/// decoder and exported as CSV.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    by_name: HashMap<String, String>,
}

impl IdentifierMap {
    pub fn insert(&mut self, file_name: impl Into<String>, identifier: impl Into<String>) {
        self.by_name.insert(file_name.into(), identifier.into());
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Two columns, `file_name,identifier`, with a header row.
    pub fn from_csv(path: &Path) -> Result<Self, Error> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut map = IdentifierMap::default();
        for record in reader.records() {
            let record = record?;
            match (record.get(0), record.get(1)) {
                (Some(name), Some(id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
                    map.insert(name.trim(), id.trim());
                }
                _ => debug!("Ignoring incomplete identifier row {:?}", record),
            }
        }
        info!("Loaded {} identifiers from {}", map.len(), path.display());
        Ok(map)
    }
}

impl IdentifierSource for IdentifierMap {
    fn identify(&self, path: &Path) -> Result<Option<String>, Error> {
        Ok(self.by_name.get(&file_name_of(path)).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrganizeAction {
    Renamed { identifier: String, destination: PathBuf },
    MovedToErrors { destination: PathBuf },
    Skipped { destination: PathBuf },
    Failed { kind: ErrorKind, detail: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizeRecord {
    pub source: PathBuf,
    pub action: OrganizeAction,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeStats {
    pub processed: usize,
    pub renamed: usize,
    pub unidentified: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<OrganizeRecord>,
    pub error_details: Vec<FileErrorRecord>,
    pub cancelled: bool,
}

pub struct OrganizeOptions<'a> {
    pub output_dir: &'a Path,
    pub error_dir: &'a Path,
    /// Accepted extensions without the dot; empty accepts every file.
    pub extensions: &'a [String],
    pub policy: DuplicatePolicy,
}

/// Move every accepted file directly inside `input_dir` according to the
/// identifier `source` reports for it. Files are handled one at a time.
pub fn organize(
    input_dir: &Path,
    options: &OrganizeOptions<'_>,
    source: &dyn IdentifierSource,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> Result<OrganizeStats, Error> {
    let files = collect_input_files(input_dir, options.extensions)?;
    let mut stats = OrganizeStats::default();

    if files.is_empty() {
        warn!("No files to organize in {}", input_dir.display());
        return Ok(stats);
    }
    info!("Organizing {} files from {}", files.len(), input_dir.display());

    reporter.on_phase_start(Phase::Organize);
    let start = Instant::now();
    let total = files.len();
    for (idx, file) in files.into_iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("Organize cancelled after {} files", stats.processed);
            stats.cancelled = true;
            break;
        }

        let action = organize_one(&file, options, source);
        stats.processed += 1;
        match &action {
            OrganizeAction::Renamed { .. } => stats.renamed += 1,
            OrganizeAction::MovedToErrors { .. } => stats.unidentified += 1,
            OrganizeAction::Skipped { .. } => stats.skipped += 1,
            OrganizeAction::Failed { kind, detail } => {
                stats.failed += 1;
                stats.error_details.push(FileErrorRecord {
                    token: String::new(),
                    file_name: file_name_of(&file),
                    source_path: file.clone(),
                    destination_path: options.output_dir.to_path_buf(),
                    kind: *kind,
                    message: detail.clone(),
                    timestamp: Utc::now(),
                });
            }
        }
        stats.records.push(OrganizeRecord {
            source: file.clone(),
            action,
        });
        reporter.on_progress(idx + 1, total, &file_name_of(&file));
    }
    reporter.on_phase_complete(Phase::Organize, stats.processed, start.elapsed().as_secs_f64());

    info!(
        "Organized {} files: {} renamed, {} unidentified, {} skipped, {} failed",
        stats.processed, stats.renamed, stats.unidentified, stats.skipped, stats.failed
    );
    Ok(stats)
}

fn collect_input_files(input_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, Error> {
    if !input_dir.exists() {
        return Err(Error::RootNotFound(input_dir.to_path_buf()));
    }
    if !input_dir.is_dir() {
        return Err(Error::NotADirectory(input_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.is_file() && extension_accepted(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn extension_accepted(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

fn organize_one(
    file: &Path,
    options: &OrganizeOptions<'_>,
    source: &dyn IdentifierSource,
) -> OrganizeAction {
    let result = source.identify(file).and_then(|identifier| {
        match identifier.map(|id| sanitize_filename(&id)).filter(|id| !id.is_empty()) {
            Some(id) => {
                let (_, ext) = resolver::split_name(file);
                let target = options.output_dir.join(format!("{}{}", id, ext));
                place(file, options.output_dir, &target, options.policy).map(|placed| {
                    match placed {
                        Some(destination) => OrganizeAction::Renamed {
                            identifier: id,
                            destination,
                        },
                        None => OrganizeAction::Skipped { destination: target },
                    }
                })
            }
            None => {
                let target = options.error_dir.join(file_name_of(file));
                place(file, options.error_dir, &target, DuplicatePolicy::Skip).map(|placed| {
                    match placed {
                        Some(destination) => OrganizeAction::MovedToErrors { destination },
                        None => OrganizeAction::Skipped { destination: target },
                    }
                })
            }
        }
    });

    result.unwrap_or_else(|err| {
        let kind = ErrorKind::from(&err);
        error!("Error organizing {}: [{}] {}", file.display(), kind.as_str(), err);
        OrganizeAction::Failed {
            kind,
            detail: err.to_string(),
        }
    })
}

/// Move `file` to `target` (resolving collisions). `None` when skipped.
fn place(
    file: &Path,
    dir: &Path,
    target: &Path,
    policy: DuplicatePolicy,
) -> Result<Option<PathBuf>, Error> {
    fs::create_dir_all(dir)?;
    let destination = match resolver::resolve(target, file, policy)? {
        Some(destination) => destination,
        None => return Ok(None),
    };
    move_file(file, &destination)?;
    debug!("Moved {} -> {}", file.display(), destination.display());
    Ok(Some(destination))
}

/// Rename, falling back to copy + delete when the rename crosses devices.
fn move_file(source: &Path, destination: &Path) -> Result<(), Error> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    copy_preserving_mtime(source, destination)?;
    fs::remove_file(source)?;
    Ok(())
}

/// Replace characters Windows rejects in file names, trim whitespace and
/// trailing dots.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if "<>:\"/\\|?*".contains(c) { '_' } else { c })
        .collect();
    replaced.trim().trim_end_matches('.').to_string()
}
