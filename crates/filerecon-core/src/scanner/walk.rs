use crate::cancel::CancelToken;
use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::WalkDir;

/// Compile glob ignore patterns, logging and dropping invalid ones.
pub fn compile_ignore_patterns(ignore_globs: &[String]) -> Vec<Pattern> {
    ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Sequential walk returning `root` followed by every directory beneath it.
///
/// Directories that cannot be read are logged and skipped together with
/// their subtrees. Symlinked directories are not followed. Stops early when
/// `cancel` trips; the directories collected so far are still returned.
pub fn enumerate_directories(
    root: &Path,
    ignore_patterns: &[Pattern],
    cancel: &CancelToken,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !ignore_patterns
                    .iter()
                    .any(|pattern| pattern.matches_path(entry.path()))
        });

    for entry in walker {
        if cancel.is_cancelled() {
            warn!("Directory enumeration cancelled after {} directories", dirs.len());
            break;
        }
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                warn!("Skipping unreadable directory {}: {}", path, err);
            }
        }
    }

    dirs
}

/// Names and paths of the regular files directly inside `dir`, in listing
/// order. An unreadable directory yields an empty list.
pub fn list_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log_unreadable(dir, &err);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log_unreadable(dir, &err);
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            (name, entry.path())
        })
        .collect()
}

fn log_unreadable(dir: &Path, err: &io::Error) {
    if err.kind() == io::ErrorKind::PermissionDenied {
        warn!("Access denied reading directory {}: {}", dir.display(), err);
    } else {
        warn!("Error reading directory {}: {}", dir.display(), err);
    }
}
