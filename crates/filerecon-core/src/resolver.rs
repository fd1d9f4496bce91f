use crate::error::Error;
use crate::hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Upper bound on `_N` candidates tried before giving up on a file.
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// What to do when a destination path is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Delete the existing file and reuse its name.
    Overwrite,
    Skip,
    /// Append `_1`, `_2`, ... until a free name is found.
    Rename,
    /// Skip when contents are identical, rename otherwise.
    #[serde(rename = "compare", alias = "comparehash")]
    CompareHash,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Overwrite => "overwrite",
            DuplicatePolicy::Skip => "skip",
            DuplicatePolicy::Rename => "rename",
            DuplicatePolicy::CompareHash => "compare",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            "skip" => Ok(DuplicatePolicy::Skip),
            "rename" => Ok(DuplicatePolicy::Rename),
            "compare" | "comparehash" | "compare-hash" => Ok(DuplicatePolicy::CompareHash),
            other => Err(Error::Other(format!(
                "Unknown duplicate policy '{}' (expected overwrite, skip, rename or compare)",
                other
            ))),
        }
    }
}

/// Decide where `source` should land given that `destination` may be taken.
///
/// Returns `Ok(None)` when the file should not be copied at all. A free
/// `destination` is returned unchanged regardless of policy. When
/// `destination` already is `source` nothing is touched and `Ok(None)` is
/// returned for every policy.
pub fn resolve(
    destination: &Path,
    source: &Path,
    policy: DuplicatePolicy,
) -> Result<Option<PathBuf>, Error> {
    if !destination.exists() {
        return Ok(Some(destination.to_path_buf()));
    }
    if is_same_file(source, destination) {
        debug!("Skipping {}: source and destination are the same file", source.display());
        return Ok(None);
    }

    match policy {
        DuplicatePolicy::Overwrite => {
            fs::remove_file(destination)?;
            info!("Removed existing {} to overwrite it", destination.display());
            Ok(Some(destination.to_path_buf()))
        }
        DuplicatePolicy::Skip => {
            debug!("Skipping {}: destination exists", source.display());
            Ok(None)
        }
        DuplicatePolicy::Rename => unique_path(destination).map(Some),
        DuplicatePolicy::CompareHash => {
            if hasher::same_content(source, destination)? {
                debug!(
                    "Skipping {}: identical to {}",
                    source.display(),
                    destination.display()
                );
                Ok(None)
            } else {
                unique_path(destination).map(Some)
            }
        }
    }
}

/// First free `{stem}_{n}{ext}` next to `base`, or `base` itself when free.
pub fn unique_path(base: &Path) -> Result<PathBuf, Error> {
    if !base.exists() {
        return Ok(base.to_path_buf());
    }

    let parent = base.parent().unwrap_or_else(|| Path::new(""));
    let (stem, ext) = split_name(base);

    for counter in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::RenameExhausted {
        path: base.to_path_buf(),
        attempts: MAX_RENAME_ATTEMPTS,
    })
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// File stem and extension (with its leading dot, or empty).
pub(crate) fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}
