pub mod walk;

use crate::cancel::CancelToken;
use crate::pool::WorkerPool;
use crate::progress::{Phase, ProgressReporter};
use crate::token::{Token, TokenPattern};
use glob::Pattern;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// One physical file discovered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub token: Token,
    pub full_path: PathBuf,
    pub filename: String,
}

/// Token -> every file carrying it, in the order the scan produced them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FoundIndex {
    entries: BTreeMap<Token, Vec<DirectoryEntry>>,
    pub directories_total: usize,
    pub directories_searched: usize,
    pub cancelled: bool,
}

impl FoundIndex {
    pub fn push(&mut self, entry: DirectoryEntry) {
        self.entries.entry(entry.token.clone()).or_default().push(entry);
    }

    pub fn get(&self, token: &str) -> Option<&[DirectoryEntry]> {
        self.entries.get(token).map(Vec::as_slice)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Token, &[DirectoryEntry])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub pattern: TokenPattern,
    /// Accepted extensions without the dot, compared case-insensitively.
    /// Empty accepts every file.
    pub extensions: Vec<String>,
    /// When set, only these tokens are emitted.
    pub tokens_of_interest: Option<HashSet<Token>>,
    pub ignore_patterns: Vec<Pattern>,
}

impl IndexOptions {
    fn accepts_extension(&self, file_name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match Path::new(file_name).extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy();
                self.extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
            }
            None => false,
        }
    }

    fn is_of_interest(&self, token: &Token) -> bool {
        self.tokens_of_interest
            .as_ref()
            .map_or(true, |wanted| wanted.contains(token))
    }
}

/// Walks a tree and indexes the files whose names yield a token.
pub struct DirectoryIndexer<'a> {
    pool: &'a WorkerPool,
    options: &'a IndexOptions,
}

impl<'a> DirectoryIndexer<'a> {
    pub fn new(pool: &'a WorkerPool, options: &'a IndexOptions) -> Self {
        Self { pool, options }
    }

    pub fn scan(
        &self,
        root: &Path,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> FoundIndex {
        reporter.on_phase_start(Phase::Enumerate);
        let enumerate_start = Instant::now();
        let dirs = walk::enumerate_directories(root, &self.options.ignore_patterns, cancel);
        reporter.on_phase_complete(
            Phase::Enumerate,
            dirs.len(),
            enumerate_start.elapsed().as_secs_f64(),
        );
        info!("Found {} directories under {}", dirs.len(), root.display());
        let enumeration_cancelled = cancel.is_cancelled();

        let mut index = self.scan_directories(dirs, cancel, reporter);
        index.cancelled |= enumeration_cancelled;
        index
    }

    pub fn scan_directories(
        &self,
        dirs: Vec<PathBuf>,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> FoundIndex {
        let mut index = FoundIndex {
            directories_total: dirs.len(),
            ..FoundIndex::default()
        };

        reporter.on_phase_start(Phase::Scan);
        let scan_start = Instant::now();
        let total = dirs.len();
        let outcome = self.pool.run(
            dirs,
            cancel,
            |dir| self.index_directory(&dir),
            |done, entries| {
                for entry in entries {
                    index.push(entry);
                }
                reporter.on_progress(done, total, &format!("Scanning {}/{}", done, total));
            },
        );
        index.directories_searched = outcome.completed;
        index.cancelled = outcome.cancelled;
        reporter.on_phase_complete(Phase::Scan, outcome.completed, scan_start.elapsed().as_secs_f64());

        debug!(
            "Indexed {} files under {} tokens in {}/{} directories{}",
            index.file_count(),
            index.len(),
            index.directories_searched,
            index.directories_total,
            if index.cancelled { " (cancelled)" } else { "" },
        );
        index
    }

    fn index_directory(&self, dir: &Path) -> Vec<DirectoryEntry> {
        walk::list_files(dir)
            .into_iter()
            .filter(|(name, _)| self.options.accepts_extension(name))
            .filter_map(|(name, path)| {
                let token = self.options.pattern.extract(&name)?;
                if !self.options.is_of_interest(&token) {
                    return None;
                }
                Some(DirectoryEntry {
                    token,
                    full_path: path,
                    filename: name,
                })
            })
            .collect()
    }
}
