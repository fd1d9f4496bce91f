use crate::cancel::CancelToken;
use crate::config::AppConfig;
use crate::error::Error;
use crate::organize::{self, IdentifierSource, OrganizeOptions, OrganizeStats};
use crate::pool::WorkerPool;
use crate::progress::ProgressReporter;
use crate::reconcile::{self, AuditResult};
use crate::reference::{ReferenceParser, ReferenceSet};
use crate::resolver::DuplicatePolicy;
use crate::retrieval::{MatchSet, RetrievalCopier, SearchStats};
use crate::scanner::{walk, DirectoryIndexer, IndexOptions};
use crate::storage::{AuditRun, NullSink, OperationSink, OperationSummary, OrganizeRun, RetrievalRun};
use crate::token::{Token, TokenPattern};
use glob::Pattern;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Number of requested names kept in the retrieval history row.
const SEARCH_PATTERN_NAMES: usize = 5;

/// Entry point for audits, retrievals and organize runs.
///
/// Owns the worker pool for its whole lifetime, so consecutive operations
/// reuse the same threads.
pub struct ReconcileEngine {
    config: AppConfig,
    pool: WorkerPool,
    parser: ReferenceParser,
    pattern: TokenPattern,
    ignore_patterns: Vec<Pattern>,
    sink: Box<dyn OperationSink>,
}

impl ReconcileEngine {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let pool = WorkerPool::new(config.worker_count())?;
        Self::with_pool(config, pool)
    }

    pub fn with_pool(config: AppConfig, pool: WorkerPool) -> Result<Self, Error> {
        let pattern = TokenPattern::new(&config.token_pattern, config.digits_only)?;
        let parser = ReferenceParser::new(&config.header_keywords);
        let ignore_patterns = walk::compile_ignore_patterns(&config.ignore_patterns);
        Ok(Self {
            config,
            pool,
            parser,
            pattern,
            ignore_patterns,
            sink: Box::new(NullSink),
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn OperationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn parse_reference(&self, text: &str) -> ReferenceSet {
        self.parser.parse(text)
    }

    /// Parse `reference_text`, scan `root` and classify the difference.
    pub fn audit(
        &self,
        root: &Path,
        reference_text: &str,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<AuditResult, Error> {
        let reference = self.parser.parse(reference_text);
        self.audit_reference(root, &reference, cancel, reporter)
    }

    pub fn audit_reference(
        &self,
        root: &Path,
        reference: &ReferenceSet,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<AuditResult, Error> {
        check_root(root)?;
        if reference.is_empty() {
            warn!("Reference list produced no tokens");
            return Err(Error::EmptyReference);
        }
        info!(
            "Auditing {} against {} reference tokens",
            root.display(),
            reference.len()
        );

        let start = Instant::now();
        let options = IndexOptions {
            pattern: self.pattern.clone(),
            extensions: self.config.audit_extensions.clone(),
            tokens_of_interest: None,
            ignore_patterns: self.ignore_patterns.clone(),
        };
        let found = DirectoryIndexer::new(&self.pool, &options).scan(root, cancel, reporter);

        let mut result = reconcile::reconcile(reference, &found);
        result.root = root.to_path_buf();
        let duration = start.elapsed();

        info!(
            "Audit completed in {:.2}s: {} missing, {} extra",
            duration.as_secs_f64(),
            result.missing.len(),
            result.extra_token_count()
        );

        self.record(OperationSummary::Audit(AuditRun {
            id: 0,
            recorded_at: result.completed_at.to_rfc3339(),
            root_path: root.to_string_lossy().into_owned(),
            reference_count: result.reference_count as i64,
            found_count: result.found_count as i64,
            missing_count: result.missing.len() as i64,
            extra_count: result.extra_token_count() as i64,
            status: result.status().as_str().to_string(),
            cancelled: result.cancelled,
            duration_secs: duration.as_secs_f64(),
        }));

        Ok(result)
    }

    /// Find every file whose name starts with one of `tokens`, without copying.
    pub fn search(
        &self,
        root: &Path,
        tokens: &[Token],
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<MatchSet, Error> {
        check_root(root)?;
        if tokens.is_empty() {
            return Err(Error::NoTokens);
        }
        let start = Instant::now();
        let matches = self.copier().search(root, tokens, cancel, reporter);
        debug!(
            "Search found {} files in {:.2}s",
            matches.file_count(),
            start.elapsed().as_secs_f64()
        );
        Ok(matches)
    }

    /// Search `root` for `tokens` and copy every match into `destination`.
    pub fn retrieve(
        &self,
        root: &Path,
        tokens: &[Token],
        destination: &Path,
        policy: DuplicatePolicy,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<SearchStats, Error> {
        check_root(root)?;
        if tokens.is_empty() {
            return Err(Error::NoTokens);
        }

        let start = Instant::now();
        let stats = self
            .copier()
            .retrieve_and_copy(root, tokens, destination, policy, cancel, reporter)?;
        let duration = start.elapsed();

        self.record(OperationSummary::Retrieval(RetrievalRun {
            id: 0,
            recorded_at: chrono::Utc::now().to_rfc3339(),
            source_path: root.to_string_lossy().into_owned(),
            destination_path: destination.to_string_lossy().into_owned(),
            files_requested: tokens.len() as i64,
            files_found: stats.found as i64,
            files_copied: stats.copied as i64,
            files_skipped: stats.skipped as i64,
            files_error: stats.errors as i64,
            search_pattern: search_pattern(tokens),
            cancelled: stats.cancelled,
            duration_secs: duration.as_secs_f64(),
        }));

        Ok(stats)
    }

    /// Move files from `input_dir` to names given by `identifiers`.
    #[allow(clippy::too_many_arguments)]
    pub fn organize(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        error_dir: &Path,
        identifiers: &dyn IdentifierSource,
        policy: DuplicatePolicy,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<OrganizeStats, Error> {
        let options = OrganizeOptions {
            output_dir,
            error_dir,
            extensions: &self.config.organize_extensions,
            policy,
        };

        let start = Instant::now();
        let stats = organize::organize(input_dir, &options, identifiers, cancel, reporter)?;

        self.record(OperationSummary::Organize(OrganizeRun {
            id: 0,
            recorded_at: chrono::Utc::now().to_rfc3339(),
            input_path: input_dir.to_string_lossy().into_owned(),
            output_path: output_dir.to_string_lossy().into_owned(),
            processed: stats.processed as i64,
            renamed: stats.renamed as i64,
            unidentified: stats.unidentified as i64,
            skipped: stats.skipped as i64,
            failed: stats.failed as i64,
            cancelled: stats.cancelled,
            duration_secs: start.elapsed().as_secs_f64(),
        }));

        Ok(stats)
    }

    /// Name-token pattern from the configuration, for callers building an
    /// identifier source from file names.
    pub fn token_pattern(&self) -> &TokenPattern {
        &self.pattern
    }

    fn copier(&self) -> RetrievalCopier<'_> {
        RetrievalCopier::new(&self.pool, &self.ignore_patterns)
    }

    /// Sink failures never fail the operation that produced the summary.
    fn record(&self, summary: OperationSummary) {
        if !self.config.record_operations {
            return;
        }
        if let Err(e) = self.sink.record(&summary) {
            warn!("Could not record operation summary: {}", e);
        }
    }
}

fn check_root(root: &Path) -> Result<(), Error> {
    if !root.exists() {
        return Err(Error::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

fn search_pattern(tokens: &[Token]) -> String {
    tokens
        .iter()
        .take(SEARCH_PATTERN_NAMES)
        .map(Token::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_keeps_first_five() {
        let tokens: Vec<Token> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .filter_map(|t| Token::new(*t))
            .collect();
        assert_eq!(search_pattern(&tokens), "a, b, c, d, e");
    }

    #[test]
    fn test_invalid_pattern_rejected_at_construction() {
        let config = AppConfig {
            token_pattern: "(".to_string(),
            workers: 1,
            ..AppConfig::default()
        };
        assert!(matches!(ReconcileEngine::new(config), Err(Error::Pattern(_))));
    }
}
