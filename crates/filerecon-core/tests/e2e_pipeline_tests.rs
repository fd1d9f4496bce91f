use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;

use filerecon_core::reference::parse_names;
use filerecon_core::retrieval::CopyOutcome;
use filerecon_core::{
    AppConfig, AuditStatus, CancelToken, DuplicatePolicy, Error, ErrorKind, Phase,
    ProgressReporter, ReconcileEngine, SilentReporter, Token,
};

fn engine() -> ReconcileEngine {
    let config = AppConfig {
        workers: 4,
        record_operations: false,
        ..AppConfig::default()
    };
    ReconcileEngine::new(config).unwrap()
}

fn names(list: &str) -> Vec<Token> {
    parse_names(list)
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Cancels the shared token once the scan phase has produced `after` results.
struct CancelDuring {
    phase: Phase,
    after: usize,
    token: CancelToken,
    current: Mutex<Option<Phase>>,
}

impl CancelDuring {
    fn new(phase: Phase, after: usize, token: CancelToken) -> Self {
        Self {
            phase,
            after,
            token,
            current: Mutex::new(None),
        }
    }
}

impl ProgressReporter for CancelDuring {
    fn on_phase_start(&self, phase: Phase) {
        *self.current.lock().unwrap() = Some(phase);
    }

    fn on_progress(&self, completed: usize, _total: usize, _label: &str) {
        if *self.current.lock().unwrap() == Some(self.phase) && completed >= self.after {
            self.token.cancel();
        }
    }
}

#[test]
fn test_audit_reports_missing_token() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("100045_report.pdf"), "report").unwrap();

    let result = engine()
        .audit(
            tmp.path(),
            "OC001\t100045\nOC002\t100046",
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    let missing: Vec<&str> = result.missing.iter().map(|r| r.token.as_str()).collect();
    assert_eq!(missing, vec!["100046"]);
    assert_eq!(result.missing[0].raw_primary_field, "OC002");
    assert!(result.extra.is_empty());
    assert_eq!(result.reference_count, 2);
    assert_eq!(result.found_count, 1);
    assert_eq!(result.status(), AuditStatus::Discrepancies);
    assert_eq!(result.root, tmp.path());
}

#[test]
fn test_audit_finds_extras_in_nested_folders() {
    let tmp = tempdir().unwrap();
    let nested = tmp.path().join("2024/march");
    fs::create_dir_all(&nested).unwrap();
    fs::write(tmp.path().join("500.pdf"), "a").unwrap();
    fs::write(nested.join("600_late.pdf"), "b").unwrap();
    fs::write(nested.join("700.docx"), "ignored by extension").unwrap();

    let result = engine()
        .audit(
            tmp.path(),
            "ORDEN\tSUMINISTRO\nA1\t500\n",
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert!(result.missing.is_empty());
    assert_eq!(result.extra.len(), 1);
    assert_eq!(result.extra[0].filename, "600_late.pdf");
    assert_eq!(result.directories_searched, 3);
}

#[test]
fn test_audit_configuration_errors() {
    let tmp = tempdir().unwrap();
    let engine = engine();

    let missing_root = engine.audit(
        &tmp.path().join("absent"),
        "A\t1",
        &CancelToken::new(),
        &SilentReporter,
    );
    assert!(matches!(missing_root, Err(Error::RootNotFound(_))));

    let no_tokens = engine.audit(tmp.path(), "just one column\n", &CancelToken::new(), &SilentReporter);
    assert!(matches!(no_tokens, Err(Error::EmptyReference)));

    let no_names = engine.retrieve(
        tmp.path(),
        &[],
        &tmp.path().join("dest"),
        DuplicatePolicy::Skip,
        &CancelToken::new(),
        &SilentReporter,
    );
    assert!(matches!(no_names, Err(Error::NoTokens)));
}

#[test]
fn test_retrieval_copies_every_duplicate() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("100045_a.pdf"), "first").unwrap();
    fs::write(root.join("100045_b.pdf"), "second").unwrap();
    let dest = tmp.path().join("dest");

    let stats = engine()
        .retrieve(
            &root,
            &names("100045"),
            &dest,
            DuplicatePolicy::Rename,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(stats.found, 2);
    assert_eq!(stats.copied, 2);
    assert_eq!(stats.duplicate_files.get("100045"), Some(&2));
    assert!(stats.not_found.is_empty());

    let listing = dir_listing(&dest);
    assert_eq!(listing.len(), 2);
    assert!(listing.iter().any(|n| n.ends_with("_copy1.pdf")));
    // Listing order decides which file keeps its own name.
    assert!(listing.contains(&"100045_a.pdf".to_string()) || listing.contains(&"100045_b.pdf".to_string()));
}

#[test]
fn test_retrieval_searches_subdirectories_and_reports_not_found() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("share");
    fs::create_dir_all(root.join("a/b/c")).unwrap();
    fs::write(root.join("a/b/c/INV-9.pdf"), "deep").unwrap();
    let dest = tmp.path().join("dest");

    let stats = engine()
        .retrieve(
            &root,
            &names("INV-9\nINV-10\n"),
            &dest,
            DuplicatePolicy::Skip,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(stats.searched, 4);
    assert_eq!(stats.copied, 1);
    let not_found: Vec<&str> = stats.not_found.iter().map(Token::as_str).collect();
    assert_eq!(not_found, vec!["INV-10"]);
    assert_eq!(fs::read_to_string(dest.join("INV-9.pdf")).unwrap(), "deep");
}

#[test]
fn test_second_retrieval_with_skip_copies_nothing() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("42_a.pdf"), "a").unwrap();
    fs::write(root.join("sub/42_b.pdf"), "b").unwrap();
    fs::write(root.join("43.pdf"), "c").unwrap();
    let dest = tmp.path().join("dest");
    let engine = engine();
    let tokens = names("42\n43");

    let first = engine
        .retrieve(&root, &tokens, &dest, DuplicatePolicy::Skip, &CancelToken::new(), &SilentReporter)
        .unwrap();
    assert_eq!(first.copied, 3);

    let second = engine
        .retrieve(&root, &tokens, &dest, DuplicatePolicy::Skip, &CancelToken::new(), &SilentReporter)
        .unwrap();
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.found, 3);
    assert!(second
        .outcomes
        .iter()
        .all(|r| matches!(r.outcome, CopyOutcome::SkippedDuplicatePolicy { .. })));
    assert_eq!(dir_listing(&dest).len(), 3);
}

#[test]
fn test_compare_policy_skips_identical_and_renames_different() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("report.pdf"), "v1").unwrap();
    let dest = tmp.path().join("dest");
    let engine = engine();
    let tokens = names("report");

    engine
        .retrieve(&root, &tokens, &dest, DuplicatePolicy::CompareHash, &CancelToken::new(), &SilentReporter)
        .unwrap();

    let again = engine
        .retrieve(&root, &tokens, &dest, DuplicatePolicy::CompareHash, &CancelToken::new(), &SilentReporter)
        .unwrap();
    assert_eq!(again.copied, 0);
    assert_eq!(again.skipped, 1);
    assert_eq!(dir_listing(&dest), vec!["report.pdf".to_string()]);

    fs::write(root.join("report.pdf"), "v2 with changes").unwrap();
    let changed = engine
        .retrieve(&root, &tokens, &dest, DuplicatePolicy::CompareHash, &CancelToken::new(), &SilentReporter)
        .unwrap();
    assert_eq!(changed.copied, 1);
    assert_eq!(fs::read_to_string(dest.join("report.pdf")).unwrap(), "v1");
    assert_eq!(fs::read_to_string(dest.join("report_1.pdf")).unwrap(), "v2 with changes");
}

#[test]
fn test_overwrite_replaces_existing_content() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    let dest = tmp.path().join("dest");
    fs::create_dir_all(&root).unwrap();
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("target.pdf"), "old content").unwrap();
    fs::write(root.join("target.pdf"), "new content").unwrap();

    let stats = engine()
        .retrieve(
            &root,
            &names("target"),
            &dest,
            DuplicatePolicy::Overwrite,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(stats.copied, 1);
    assert_eq!(fs::read(dest.join("target.pdf")).unwrap(), b"new content");
    assert_eq!(dir_listing(&dest), vec!["target.pdf".to_string()]);
}

#[test]
fn test_cancel_during_scan_returns_partial_stats() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    for i in 0..9 {
        fs::create_dir_all(root.join(format!("dir{}", i))).unwrap();
    }
    for i in 0..9 {
        fs::write(root.join(format!("dir{}/100045_{}.pdf", i, i)), "x").unwrap();
    }
    fs::write(root.join("100045_root.pdf"), "x").unwrap();
    let dest = tmp.path().join("dest");

    let cancel = CancelToken::new();
    let reporter = CancelDuring::new(Phase::Scan, 1, cancel.clone());
    let stats = engine()
        .retrieve(
            &root,
            &names("100045\n999"),
            &dest,
            DuplicatePolicy::Rename,
            &cancel,
            &reporter,
        )
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.total_directories, 10);
    assert_eq!(stats.searched, 1);
    assert_eq!(stats.found, 1);
    assert_eq!(stats.copied, 0);
    let not_found: Vec<&str> = stats.not_found.iter().map(Token::as_str).collect();
    assert_eq!(not_found, vec!["999"]);
}

#[test]
fn test_cancel_during_copy_keeps_completed_copies() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    for i in 0..5 {
        fs::write(root.join(format!("7_{}.pdf", i)), "x").unwrap();
    }
    let dest = tmp.path().join("dest");

    let cancel = CancelToken::new();
    let reporter = CancelDuring::new(Phase::Copy, 2, cancel.clone());
    let stats = engine()
        .retrieve(&root, &names("7"), &dest, DuplicatePolicy::Rename, &cancel, &reporter)
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.found, 5);
    assert_eq!(stats.copied, 2);
    assert_eq!(dir_listing(&dest).len(), 2);
}

#[test]
fn test_search_does_not_copy() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("abc-1.txt"), "x").unwrap();
    fs::write(tmp.path().join("abc-2.txt"), "y").unwrap();

    let matches = engine()
        .search(tmp.path(), &names("abc\nzzz"), &CancelToken::new(), &SilentReporter)
        .unwrap();

    assert_eq!(matches.get("abc").unwrap().len(), 2);
    assert!(matches.get("zzz").unwrap().is_empty());
    assert_eq!(matches.file_count(), 2);
    assert_eq!(dir_listing(tmp.path()).len(), 2);
}

#[test]
fn test_results_serialize_for_callers() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("9_a.pdf"), "a").unwrap();
    fs::write(root.join("9_b.pdf"), "b").unwrap();

    let stats = engine()
        .retrieve(
            &root,
            &names("9"),
            &tmp.path().join("dest"),
            DuplicatePolicy::Rename,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["copied"], 2);
    assert_eq!(json["duplicate_files"]["9"], 2);
    assert_eq!(json["outcomes"][0]["outcome"]["outcome"], "copied");
}

#[test]
fn test_exhausted_rename_is_a_file_error_and_batch_continues() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    let dest = tmp.path().join("dest");
    fs::create_dir_all(&root).unwrap();
    fs::create_dir_all(&dest).unwrap();
    fs::write(root.join("77.pdf"), "new").unwrap();
    fs::write(root.join("88.pdf"), "other").unwrap();
    fs::write(dest.join("77.pdf"), "old").unwrap();
    for n in 1..=1000 {
        fs::write(dest.join(format!("77_{}.pdf", n)), "old").unwrap();
    }

    let stats = engine()
        .retrieve(
            &root,
            &names("77\n88"),
            &dest,
            DuplicatePolicy::Rename,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(stats.found, 2);
    assert_eq!(stats.copied, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.error_details[0].kind, ErrorKind::RenameExhausted);
    assert_eq!(stats.error_details[0].token, "77");
    assert_eq!(fs::read_to_string(dest.join("88.pdf")).unwrap(), "other");
    assert!(!dest.join("77_1001.pdf").exists());
}

#[test]
fn test_overwrite_with_destination_under_root_keeps_only_copy() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("share");
    let dest = root.join("retrieved");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("555_only_copy.pdf"), "only copy").unwrap();

    let stats = engine()
        .retrieve(
            &root,
            &names("555"),
            &dest,
            DuplicatePolicy::Overwrite,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(stats.errors, 0);
    assert_eq!(stats.found, 0);
    assert_eq!(
        fs::read_to_string(dest.join("555_only_copy.pdf")).unwrap(),
        "only copy"
    );
}
