use std::fs;
use tempfile::tempdir;

use filerecon_core::organize::{IdentifierMap, OrganizeAction};
use filerecon_core::reference::parse_names;
use filerecon_core::storage::{AuditRun, Database, OperationSink, OperationSummary};
use filerecon_core::{AppConfig, CancelToken, DuplicatePolicy, ReconcileEngine, SilentReporter};

fn sample_audit_run(root: &str) -> AuditRun {
    AuditRun {
        id: 0,
        recorded_at: "2024-03-01T10:00:00+00:00".to_string(),
        root_path: root.to_string(),
        reference_count: 10,
        found_count: 9,
        missing_count: 1,
        extra_count: 0,
        status: "discrepancies".to_string(),
        cancelled: false,
        duration_secs: 0.5,
    }
}

#[test]
fn test_insert_and_read_back_audit_runs() {
    let db = Database::open_in_memory().unwrap();
    let first = db.insert_audit_run(&sample_audit_run("/a")).unwrap();
    let second = db.insert_audit_run(&sample_audit_run("/b")).unwrap();
    assert!(second > first);

    let runs = db.recent_audit_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].root_path, "/b");
    assert_eq!(runs[1].missing_count, 1);

    let limited = db.recent_audit_runs(1).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_database_sink_and_truncate() {
    let db = Database::open_in_memory().unwrap();
    db.record(&OperationSummary::Audit(sample_audit_run("/x")))
        .unwrap();
    assert_eq!(db.run_counts().unwrap(), (1, 0, 0));

    db.truncate_all().unwrap();
    assert_eq!(db.run_counts().unwrap(), (0, 0, 0));
}

#[test]
fn test_engine_records_each_operation() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("100045_a.pdf"), "a").unwrap();
    let db_path = tmp.path().join("runs.db");
    let db_path = db_path.to_string_lossy().into_owned();

    let config = AppConfig {
        workers: 2,
        record_operations: true,
        db_path: db_path.clone(),
        ..AppConfig::default()
    };
    let engine = ReconcileEngine::new(config)
        .unwrap()
        .with_sink(Box::new(Database::open(&db_path).unwrap()));

    engine
        .audit(&root, "A\t100045\nB\t100046", &CancelToken::new(), &SilentReporter)
        .unwrap();
    engine
        .retrieve(
            &root,
            &parse_names("100045"),
            &tmp.path().join("dest"),
            DuplicatePolicy::Skip,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    let reader = Database::open(&db_path).unwrap();
    assert_eq!(reader.run_counts().unwrap(), (1, 1, 0));

    let audit = &reader.recent_audit_runs(5).unwrap()[0];
    assert_eq!(audit.missing_count, 1);
    assert_eq!(audit.status, "discrepancies");

    let retrieval = &reader.recent_retrieval_runs(5).unwrap()[0];
    assert_eq!(retrieval.files_copied, 1);
    assert_eq!(retrieval.search_pattern, "100045");
}

#[test]
fn test_organize_with_identifier_map() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    let errors = tmp.path().join("errors");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("scan001.pdf"), "first").unwrap();
    fs::write(input.join("scan002.pdf"), "second").unwrap();
    fs::write(input.join("notes.txt"), "not accepted").unwrap();

    let csv_path = tmp.path().join("ids.csv");
    fs::write(&csv_path, "file_name,identifier\nscan001.pdf,INV-77\n").unwrap();
    let ids = IdentifierMap::from_csv(&csv_path).unwrap();

    let engine = ReconcileEngine::new(AppConfig::default()).unwrap();
    let stats = engine
        .organize(
            &input,
            &output,
            &errors,
            &ids,
            DuplicatePolicy::Rename,
            &CancelToken::new(),
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.renamed, 1);
    assert_eq!(stats.unidentified, 1);
    assert_eq!(fs::read_to_string(output.join("INV-77.pdf")).unwrap(), "first");
    assert_eq!(fs::read_to_string(errors.join("scan002.pdf")).unwrap(), "second");
    assert!(input.join("notes.txt").exists());
    assert!(stats
        .records
        .iter()
        .any(|r| matches!(&r.action, OrganizeAction::Renamed { identifier, .. } if identifier == "INV-77")));
}
