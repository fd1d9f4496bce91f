use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, Result, Row};
use tracing::debug;

impl Database {
    // ── Inserts ──────────────────────────────────────────────────

    pub fn insert_audit_run(&self, run: &AuditRun) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO audit_run (recorded_at, root_path, reference_count, found_count, \
             missing_count, extra_count, status, cancelled, duration_secs) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.recorded_at,
                run.root_path,
                run.reference_count,
                run.found_count,
                run.missing_count,
                run.extra_count,
                run.status,
                run.cancelled,
                run.duration_secs,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Recorded audit run {} for {}", id, run.root_path);
        Ok(id)
    }

    pub fn insert_retrieval_run(&self, run: &RetrievalRun) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO retrieval_run (recorded_at, source_path, destination_path, \
             files_requested, files_found, files_copied, files_skipped, files_error, \
             search_pattern, cancelled, duration_secs) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run.recorded_at,
                run.source_path,
                run.destination_path,
                run.files_requested,
                run.files_found,
                run.files_copied,
                run.files_skipped,
                run.files_error,
                run.search_pattern,
                run.cancelled,
                run.duration_secs,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Recorded retrieval run {} from {}", id, run.source_path);
        Ok(id)
    }

    pub fn insert_organize_run(&self, run: &OrganizeRun) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO organize_run (recorded_at, input_path, output_path, processed, \
             renamed, unidentified, skipped, failed, cancelled, duration_secs) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run.recorded_at,
                run.input_path,
                run.output_path,
                run.processed,
                run.renamed,
                run.unidentified,
                run.skipped,
                run.failed,
                run.cancelled,
                run.duration_secs,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Recorded organize run {} from {}", id, run.input_path);
        Ok(id)
    }

    // ── History ──────────────────────────────────────────────────

    /// Most recent audits first.
    pub fn recent_audit_runs(&self, limit: i64) -> Result<Vec<AuditRun>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, recorded_at, root_path, reference_count, found_count, missing_count, \
             extra_count, status, cancelled, duration_secs \
             FROM audit_run ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], audit_run_from_row)?;
        rows.collect()
    }

    pub fn recent_retrieval_runs(&self, limit: i64) -> Result<Vec<RetrievalRun>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, recorded_at, source_path, destination_path, files_requested, \
             files_found, files_copied, files_skipped, files_error, search_pattern, \
             cancelled, duration_secs \
             FROM retrieval_run ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], retrieval_run_from_row)?;
        rows.collect()
    }

    pub fn recent_organize_runs(&self, limit: i64) -> Result<Vec<OrganizeRun>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, recorded_at, input_path, output_path, processed, renamed, \
             unidentified, skipped, failed, cancelled, duration_secs \
             FROM organize_run ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], organize_run_from_row)?;
        rows.collect()
    }

    /// Total rows per table: (audits, retrievals, organizes).
    pub fn run_counts(&self) -> Result<(i64, i64, i64)> {
        self.connection().query_row(
            "SELECT (SELECT COUNT(*) FROM audit_run), \
                    (SELECT COUNT(*) FROM retrieval_run), \
                    (SELECT COUNT(*) FROM organize_run)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
    }
}

fn audit_run_from_row(row: &Row<'_>) -> Result<AuditRun> {
    Ok(AuditRun {
        id: row.get(0)?,
        recorded_at: row.get(1)?,
        root_path: row.get(2)?,
        reference_count: row.get(3)?,
        found_count: row.get(4)?,
        missing_count: row.get(5)?,
        extra_count: row.get(6)?,
        status: row.get(7)?,
        cancelled: row.get(8)?,
        duration_secs: row.get(9)?,
    })
}

fn retrieval_run_from_row(row: &Row<'_>) -> Result<RetrievalRun> {
    Ok(RetrievalRun {
        id: row.get(0)?,
        recorded_at: row.get(1)?,
        source_path: row.get(2)?,
        destination_path: row.get(3)?,
        files_requested: row.get(4)?,
        files_found: row.get(5)?,
        files_copied: row.get(6)?,
        files_skipped: row.get(7)?,
        files_error: row.get(8)?,
        search_pattern: row.get(9)?,
        cancelled: row.get(10)?,
        duration_secs: row.get(11)?,
    })
}

fn organize_run_from_row(row: &Row<'_>) -> Result<OrganizeRun> {
    Ok(OrganizeRun {
        id: row.get(0)?,
        recorded_at: row.get(1)?,
        input_path: row.get(2)?,
        output_path: row.get(3)?,
        processed: row.get(4)?,
        renamed: row.get(5)?,
        unidentified: row.get(6)?,
        skipped: row.get(7)?,
        failed: row.get(8)?,
        cancelled: row.get(9)?,
        duration_secs: row.get(10)?,
    })
}
