use serde::Serialize;

/// One audit invocation.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRun {
    pub id: i64,
    pub recorded_at: String,
    pub root_path: String,
    pub reference_count: i64,
    pub found_count: i64,
    pub missing_count: i64,
    pub extra_count: i64,
    pub status: String,
    pub cancelled: bool,
    pub duration_secs: f64,
}

/// One search-and-copy invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalRun {
    pub id: i64,
    pub recorded_at: String,
    pub source_path: String,
    pub destination_path: String,
    pub files_requested: i64,
    pub files_found: i64,
    pub files_copied: i64,
    pub files_skipped: i64,
    pub files_error: i64,
    /// First few requested names, comma separated.
    pub search_pattern: String,
    pub cancelled: bool,
    pub duration_secs: f64,
}

/// One organize invocation.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeRun {
    pub id: i64,
    pub recorded_at: String,
    pub input_path: String,
    pub output_path: String,
    pub processed: i64,
    pub renamed: i64,
    pub unidentified: i64,
    pub skipped: i64,
    pub failed: i64,
    pub cancelled: bool,
    pub duration_secs: f64,
}

/// What an engine hands to its sink after each operation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationSummary {
    Audit(AuditRun),
    Retrieval(RetrievalRun),
    Organize(OrganizeRun),
}
