pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{AuditRun, OperationSummary, OrganizeRun, RetrievalRun};
pub use sqlite::Database;

use crate::error::Error;

/// Receives one summary row per finished operation.
pub trait OperationSink: Send {
    fn record(&self, summary: &OperationSummary) -> Result<(), Error>;
}

/// Sink that drops every summary.
pub struct NullSink;

impl OperationSink for NullSink {
    fn record(&self, _summary: &OperationSummary) -> Result<(), Error> {
        Ok(())
    }
}

impl OperationSink for Database {
    fn record(&self, summary: &OperationSummary) -> Result<(), Error> {
        match summary {
            OperationSummary::Audit(run) => self.insert_audit_run(run)?,
            OperationSummary::Retrieval(run) => self.insert_retrieval_run(run)?,
            OperationSummary::Organize(run) => self.insert_organize_run(run)?,
        };
        Ok(())
    }
}
