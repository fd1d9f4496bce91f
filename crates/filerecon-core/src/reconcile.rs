use crate::reference::{ReferenceRecord, ReferenceSet};
use crate::scanner::{DirectoryEntry, FoundIndex};
use crate::token::Token;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Complete,
    Discrepancies,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Complete => "complete",
            AuditStatus::Discrepancies => "discrepancies",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub root: PathBuf,
    /// Reference rows with no file on disk, ascending by token.
    pub missing: Vec<ReferenceRecord>,
    /// Files whose token is not in the reference, ascending by token then
    /// scan order.
    pub extra: Vec<DirectoryEntry>,
    pub matched: Vec<Token>,
    pub reference_count: usize,
    /// Distinct tokens found on disk.
    pub found_count: usize,
    /// Reference rows replaced by a later row with the same token.
    pub shadowed_references: usize,
    pub directories_searched: usize,
    pub cancelled: bool,
    pub completed_at: DateTime<Utc>,
}

impl AuditResult {
    pub fn status(&self) -> AuditStatus {
        if self.missing.is_empty() && self.extra.is_empty() {
            AuditStatus::Complete
        } else {
            AuditStatus::Discrepancies
        }
    }

    /// Distinct tokens among `extra`.
    pub fn extra_token_count(&self) -> usize {
        let mut count = 0;
        let mut last: Option<&Token> = None;
        for entry in &self.extra {
            if last != Some(&entry.token) {
                count += 1;
                last = Some(&entry.token);
            }
        }
        count
    }
}

/// Classify reference tokens against the tokens found on disk.
pub fn reconcile(reference: &ReferenceSet, found: &FoundIndex) -> AuditResult {
    let mut missing = Vec::new();
    let mut matched = Vec::new();
    for record in reference.records() {
        if found.contains(record.token.as_str()) {
            matched.push(record.token.clone());
        } else {
            missing.push(record.clone());
        }
    }

    let extra = found
        .iter()
        .filter(|(token, _)| !reference.contains(token.as_str()))
        .flat_map(|(_, entries)| entries.iter().cloned())
        .collect();

    AuditResult {
        root: PathBuf::new(),
        missing,
        extra,
        matched,
        reference_count: reference.len(),
        found_count: found.len(),
        shadowed_references: reference.shadowed(),
        directories_searched: found.directories_searched,
        cancelled: found.cancelled,
        completed_at: Utc::now(),
    }
}
