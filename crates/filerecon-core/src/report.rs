use crate::reconcile::AuditResult;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 100;

/// Plain-text audit report. Pure function of the result.
pub fn render_report(result: &AuditResult) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "FILE AUDIT REPORT");
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "Path: {}", result.root.display());
    let _ = writeln!(out, "Date: {}", result.completed_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Expected files: {}", result.reference_count);
    let _ = writeln!(out, "Found files: {}", result.found_count);
    if result.shadowed_references > 0 {
        let _ = writeln!(
            out,
            "Repeated reference rows (last one kept): {}",
            result.shadowed_references
        );
    }
    if result.cancelled {
        let _ = writeln!(
            out,
            "WARNING: audit cancelled after {} directories; results are partial.",
            result.directories_searched
        );
    }
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out);

    if result.missing.is_empty() {
        let _ = writeln!(out, "LIST COMPLETE: every listed file is present.");
        let _ = writeln!(out);
    } else {
        let _ = writeln!(out, "SECTION 1: FILES NOT FOUND ({})", result.missing.len());
        let _ = writeln!(out, "Action required: locate these files and add them to the folder.");
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<20} | {:<15} | {}", "ORDER", "IDENTIFIER", "NOTES");
        let _ = writeln!(out, "{}", light);
        for record in &result.missing {
            let _ = writeln!(
                out,
                "{:<20} | {:<15} | {}",
                record.raw_primary_field, record.raw_secondary_field, record.free_text_rest
            );
        }
        let _ = writeln!(out);
    }

    if !result.extra.is_empty() {
        let _ = writeln!(
            out,
            "SECTION 2: UNLISTED FILES / POSSIBLE ERRORS ({})",
            result.extra.len()
        );
        let _ = writeln!(out, "These files exist in the folder but are NOT in the list.");
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<25} | {}", "DETECTED NUMBER", "ACTUAL FILE NAME");
        let _ = writeln!(out, "{}", light);
        for entry in &result.extra {
            let _ = writeln!(out, "{:<25} | {}", entry.token.as_str(), entry.filename);
        }
        let _ = writeln!(out);
    } else if result.missing.is_empty() {
        let _ = writeln!(out, "FOLDER CLEAN: no extra files.");
        let _ = writeln!(out);
    }

    if result.missing.is_empty() && result.extra.is_empty() {
        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, "PERFECT AUDIT: everything matches.");
        let _ = writeln!(out, "{}", heavy);
    }

    out
}
