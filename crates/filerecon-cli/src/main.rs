mod commands;
mod logging;
mod progress;

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use filerecon_core::organize::{FilenamePattern, IdentifierMap, IdentifierSource};
use filerecon_core::reference::parse_names;
use filerecon_core::report::render_report;
use filerecon_core::storage::Database;
use filerecon_core::{
    AppConfig, AuditStatus, CancelToken, DuplicatePolicy, ReconcileEngine, Token,
};
use progress::CliReporter;
use tracing::{error, info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match filerecon_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling, finishing work in progress...");
        handler_token.cancel();
    })?;

    let outcome = match args.command {
        Some(Commands::Audit {
            root,
            reference,
            pattern,
            report,
            json,
        }) => run_audit(config, &root, &reference, pattern, report.as_deref(), json, &cancel),
        Some(Commands::Retrieve {
            root,
            names,
            dest,
            policy,
            json,
        }) => run_retrieve(config, &root, &names, &dest, policy.as_deref(), json, &cancel),
        Some(Commands::Search { root, names }) => run_search(config, &root, &names, &cancel),
        Some(Commands::Organize {
            input,
            output,
            errors,
            ids,
            policy,
        }) => run_organize(
            config,
            &input,
            &output,
            &errors,
            ids.as_deref(),
            policy.as_deref(),
            &cancel,
        ),
        Some(Commands::History { limit }) => run_history(&config, limit),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        Some(Commands::TruncateDb) => {
            match prompt_confirm(
                "Are you SURE you want to delete every recorded operation?",
                Some(false),
            ) {
                Ok(true) => {
                    let db = Database::open(&config.db_path)?;
                    db.truncate_all()?;
                    println!("All tables truncated");
                    Ok(())
                }
                _ => process::exit(0),
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {}", err);
        process::exit(1);
    }

    Ok(())
}

fn build_engine(config: AppConfig) -> CliResult<ReconcileEngine> {
    let sink = if config.record_operations {
        match Database::open(&config.db_path) {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("Operations will not be recorded, cannot open {}: {}", config.db_path, e);
                None
            }
        }
    } else {
        None
    };

    let engine = ReconcileEngine::new(config)?;
    Ok(match sink {
        Some(db) => engine.with_sink(Box::new(db)),
        None => engine,
    })
}

/// Reads a whole file, or stdin when `path` is `-`.
fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path)
    }
}

fn read_names(path: &Path) -> CliResult<Vec<Token>> {
    let names = parse_names(&read_input(path)?);
    info!("{} names requested", names.len());
    Ok(names)
}

fn policy_or_default(policy: Option<&str>, config: &AppConfig) -> CliResult<DuplicatePolicy> {
    Ok(match policy {
        Some(p) => p.parse()?,
        None => config.duplicate_policy,
    })
}

fn run_audit(
    mut config: AppConfig,
    root: &Path,
    reference: &Path,
    pattern: Option<String>,
    report: Option<&Path>,
    json: bool,
    cancel: &CancelToken,
) -> CliResult<()> {
    if let Some(pattern) = pattern {
        config.token_pattern = pattern;
    }
    let engine = build_engine(config)?;
    let text = read_input(reference)?;
    let reporter = CliReporter::new();
    let result = engine.audit(root, &text, cancel, &reporter)?;

    if let Some(path) = report {
        fs::write(path, render_report(&result))?;
        info!("Report written to {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    info!(
        "{} reference tokens, {} found on disk, {} directories searched",
        format!("{}", result.reference_count).cyan(),
        format!("{}", result.found_count).cyan(),
        result.directories_searched,
    );
    for record in &result.missing {
        println!(
            "  {} {} ({})",
            "missing".red(),
            record.token,
            record.raw_primary_field
        );
    }
    for entry in &result.extra {
        println!("  {} {}", "extra".yellow(), entry.full_path.display());
    }
    match result.status() {
        AuditStatus::Complete => info!("{}", "Audit complete: no discrepancies".green()),
        AuditStatus::Discrepancies => info!(
            "{} missing, {} extra",
            format!("{}", result.missing.len()).red(),
            format!("{}", result.extra_token_count()).yellow(),
        ),
    }
    if result.cancelled {
        warn!("Audit was cancelled, results are partial");
    }

    Ok(())
}

fn run_retrieve(
    config: AppConfig,
    root: &Path,
    names: &Path,
    dest: &Path,
    policy: Option<&str>,
    json: bool,
    cancel: &CancelToken,
) -> CliResult<()> {
    let policy = policy_or_default(policy, &config)?;
    let engine = build_engine(config)?;
    let tokens = read_names(names)?;
    let reporter = CliReporter::new();
    let stats = engine.retrieve(root, &tokens, dest, policy, cancel, &reporter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    info!(
        "Searched {}/{} directories for {} names",
        stats.searched, stats.total_directories, stats.requested
    );
    info!(
        "{} found, {} copied ({} bytes), {} skipped, {} errors",
        format!("{}", stats.found).cyan(),
        format!("{}", stats.copied).green(),
        stats.bytes_copied,
        format!("{}", stats.skipped).yellow(),
        format!("{}", stats.errors).red(),
    );
    for (token, count) in &stats.duplicate_files {
        println!("  {} {} matched {} files", "duplicate".yellow(), token, count);
    }
    for token in &stats.not_found {
        println!("  {} {}", "not found".red(), token);
    }
    for record in &stats.error_details {
        println!(
            "  {} {} [{}] {}",
            "error".red(),
            record.source_path.display(),
            record.kind.as_str(),
            record.message
        );
    }
    if stats.cancelled {
        warn!("Retrieval was cancelled, results are partial");
    }

    Ok(())
}

fn run_search(config: AppConfig, root: &Path, names: &Path, cancel: &CancelToken) -> CliResult<()> {
    let engine = build_engine(config)?;
    let tokens = read_names(names)?;
    let reporter = CliReporter::new();
    let matches = engine.search(root, &tokens, cancel, &reporter)?;

    for (token, paths) in &matches.matches {
        if paths.is_empty() {
            println!("{} {}", token.as_str().bold(), "not found".red());
            continue;
        }
        println!("{} ({})", token.as_str().bold(), paths.len());
        for path in paths {
            println!("  {}", path.display());
        }
    }
    info!(
        "{} files in {}/{} directories",
        format!("{}", matches.file_count()).cyan(),
        matches.directories_searched,
        matches.directories_total
    );

    Ok(())
}

fn run_organize(
    config: AppConfig,
    input: &Path,
    output: &Path,
    errors: &Path,
    ids: Option<&Path>,
    policy: Option<&str>,
    cancel: &CancelToken,
) -> CliResult<()> {
    let policy = policy_or_default(policy, &config)?;
    let engine = build_engine(config)?;
    let source: Box<dyn IdentifierSource> = match ids {
        Some(path) => Box::new(IdentifierMap::from_csv(path)?),
        None => Box::new(FilenamePattern::new(engine.token_pattern().clone())),
    };
    let reporter = CliReporter::new();
    let stats = engine.organize(
        input,
        output,
        errors,
        source.as_ref(),
        policy,
        cancel,
        &reporter,
    )?;

    println!();
    info!(
        "{} processed: {} renamed, {} unidentified, {} skipped, {} failed",
        stats.processed,
        format!("{}", stats.renamed).green(),
        format!("{}", stats.unidentified).yellow(),
        stats.skipped,
        format!("{}", stats.failed).red(),
    );
    for record in &stats.error_details {
        println!(
            "  {} {} [{}] {}",
            "error".red(),
            record.source_path.display(),
            record.kind.as_str(),
            record.message
        );
    }

    Ok(())
}

fn run_history(config: &AppConfig, limit: i64) -> CliResult<()> {
    let db = Database::open(&config.db_path)?;
    let (audits, retrievals, organizes) = db.run_counts()?;
    info!(
        "{} audits, {} retrievals, {} organize runs recorded",
        audits, retrievals, organizes
    );

    for run in db.recent_audit_runs(limit)? {
        println!(
            "{} {} {} missing={} extra={} status={}",
            "audit".cyan(),
            run.recorded_at,
            run.root_path,
            run.missing_count,
            run.extra_count,
            run.status
        );
    }
    for run in db.recent_retrieval_runs(limit)? {
        println!(
            "{} {} {} -> {} found={} copied={} errors={} [{}]",
            "retrieve".green(),
            run.recorded_at,
            run.source_path,
            run.destination_path,
            run.files_found,
            run.files_copied,
            run.files_error,
            run.search_pattern
        );
    }
    for run in db.recent_organize_runs(limit)? {
        println!(
            "{} {} {} -> {} renamed={} unidentified={} failed={}",
            "organize".yellow(),
            run.recorded_at,
            run.input_path,
            run.output_path,
            run.renamed,
            run.unidentified,
            run.failed
        );
    }

    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
