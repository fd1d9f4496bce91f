use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "filerecon")]
#[command(about = "Reconcile folders against reference lists and retrieve files by name", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare a folder tree against a tab-separated reference list
    Audit {
        /// Folder to audit
        root: PathBuf,
        /// Reference list file, or `-` for stdin
        #[arg(short, long)]
        reference: PathBuf,
        /// Override the configured token pattern
        #[arg(short, long)]
        pattern: Option<String>,
        /// Write the text report to this file
        #[arg(long)]
        report: Option<PathBuf>,
        /// Print the result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Find files by name prefix and copy them to a destination
    Retrieve {
        /// Folder to search
        root: PathBuf,
        /// One name per line, or `-` for stdin
        #[arg(short, long)]
        names: PathBuf,
        /// Destination folder
        #[arg(short, long)]
        dest: PathBuf,
        /// overwrite, skip, rename or compare
        #[arg(long)]
        policy: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Find files by name prefix without copying
    Search {
        root: PathBuf,
        #[arg(short, long)]
        names: PathBuf,
    },
    /// Move files to names given by their identifiers
    Organize {
        /// Folder holding the files to rename
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Destination for files without an identifier
        #[arg(short, long)]
        errors: PathBuf,
        /// CSV of `file_name,identifier`; file name tokens are used when absent
        #[arg(long)]
        ids: Option<PathBuf>,
        #[arg(long)]
        policy: Option<String>,
    },
    /// Show recently recorded operations
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}
