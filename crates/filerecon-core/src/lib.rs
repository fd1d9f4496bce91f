pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod organize;
pub mod pool;
pub mod progress;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod retrieval;
pub mod scanner;
pub mod storage;
pub mod token;

pub use cancel::CancelToken;
pub use config::AppConfig;
pub use engine::ReconcileEngine;
pub use error::{Error, ErrorKind};
pub use progress::{Phase, ProgressReporter, SilentReporter};
pub use reconcile::{AuditResult, AuditStatus};
pub use reference::{ReferenceParser, ReferenceRecord, ReferenceSet};
pub use resolver::DuplicatePolicy;
pub use retrieval::{CopyOutcome, MatchSet, SearchStats};
pub use scanner::{DirectoryEntry, FoundIndex};
pub use token::Token;
