use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid token pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Root directory does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Reference list contains no usable tokens")]
    EmptyReference,

    #[error("No tokens requested")]
    NoTokens,

    #[error("Could not find a free name for {} after {attempts} attempts", path.display())]
    RenameExhausted { path: PathBuf, attempts: u32 },

    #[error("{0}")]
    Other(String),
}

/// Classification of a per-file failure. Kept alongside the message in
/// error records so callers can group failures without parsing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    StorageFull,
    AlreadyExists,
    RenameExhausted,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StorageFull => "storage_full",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::RenameExhausted => "rename_exhausted",
            ErrorKind::Other => "other",
        }
    }
}

impl From<&io::Error> for ErrorKind {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::StorageFull => ErrorKind::StorageFull,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            _ => ErrorKind::Other,
        }
    }
}

impl From<&Error> for ErrorKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::Io(e) => ErrorKind::from(e),
            Error::RenameExhausted { .. } => ErrorKind::RenameExhausted,
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(ErrorKind::from(&denied), ErrorKind::PermissionDenied);

        let missing = Error::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(ErrorKind::from(&missing), ErrorKind::NotFound);

        let exhausted = Error::RenameExhausted {
            path: PathBuf::from("a.pdf"),
            attempts: 1000,
        };
        assert_eq!(ErrorKind::from(&exhausted), ErrorKind::RenameExhausted);
        assert_eq!(ErrorKind::from(&exhausted).as_str(), "rename_exhausted");
    }
}
