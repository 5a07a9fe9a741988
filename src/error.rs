use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;

/// Custom error type for smokedb operations
#[derive(Debug)]
pub enum Error {
    /// I/O error from underlying file operations
    Io(io::Error),
    /// Error reported by the SQLite engine
    Sqlite(rusqlite::Error),
    /// Engine integrity check did not come back clean
    Corrupted(String),
    /// Fixture database is missing
    MissingFixture(PathBuf),
    /// Fixture database exists but holds no data
    EmptyFixture(PathBuf),
    /// Database opened but the record table is absent
    MissingTable { path: PathBuf, table: String },
    /// Configuration could not be loaded or is invalid
    Config(String),
    /// A key held a different value than expected (`None` when absent)
    ValueMismatch {
        key: String,
        expected: i64,
        actual: Option<i64>,
    },
    /// A key is still readable after it was deleted
    StillPresent { key: String, value: i64 },
    /// The engine reported that a delete removed nothing
    NothingDeleted(String),
    /// Refusing to overwrite an existing file
    AlreadyExists(PathBuf),
    /// Failure while writing a report
    Report(String),
}

/// The three failure classes a case can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The engine returned an error (open, I/O, corruption)
    Engine,
    /// The engine worked but returned the wrong answer
    Assertion,
    /// The run environment is not usable (missing fixture, bad config)
    Environment,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Engine => write!(f, "engine"),
            FailureKind::Assertion => write!(f, "assertion"),
            FailureKind::Environment => write!(f, "environment"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Io(_) | Error::Sqlite(_) | Error::Corrupted(_) => FailureKind::Engine,
            Error::ValueMismatch { .. } | Error::StillPresent { .. } | Error::NothingDeleted(_) => {
                FailureKind::Assertion
            }
            Error::MissingFixture(_)
            | Error::EmptyFixture(_)
            | Error::MissingTable { .. }
            | Error::Config(_)
            | Error::AlreadyExists(_)
            | Error::Report(_) => FailureKind::Environment,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Sqlite(err) => write!(f, "SQLite error: {err}"),
            Error::Corrupted(msg) => write!(f, "Database corrupted: {msg}"),
            Error::MissingFixture(path) => {
                write!(f, "Fixture database not found: {}", path.display())
            }
            Error::EmptyFixture(path) => {
                write!(f, "Fixture database is empty: {}", path.display())
            }
            Error::MissingTable { path, table } => write!(
                f,
                "Record table '{table}' not found in {}",
                path.display()
            ),
            Error::Config(msg) => write!(f, "Config error: {msg}"),
            Error::ValueMismatch {
                key,
                expected,
                actual: Some(actual),
            } => write!(
                f,
                "Value mismatch for key '{key}': expected {expected}, found {actual}"
            ),
            Error::ValueMismatch {
                key,
                expected,
                actual: None,
            } => write!(f, "Key '{key}' not found (expected value {expected})"),
            Error::StillPresent { key, value } => {
                write!(f, "Key '{key}' still present after delete (value {value})")
            }
            Error::NothingDeleted(key) => write!(f, "Delete of key '{key}' removed no record"),
            Error::AlreadyExists(path) => write!(f, "File already exists: {}", path.display()),
            Error::Report(msg) => write!(f, "Report error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Report(format!("JSON error: {err}"))
    }
}

/// Result type for smokedb operations
pub type Result<T> = std::result::Result<T, Error>;
