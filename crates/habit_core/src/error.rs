use std::path::PathBuf;

use thiserror::Error;

/// Failures of the persistence surface itself. Malformed documents are not
/// errors: the store recovers from them by starting empty.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialise habit collection: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HabitError {
    #[error("habit name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write csv record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Flush(#[from] std::io::Error),
    #[error("csv output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid date key `{0}`, expected YYYY-MM-DD")]
    DateKey(String),
    #[error("invalid reminder time `{0}`, expected HH:MM")]
    ReminderTime(String),
    #[error("invalid month `{0}`, expected YYYY-MM")]
    Month(String),
}
