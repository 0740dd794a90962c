//! Error types for figsheet-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::Column;

/// Result type alias for figsheet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for figsheet operations.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more columns required by the requested feature are absent.
    #[error("missing required columns: {}", join_columns(.0))]
    MissingColumns(Vec<Column>),

    /// A record with the same filename and directory already exists.
    #[error("duplicate record: {filename} in {}", directory.display())]
    DuplicateRecord {
        filename: String,
        directory: PathBuf,
    },

    /// The named group does not exist in the table.
    #[error("unknown group: {0}")]
    UnknownGroup(String),

    /// Row index outside the table.
    #[error("row index {index} out of range ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    /// Grouping rule could not be constructed.
    #[error("invalid grouping rule: {0}")]
    InvalidRule(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}
