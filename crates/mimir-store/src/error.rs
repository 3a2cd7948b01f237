//! Error types for the storage layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A file id has no matching row in the files table.
    #[error("No file record for id '{file_id}'")]
    FileNotFound {
        /// The id that failed to resolve.
        file_id: String,
    },

    /// The files table has a path for this id, but reading it failed.
    #[error("Failed to read file {}: {source}", .path.display())]
    FileUnreadable {
        /// The recorded path that could not be read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed stored data.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Whether this error indicates a missing file record (as opposed to a
    /// database or I/O fault).
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::FileNotFound { .. })
    }
}
