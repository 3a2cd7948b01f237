//! Document resolution: file id to file content.

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::Database;
use crate::error::{Result, StoreError};

/// Resolves search hits to document text.
///
/// Looks up the file record for an id and reads the recorded path from
/// disk. Both the missing-record and unreadable-path cases are recoverable
/// errors the caller is expected to report, not fatal faults.
pub struct DocumentResolver {
    db: Arc<Database>,
}

impl DocumentResolver {
    /// Create a resolver over the given database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Resolve a file id to its document text, trimmed of surrounding
    /// whitespace.
    pub fn resolve(&self, file_id: &str) -> Result<String> {
        let record = self.db.get_file(file_id)?;
        let path = PathBuf::from(&record.path);
        let content = std::fs::read_to_string(&path)
            .map_err(|source| StoreError::FileUnreadable { path, source })?;
        Ok(content.trim().to_string())
    }
}

impl std::fmt::Debug for DocumentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentResolver").finish()
    }
}
