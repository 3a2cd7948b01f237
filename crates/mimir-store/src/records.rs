//! File and embedding records.
//!
//! The query pipeline only reads these tables; the `index` command writes
//! them during ingestion. Ids are UUID v4 strings, and a file's path is its
//! natural key (re-ingesting a path updates the existing record in place).

use rusqlite::{Row, params};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Result, StoreError};

/// A row in the files table.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Opaque id linking embeddings to this file.
    pub id: String,
    /// Absolute path to the document on disk.
    pub path: String,
    /// MIME-ish type label recorded at ingest time.
    pub file_type: String,
    /// Content hash, used to skip re-embedding unchanged files.
    pub hash: String,
}

fn row_to_file(row: &Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        file_type: row.get(2)?,
        hash: row.get(3)?,
    })
}

impl Database {
    /// Insert a file record, or update the existing record for the same path.
    pub fn upsert_file(&self, path: &str, file_type: &str, hash: &str) -> Result<FileRecord> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            let file = conn.query_row(
                "INSERT INTO files (id, path, file_type, hash)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(path) DO UPDATE SET
                     file_type = excluded.file_type,
                     hash = excluded.hash,
                     updated_at = strftime('%s', 'now')
                 RETURNING id, path, file_type, hash",
                params![id, path, file_type, hash],
                row_to_file,
            )?;
            Ok(file)
        })
    }

    /// Look up a file record by id.
    pub fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, path, file_type, hash FROM files WHERE id = ?1",
                params![file_id],
                row_to_file,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::FileNotFound {
                    file_id: file_id.to_string(),
                },
                other => other.into(),
            })
        })
    }

    /// Look up a file record by path, if present.
    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        self.with_conn(|conn| {
            match conn.query_row(
                "SELECT id, path, file_type, hash FROM files WHERE path = ?1",
                params![path],
                row_to_file,
            ) {
                Ok(file) => Ok(Some(file)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Delete a file record by path, cascading to its embeddings.
    pub fn delete_file(&self, path: &str) -> Result<Option<FileRecord>> {
        self.with_conn(|conn| {
            match conn.query_row(
                "DELETE FROM files WHERE path = ?1
                 RETURNING id, path, file_type, hash",
                params![path],
                row_to_file,
            ) {
                Ok(file) => Ok(Some(file)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Store a file's embedding, replacing any previous vector for that file.
    ///
    /// The vector is serialized as a JSON float array; the index builder
    /// converts it with `vec_f32()` when rebuilding.
    pub fn replace_embedding(&self, file_id: &str, vector: &[f32]) -> Result<()> {
        let encoded = serde_json::to_string(vector)
            .map_err(|e| StoreError::InvalidData(format!("Failed to encode vector: {}", e)))?;
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM embeddings WHERE file_id = ?1",
                params![file_id],
            )?;
            conn.execute(
                "INSERT INTO embeddings (id, file_id, embedding) VALUES (?1, ?2, ?3)",
                params![id, file_id, encoded],
            )?;
            Ok(())
        })
    }

    /// Number of rows in the embeddings source table.
    pub fn embedding_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
                .map_err(Into::into)
        })
    }
}
