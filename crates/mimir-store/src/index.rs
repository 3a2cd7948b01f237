//! Vector index build and nearest-neighbor search.
//!
//! The index is a sqlite-vec `vec0` virtual table derived entirely from the
//! `embeddings` source table. There is no incremental maintenance: every
//! build drops and repopulates the whole table inside one transaction, so a
//! concurrent reader sees either the old index or the new one, never a
//! partial copy.

use std::sync::Arc;

use rusqlite::params;
use tracing::info;

use crate::db::Database;
use crate::error::{Result, StoreError};

/// Default embedding dimensionality (text-embedding-3-small, truncated).
pub const DEFAULT_DIMENSIONS: usize = 512;

/// Serialize a vector into the raw byte format vec0 expects as a query
/// argument: `4 * N` bytes, each element's IEEE-754 single-precision
/// encoding in order, no header.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(vector).to_vec()
}

/// A single nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Id of the matched file record.
    pub file_id: String,
    /// Cosine distance to the query vector (smaller = more similar).
    pub distance: f64,
}

/// Nearest-neighbor index over the stored embeddings.
pub struct VectorIndex {
    db: Arc<Database>,
    dimensions: usize,
}

impl VectorIndex {
    /// Create an index handle with the default dimensionality.
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_dimensions(db, DEFAULT_DIMENSIONS)
    }

    /// Create an index handle with an explicit dimensionality.
    pub fn with_dimensions(db: Arc<Database>, dimensions: usize) -> Self {
        Self { db, dimensions }
    }

    /// The dimensionality this index was declared with.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Drop and repopulate the index from the embeddings source table.
    ///
    /// Safe to call repeatedly; returns the number of rows copied.
    pub fn rebuild(&self) -> Result<usize> {
        let create = format!(
            "CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[{}] distance_metric=cosine, file_id text)",
            self.dimensions
        );

        let rows = self.db.with_conn(|conn| {
            conn.execute_batch("BEGIN")?;
            let result = (|| -> Result<usize> {
                conn.execute("DROP TABLE IF EXISTS vec_items", [])?;
                conn.execute(&create, [])?;
                let rows = conn.execute(
                    "INSERT INTO vec_items (embedding, file_id)
                     SELECT vec_f32(embedding), file_id FROM embeddings",
                    [],
                )?;
                Ok(rows)
            })();
            match result {
                Ok(rows) => {
                    conn.execute_batch("COMMIT")?;
                    Ok(rows)
                }
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    Err(e)
                }
            }
        })?;

        info!("Vector index rebuilt with {} items", rows);
        Ok(rows)
    }

    /// Return the `k` nearest items to the encoded query vector, ascending
    /// by cosine distance.
    ///
    /// An index that was never built (or was built from zero rows) yields
    /// an empty result, not an error.
    pub fn search(&self, query: &[u8], k: usize) -> Result<Vec<SearchResult>> {
        let expected = self.dimensions * 4;
        if query.len() != expected {
            return Err(StoreError::InvalidData(format!(
                "Query vector is {} bytes, expected {}",
                query.len(),
                expected
            )));
        }

        self.db.with_conn(|conn| {
            let built: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'vec_items'",
                [],
                |row| row.get(0),
            )?;
            if built == 0 {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(
                "SELECT file_id, distance
                 FROM vec_items
                 WHERE embedding MATCH ?1
                 ORDER BY distance
                 LIMIT ?2",
            )?;

            let rows = stmt.query_map(params![query, k as i64], |row| {
                Ok(SearchResult {
                    file_id: row.get(0)?,
                    distance: row.get(1)?,
                })
            })?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_index(dim: usize, vectors: &[&[f32]]) -> (Arc<Database>, VectorIndex) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        for (i, vector) in vectors.iter().enumerate() {
            let file = db
                .upsert_file(&format!("/docs/{}.txt", i), "text/plain", "h")
                .unwrap();
            db.replace_embedding(&file.id, vector).unwrap();
        }
        let index = VectorIndex::with_dimensions(Arc::clone(&db), dim);
        (db, index)
    }

    #[test]
    fn test_encode_vector_layout() {
        let vector = vec![1.0_f32; 512];
        let bytes = encode_vector(&vector);
        assert_eq!(bytes.len(), 2048);
        assert_eq!(&bytes[0..4], &1.0_f32.to_ne_bytes());

        let bytes = encode_vector(&[0.5, -2.0]);
        assert_eq!(&bytes[0..4], &0.5_f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &(-2.0_f32).to_ne_bytes());
    }

    #[test]
    fn test_search_without_build_is_empty() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let index = VectorIndex::with_dimensions(db, 4);
        let query = encode_vector(&[1.0, 0.0, 0.0, 0.0]);
        assert!(index.search(&query, 1).unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_from_empty_table() {
        let (_db, index) = seeded_index(4, &[]);
        assert_eq!(index.rebuild().unwrap(), 0);

        let query = encode_vector(&[1.0, 0.0, 0.0, 0.0]);
        assert!(index.search(&query, 1).unwrap().is_empty());
    }

    #[test]
    fn test_search_returns_nearest_first() {
        let (_db, index) = seeded_index(4, &[&[1.0, 0.0, 0.0, 0.0], &[0.0, 1.0, 0.0, 0.0]]);
        assert_eq!(index.rebuild().unwrap(), 2);

        let query = encode_vector(&[1.0, 0.1, 0.0, 0.0]);
        let results = index.search(&query, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].distance <= results[1].distance);

        let top = index.search(&query, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].file_id, results[0].file_id);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (_db, index) = seeded_index(4, &[&[1.0, 0.0, 0.0, 0.0], &[0.0, 1.0, 0.0, 0.0]]);
        index.rebuild().unwrap();
        let query = encode_vector(&[0.2, 0.9, 0.0, 0.0]);
        let first = index.search(&query, 2).unwrap();

        index.rebuild().unwrap();
        let second = index.search(&query, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_rejects_wrong_width_query() {
        let (_db, index) = seeded_index(4, &[&[1.0, 0.0, 0.0, 0.0]]);
        index.rebuild().unwrap();

        let query = encode_vector(&[1.0, 0.0]);
        let err = index.search(&query, 1).unwrap_err();
        assert!(err.to_string().contains("bytes"));
    }
}
