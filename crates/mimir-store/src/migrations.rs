//! Database schema migrations.
//!
//! Applies the initial schema: the `files` table mapping file ids to paths
//! and the `embeddings` table holding precomputed vectors as JSON text.
//! The derived `vec_items` index is not created here; it is rebuilt from
//! `embeddings` by the index builder.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Run all pending database migrations.
///
/// Uses a `schema_migrations` table to track the applied version. Future
/// migrations append incremental steps below.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )?;

    let current_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: files and embeddings source tables.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS files (
            id          TEXT PRIMARY KEY NOT NULL,
            path        TEXT NOT NULL UNIQUE,
            file_type   TEXT NOT NULL,
            hash        TEXT NOT NULL,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Vectors are stored as JSON float arrays; vec_f32() converts them
        -- to the index's binary format during rebuild.
        CREATE TABLE IF NOT EXISTS embeddings (
            id          TEXT PRIMARY KEY NOT NULL,
            file_id     TEXT NOT NULL REFERENCES files (id) ON DELETE CASCADE,
            embedding   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_file_id
            ON embeddings (file_id);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )?;
    Ok(())
}
