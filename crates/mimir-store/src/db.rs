//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for serialized access and
//! registers the sqlite-vec extension once per process, so the vec0 virtual
//! table module is available on every connection this process opens.

use std::path::Path;
use std::sync::{Mutex, Once};

use rusqlite::Connection;
use rusqlite::ffi::sqlite3_auto_extension;
use sqlite_vec::sqlite3_vec_init;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::migrations;

static VEC_INIT: Once = Once::new();

/// Register sqlite-vec as an auto extension for all future connections.
///
/// `sqlite3_auto_extension` applies process-wide, so this must run exactly
/// once, before the first connection is opened.
fn register_vec_extension() {
    VEC_INIT.call_once(|| unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    });
}

/// Thread-safe SQLite database wrapper.
///
/// The connection is wrapped in a Mutex since rusqlite's Connection is not
/// Sync; all access is serialized through [`Database::with_conn`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Creates parent directories if needed, configures WAL mode and
    /// pragmas, and runs pending schema migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        register_vec_extension();

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::InvalidData(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        register_vec_extension();

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// This is the only way to reach the connection; the mutex is held for
    /// the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::InvalidData(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
