//! mimir-store: SQLite-backed document and vector storage
//!
//! This crate provides the storage layer for Mimir:
//! - Database wrapper with the sqlite-vec extension loaded
//! - Schema migrations for the files and embeddings source tables
//! - Vector index build and nearest-neighbor search (vec0, cosine)
//! - Document resolution from file ids to on-disk text

pub mod db;
pub mod error;
pub mod index;
pub mod migrations;
pub mod records;
pub mod resolver;

pub use db::Database;
pub use error::{Result, StoreError};
pub use index::{DEFAULT_DIMENSIONS, SearchResult, VectorIndex, encode_vector};
pub use records::FileRecord;
pub use resolver::DocumentResolver;
