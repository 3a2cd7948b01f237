//! One-shot directory ingestion.
//!
//! Walks a directory tree, embeds each matching text file, and records the
//! file and its vector in the database. This is a full pass, not a watcher:
//! the vector index is rebuilt once afterwards by the caller. Files whose
//! content hash is unchanged keep their stored embedding and skip the
//! network call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use mimir_query::TextEmbedder;
use mimir_store::Database;

/// Statistics from an ingestion pass.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    /// Files matching the extension filter.
    pub files_seen: usize,
    /// Files embedded and stored.
    pub files_embedded: usize,
    /// Files skipped because their content was unchanged.
    pub files_skipped: usize,
    /// Files that failed to read or embed.
    pub files_failed: usize,
}

/// Ingests documents into the store.
pub struct Ingestor {
    db: Arc<Database>,
    embedder: Arc<dyn TextEmbedder>,
    extensions: Vec<String>,
}

impl Ingestor {
    /// Create an ingestor accepting files with the given extensions.
    pub fn new(db: Arc<Database>, embedder: Arc<dyn TextEmbedder>, extensions: Vec<String>) -> Self {
        Self {
            db,
            embedder,
            extensions,
        }
    }

    /// Ingest every matching file under `root`.
    ///
    /// Per-file failures are logged and counted, not fatal: one bad
    /// document should not abort the pass.
    pub async fn ingest_directory(&self, root: &Path) -> Result<IngestStats> {
        let mut files = Vec::new();
        self.collect_files(root, &mut files)
            .with_context(|| format!("Failed to walk {}", root.display()))?;

        let mut stats = IngestStats {
            files_seen: files.len(),
            ..Default::default()
        };

        for path in files {
            match self.ingest_file(&path).await {
                Ok(true) => stats.files_embedded += 1,
                Ok(false) => {
                    debug!("Unchanged, skipping: {}", path.display());
                    stats.files_skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to ingest {}: {}", path.display(), e);
                    stats.files_failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Recursive helper collecting matching file paths.
    fn collect_files(&self, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                // Skip hidden directories and common non-document directories
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name.starts_with('.') || name == "target" || name == "node_modules" {
                    continue;
                }
                self.collect_files(&path, out)?;
            } else if self.is_supported_file(&path) {
                out.push(path);
            }
        }

        Ok(())
    }

    /// Check if a file has one of the configured extensions.
    fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Ingest a single file. Returns true if a new embedding was stored,
    /// false if the file was unchanged.
    async fn ingest_file(&self, path: &Path) -> Result<bool> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Non-UTF-8 path: {}", path.display()))?;

        let content = std::fs::read_to_string(path)?;
        let hash = content_hash(&content);

        if let Some(existing) = self.db.get_file_by_path(path_str)? {
            if existing.hash == hash {
                return Ok(false);
            }
        }

        let record = self.db.upsert_file(path_str, file_type(path), &hash)?;
        let embedding = self
            .embedder
            .embed(&content)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        self.db.replace_embedding(&record.id, &embedding)?;

        debug!("Embedded {}", path.display());
        Ok(true)
    }
}

/// Hex-encoded SHA-256 of the file content.
fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Type label recorded on the file record.
fn file_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md") => "text/markdown",
        _ => "text/plain",
    }
}
