//! Configuration file support for Mimir.
//!
//! All mimir data is stored in a `.mimir/` directory:
//! - `.mimir/config.toml` - Configuration file
//! - `.mimir/mimir.db` - Document and embedding database
//! - `.mimir/logs/` - Log files (serve mode)
//!
//! Config discovery searches for `.mimir/config.toml` starting from the
//! current directory and walking up to parent directories.

use std::path::{Path, PathBuf};

/// The mimir data directory name.
pub const MIMIR_DIR: &str = ".mimir";
/// The config file name within the mimir directory.
pub const CONFIG_FILE: &str = "config.toml";

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Storage settings.
    pub store: StoreConfig,
    /// Embedding service settings.
    pub embedding: EmbeddingConfig,
    /// Search settings.
    pub search: SearchConfig,
    /// Ingestion settings.
    pub ingest: IngestConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            // Relative to the .mimir/ directory
            path: PathBuf::from("mimir.db"),
        }
    }
}

/// Embedding service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model identifier.
    pub model: String,
    /// Output dimensionality requested from the model.
    pub dimensions: usize,
    /// API base URL override.
    pub base_url: Option<String>,
    /// API key (or use the OPENAI_API_KEY env var).
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 512,
            base_url: None,
            api_key: None,
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// How many nearest documents a query returns.
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { limit: 1 }
    }
}

/// Ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// File extensions to ingest.
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Find and load configuration from current or parent directories.
    ///
    /// Searches for `.mimir/config.toml` starting from the current directory
    /// and walking up to parent directories.
    pub fn find_and_load() -> Result<Option<(Self, PathBuf)>> {
        let current = std::env::current_dir()?;
        Self::find_and_load_from(&current)
    }

    /// Find and load configuration starting from a specific directory.
    pub fn find_and_load_from(start: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start.to_path_buf();

        loop {
            let mimir_dir = dir.join(MIMIR_DIR);
            let config_path = mimir_dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::from_file(&config_path)?;
                // Return the .mimir directory, not the config file
                return Ok(Some((config, mimir_dir)));
            }

            if !dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Resolve the database path relative to the .mimir directory.
    pub fn resolve_db_path(&self, mimir_dir: Option<&Path>) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else if let Some(dir) = mimir_dir {
            dir.join(&self.store.path)
        } else {
            // Fall back to .mimir in current directory
            PathBuf::from(MIMIR_DIR).join(&self.store.path)
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigValidationError {}

impl Config {
    /// Validate the configuration.
    ///
    /// Returns a list of validation errors if any are found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.embedding.model.is_empty() {
            errors.push(ConfigValidationError {
                field: "embedding.model".to_string(),
                message: "Embedding model cannot be empty.".to_string(),
            });
        }

        if self.embedding.dimensions == 0 {
            errors.push(ConfigValidationError {
                field: "embedding.dimensions".to_string(),
                message: "Embedding dimensions must be greater than zero.".to_string(),
            });
        }

        if self.search.limit == 0 {
            errors.push(ConfigValidationError {
                field: "search.limit".to_string(),
                message: "Search limit must be at least 1.".to_string(),
            });
        }

        if self.embedding.api_key.is_none() && std::env::var("OPENAI_API_KEY").is_err() {
            errors.push(ConfigValidationError {
                field: "embedding.api_key".to_string(),
                message:
                    "OpenAI API key required. Set [embedding] api_key or OPENAI_API_KEY env var."
                        .to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.path, PathBuf::from("mimir.db"));
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.dimensions, 512);
        assert_eq!(config.search.limit, 1);
        assert_eq!(config.ingest.extensions, vec!["txt", "md"]);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[embedding]
dimensions = 256
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.embedding.dimensions, 256);
        // Defaults should still apply
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.search.limit, 1);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[store]
path = "/var/lib/mimir/docs.db"

[embedding]
model = "text-embedding-3-small"
dimensions = 512
base_url = "http://localhost:8080"

[search]
limit = 3

[ingest]
extensions = ["txt"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/var/lib/mimir/docs.db"));
        assert_eq!(
            config.embedding.base_url.as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(config.search.limit, 3);
        assert_eq!(config.ingest.extensions, vec!["txt"]);
    }

    #[test]
    fn test_resolve_db_path() {
        let config = Config::default();
        let mimir_dir = PathBuf::from("/project/.mimir");
        let resolved = config.resolve_db_path(Some(&mimir_dir));
        assert_eq!(resolved, PathBuf::from("/project/.mimir/mimir.db"));
    }

    #[test]
    fn test_resolve_db_path_absolute() {
        let mut config = Config::default();
        config.store.path = PathBuf::from("/data/mimir.db");
        let resolved = config.resolve_db_path(Some(Path::new("/project/.mimir")));
        assert_eq!(resolved, PathBuf::from("/data/mimir.db"));
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = Config::default();
        config.embedding.model = "".to_string();

        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "embedding.model"));
    }

    #[test]
    fn test_validate_zero_limit() {
        let mut config = Config::default();
        config.search.limit = 0;

        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "search.limit"));
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let mimir_dir = dir.path().join(MIMIR_DIR);
        std::fs::create_dir_all(&mimir_dir).unwrap();
        std::fs::write(mimir_dir.join(CONFIG_FILE), "[search]\nlimit = 2\n").unwrap();

        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, found_dir) = Config::find_and_load_from(&nested).unwrap().unwrap();
        assert_eq!(config.search.limit, 2);
        assert_eq!(found_dir, mimir_dir);
    }
}
