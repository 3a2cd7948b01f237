//! mimir: semantic document lookup served over MCP
//!
//! Mimir embeds a natural-language query, searches a sqlite-vec index for
//! the nearest stored document, and returns that document's text through a
//! single MCP tool.

mod config;
mod ingest;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::Config;
use ingest::Ingestor;
use mimir_query::{
    McpServerConfig, OpenAiConfig, OpenAiEmbedder, QueryService, ToolRegistry, create_query_tools,
    run_mcp_server,
};
use mimir_store::{Database, DocumentResolver, VectorIndex};

/// Semantic document lookup served as an MCP tool
#[derive(Parser)]
#[command(name = "mimir")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to .mimir directory (default: search for .mimir/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index and serve the lookup tool over MCP stdio
    Serve,

    /// Ingest documents from a directory into the store
    Index {
        /// Directory to ingest (default: current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Initialize a new .mimir directory with a config file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Initialize logging for interactive commands. Logs to stderr.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Initialize logging for serve mode.
///
/// Stdout carries the MCP protocol, so logs go to rotating files in
/// `.mimir/logs/` with daily rotation.
fn init_file_logging(mimir_dir: &std::path::Path, verbose: bool) {
    let logs_dir = mimir_dir.join("logs");

    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
        init_logging(verbose);
        return;
    }

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "mimir.log");

    // Use non-blocking writer to avoid blocking on log writes
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Store guard in a static to prevent it from being dropped
    // (dropping the guard would stop logging)
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(_guard);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .init();
}

/// Load config from file or auto-discover from `.mimir/config.toml`.
///
/// Returns the config and the path to the `.mimir` directory (for resolving
/// relative paths).
fn load_config(override_path: Option<&PathBuf>) -> (Config, Option<PathBuf>) {
    if let Some(path) = override_path {
        // Explicit path override - treat as path to .mimir directory
        let config_file = if path.is_dir() {
            path.join(config::CONFIG_FILE)
        } else {
            path.clone()
        };
        let mimir_dir = config_file.parent().unwrap_or(path).to_path_buf();

        match Config::from_file(&config_file) {
            Ok(config) => (config, Some(mimir_dir)),
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", config_file.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        match Config::find_and_load() {
            Ok(Some((config, mimir_dir))) => (config, Some(mimir_dir)),
            Ok(None) => (Config::default(), None),
            Err(e) => {
                eprintln!("Error searching for config: {}, using defaults", e);
                (Config::default(), None)
            }
        }
    }
}

/// Create the embedding client from configuration.
///
/// The API key comes from the config file or the OPENAI_API_KEY env var.
fn create_embedder(config: &Config) -> Result<OpenAiEmbedder> {
    let api_key = config
        .embedding
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "OpenAI API key required. Set [embedding] api_key or OPENAI_API_KEY env var."
            )
        })?;

    let mut oai_config = OpenAiConfig::new(api_key)
        .with_model(&config.embedding.model)
        .with_dimensions(config.embedding.dimensions);
    if let Some(ref url) = config.embedding.base_url {
        oai_config = oai_config.with_base_url(url);
    }

    Ok(OpenAiEmbedder::new(oai_config)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_dir) = load_config(cli.config.as_ref());

    match cli.command {
        Commands::Serve => {
            let mimir_dir = config_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(config::MIMIR_DIR));
            init_file_logging(&mimir_dir, cli.verbose);

            let errors = config.validate();
            if !errors.is_empty() {
                for error in &errors {
                    eprintln!("Config error: {}", error);
                }
                anyhow::bail!("Invalid configuration");
            }

            let db_path = config.resolve_db_path(config_dir.as_deref());
            info!("Opening store at {}", db_path.display());
            let db = Arc::new(Database::open(&db_path)?);

            // The index must be current before the first query is served.
            let index = VectorIndex::with_dimensions(Arc::clone(&db), config.embedding.dimensions);
            let items = index.rebuild()?;
            info!("Vector index ready with {} items", items);

            let embedder = Arc::new(create_embedder(&config)?);
            let service = Arc::new(
                QueryService::new(embedder, index, DocumentResolver::new(db))
                    .with_limit(config.search.limit),
            );

            let mut registry = ToolRegistry::new();
            for tool in create_query_tools(service) {
                registry.register_arc(tool);
            }

            run_mcp_server(Arc::new(registry), McpServerConfig::new("mimir")).await?;
        }

        Commands::Index { path } => {
            init_logging(cli.verbose);

            let source_path = path.unwrap_or_else(|| PathBuf::from("."));
            // Canonicalize to resolve relative paths like "." or ".."
            let source_path = source_path.canonicalize().unwrap_or(source_path);

            let db_path = config.resolve_db_path(config_dir.as_deref());
            info!(
                "Ingesting {} -> {}",
                source_path.display(),
                db_path.display()
            );

            let db = Arc::new(Database::open(&db_path)?);
            let embedder = Arc::new(create_embedder(&config)?);

            let ingestor = Ingestor::new(
                Arc::clone(&db),
                embedder,
                config.ingest.extensions.clone(),
            );
            let stats = ingestor.ingest_directory(&source_path).await?;

            let index = VectorIndex::with_dimensions(Arc::clone(&db), config.embedding.dimensions);
            let items = index.rebuild()?;

            info!(
                "Ingested {} files ({} embedded, {} unchanged, {} failed), index has {} items",
                stats.files_seen, stats.files_embedded, stats.files_skipped, stats.files_failed,
                items
            );
        }

        Commands::Init { force } => {
            init_logging(cli.verbose);

            let mimir_dir = PathBuf::from(config::MIMIR_DIR);
            let config_path = mimir_dir.join(config::CONFIG_FILE);

            if config_path.exists() && !force {
                anyhow::bail!(".mimir/config.toml already exists. Use --force to overwrite.");
            }

            if !mimir_dir.exists() {
                std::fs::create_dir_all(&mimir_dir)?;
                info!("Created {}/", mimir_dir.display());
            }

            let default_config = r#"# Mimir configuration
# All paths are relative to this .mimir/ directory unless absolute

[store]
path = "mimir.db"

[embedding]
model = "text-embedding-3-small"
dimensions = 512
# api_key = "sk-..."  # Or use OPENAI_API_KEY env var

[search]
limit = 1  # How many nearest documents a query returns

[ingest]
extensions = ["txt", "md"]
"#;

            std::fs::write(&config_path, default_config)?;
            info!("Created {}", config_path.display());
            info!("Next steps:");
            info!("  1. Edit .mimir/config.toml to configure the store");
            info!("  2. Run 'mimir index --path <docs>' to embed your documents");
            info!("  3. Run 'mimir serve' to expose the lookup tool over MCP");
        }
    }

    Ok(())
}
