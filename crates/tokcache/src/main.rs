//! tokcache - inspect and operate a two-tier payload cache from the shell

mod cli;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokcache_core::{CacheConfig, CacheEngine, SemanticConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "tokcache",
    version,
    about = "Two-tier payload cache with semantic lookup",
    long_about = "Operate a tokcache store file from the command line.\n\
                  \n\
                  Entries live in a SQLite file (WAL mode) shared by every process that\n\
                  opens it. Semantic lookups embed keys in-process, so commands that use\n\
                  them index the stored keys first.\n\
                  \n\
                  Examples:\n\
                    tokcache stats                       # Entry counts, hits, sizes\n\
                    tokcache set greeting hello          # Store a payload\n\
                    tokcache get greeting                # Print it (exit 1 on miss)\n\
                    tokcache get \"say hi\" --semantic     # Fall back to similar keys\n\
                    tokcache entries --limit 20          # Most used entries\n\
                    tokcache evict --max-bytes 1048576   # Keep the newest 1MB\n\
                  \n\
                  Environment Variables:\n\
                    TOKCACHE_DB                          # Store file path\n\
                    TOKCACHE_CONFIG                      # TOML config file\n\
                    RUST_LOG                             # Log filter (logs go to stderr)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Store file (default: <cache dir>/tokcache/cache.db)
    #[arg(long, env = "TOKCACHE_DB", global = true)]
    db: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "TOKCACHE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the store file in use
    Path,
    /// Print cache statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the payload stored under a key
    Get {
        key: String,
        /// Fall back to the most similar stored key
        #[arg(long)]
        semantic: bool,
    },
    /// Store a payload
    Set {
        key: String,
        value: String,
        /// Uncompressed size in bytes (default: value length)
        #[arg(long)]
        original_size: Option<u64>,
        /// Compressed size in bytes (default: value length)
        #[arg(long)]
        compressed_size: Option<u64>,
    },
    /// Remove an entry
    Delete { key: String },
    /// Remove every entry
    Clear,
    /// Keep the most recently used entries within a byte budget
    Evict {
        /// Budget for the sum of compressed sizes
        #[arg(long)]
        max_bytes: u64,
    },
    /// List entries, most hit first
    Entries {
        /// Max rows
        #[arg(long, short = 'n', default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank stored keys by similarity to a query
    Search {
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compact the store file
    Vacuum,
}

impl Command {
    fn needs_semantic(&self) -> bool {
        matches!(
            self,
            Command::Get { semantic: true, .. } | Command::Search { .. }
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CacheConfig::default(),
    };
    if let Some(db) = cli.db {
        config.store_path = Some(db);
    }
    if cli.command.needs_semantic() && config.semantic_enabled().is_none() {
        config.semantic = Some(SemanticConfig::default());
    }

    let engine = CacheEngine::new(config).context("Failed to open cache store")?;
    if cli.command.needs_semantic() {
        engine
            .rebuild_semantic_index()
            .context("Failed to index stored keys")?;
    }

    let result = run(&engine, cli.command);
    engine.close().context("Failed to close cache store")?;
    result
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

// ============================================================================
// Command Handlers
// ============================================================================

fn run(engine: &CacheEngine, command: Command) -> Result<()> {
    match command {
        Command::Path => {
            println!("{}", engine.database_path().display());
        }
        Command::Stats { json } => run_stats(engine, json)?,
        Command::Get { key, semantic } => run_get(engine, &key, semantic)?,
        Command::Set {
            key,
            value,
            original_size,
            compressed_size,
        } => {
            let len = value.len() as u64;
            let original = original_size.unwrap_or(len);
            let compressed = compressed_size.unwrap_or(len);
            engine
                .set(&key, &value, original, compressed)
                .with_context(|| format!("Failed to store '{}'", key))?;
        }
        Command::Delete { key } => {
            let existed = engine
                .delete(&key)
                .with_context(|| format!("Failed to delete '{}'", key))?;
            if !existed {
                eprintln!("No entry for '{}'", key);
            }
        }
        Command::Clear => {
            let before = engine.stats().context("Failed to read stats")?;
            engine.clear_with_semantic().context("Failed to clear cache")?;
            println!("Cleared {} entries", before.total_entries);
        }
        Command::Evict { max_bytes } => {
            let removed = engine
                .evict_lru(max_bytes)
                .context("Failed to evict entries")?;
            println!(
                "Evicted {} entries (budget {})",
                removed,
                cli::format_size(max_bytes)
            );
        }
        Command::Entries { limit, json } => {
            let mut entries = engine.all_entries().context("Failed to list entries")?;
            entries.truncate(limit);
            println!("{}", cli::format_entries(&entries, json));
        }
        Command::Search { query, json } => {
            let hits = engine
                .semantic_candidates(&query)
                .context("Semantic search failed")?;
            println!("{}", cli::format_search_hits(&hits, json));
        }
        Command::Vacuum => {
            engine.vacuum().context("Failed to vacuum store")?;
        }
    }

    Ok(())
}

fn run_stats(engine: &CacheEngine, json: bool) -> Result<()> {
    let stats = engine.stats().context("Failed to read stats")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", cli::format_stats(&stats, engine.database_path()));
    }
    Ok(())
}

fn run_get(engine: &CacheEngine, key: &str, semantic: bool) -> Result<()> {
    let value = if semantic {
        engine.get_with_semantic(key)
    } else {
        engine.get(key)
    }
    .with_context(|| format!("Failed to read '{}'", key))?;

    match value {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => bail!("No entry for '{}'", key),
    }
}
