//! pdf-bridge CLI: drive a document engine process through one load.
//!
//! Usage:
//!   pdf-bridge load <FILE> --engine <PROGRAM> [--engine-arg ARG]... [--config path] [--db path]
//!   pdf-bridge cache <show|clear> [--db path]
//!   pdf-bridge config [--config path]

use clap::{Parser, Subcommand};
use pdf_bridge::cache::{CacheKey, DocumentCache, OpenCache, SqliteDocumentCache};
use pdf_bridge::runtime::{pump_lines, BridgeDriver, EngineProcess};
use pdf_bridge::transfer::{DocumentFile, FileUrlRegistry};
use pdf_bridge::{BridgeConfig, BridgeResult, LoadEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdf-bridge",
    version,
    about = "Load documents into an embedded document engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document into an engine process speaking JSON lines
    Load {
        /// Document to load
        file: PathBuf,
        /// Engine program to start
        #[arg(long)]
        engine: String,
        /// Extra argument for the engine (repeatable)
        #[arg(long = "engine-arg")]
        engine_args: Vec<String>,
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the inline transfer threshold in bytes
        #[arg(long)]
        threshold: Option<u64>,
        /// Path to the document cache database
        #[arg(long)]
        db: Option<PathBuf>,
        /// Do not write the document back to the cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Inspect the document cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
        /// Path to the document cache database
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cached documents
    Show,
    /// Remove cached documents
    Clear,
}

/// Get the default cache path (~/.local/share/pdf-bridge/documents.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("pdf-bridge").join("documents.db")
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> BridgeResult<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::load(path),
        None => Ok(BridgeConfig::default()),
    }
}

struct LoadArgs {
    file: PathBuf,
    engine: String,
    engine_args: Vec<String>,
    config: Option<PathBuf>,
    threshold: Option<u64>,
    db: Option<PathBuf>,
    no_cache: bool,
}

fn cmd_load(args: LoadArgs) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };
    rt.block_on(async {
        match run_load(args).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        }
    })
}

async fn run_load(args: LoadArgs) -> BridgeResult<i32> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.transfer_threshold = threshold;
    }

    let cache: Option<Arc<dyn DocumentCache>> = if args.no_cache {
        None
    } else {
        let path = args.db.unwrap_or_else(default_db_path);
        debug!(path = %path.display(), "opening document cache");
        Some(Arc::new(SqliteDocumentCache::open(&path)?))
    };
    let caching = cache.is_some();

    let file = DocumentFile::open(&args.file).await?;
    let (mut process, channel, output) = EngineProcess::spawn(&args.engine, &args.engine_args)?;
    let handle = BridgeDriver::spawn_with_registry(
        config,
        Arc::new(channel),
        cache,
        Arc::new(FileUrlRegistry::new()),
    );
    let mut events = handle.subscribe();
    let mut pump = pump_lines(output, handle.clone());
    let mut engine_running = true;

    // A running process is as loaded as its frame gets.
    handle.frame_loaded()?;
    handle.open(file)?;

    let mut loaded = false;
    let code = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(LoadEvent::Progress { value, .. }) => eprintln!("{:>3}%", value),
                Ok(LoadEvent::Loaded { page_count, .. }) => {
                    match page_count {
                        Some(pages) => println!("loaded {} ({} pages)", args.file.display(), pages),
                        None => println!("loaded {}", args.file.display()),
                    }
                    loaded = true;
                    if !caching {
                        break 0;
                    }
                }
                Ok(LoadEvent::InputCached { .. }) => {
                    info!("document cached");
                    if loaded {
                        break 0;
                    }
                }
                Ok(LoadEvent::InputCacheSkipped { outcome, .. }) => {
                    debug!(?outcome, "document not cached");
                    if loaded {
                        break 0;
                    }
                }
                Ok(LoadEvent::InputCacheFailed { message, .. }) => {
                    eprintln!("warning: document not cached: {}", message);
                    if loaded {
                        break 0;
                    }
                }
                Ok(LoadEvent::Failed { message, .. }) => {
                    eprintln!("Error: {}", message);
                    break 1;
                }
                Ok(LoadEvent::Cancelled { .. }) => {
                    eprintln!("cancelled");
                    break 130;
                }
                Ok(LoadEvent::ErrorNotice { message }) | Ok(LoadEvent::Warning { message }) => {
                    eprintln!("warning: {}", message);
                }
                Ok(event) => debug!(?event, "event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break 1,
            },
            _ = &mut pump, if engine_running => {
                engine_running = false;
                if loaded {
                    break 0;
                }
                handle.report_host_error("The PDF editor process exited unexpectedly.")?;
            }
            _ = tokio::signal::ctrl_c() => {
                if loaded {
                    break 0;
                }
                if !handle.current().busy {
                    break 130;
                }
                handle.cancel()?;
            }
        }
    };

    handle.shutdown().await?;
    process.kill().await.ok();
    Ok(code)
}

fn cmd_cache(action: CacheAction, db: Option<PathBuf>) -> i32 {
    let path = db.unwrap_or_else(default_db_path);
    let cache = match SqliteDocumentCache::open(&path) {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("Failed to open cache: {}", e);
            return 1;
        }
    };
    for key in [CacheKey::Input, CacheKey::Output] {
        let result = match action {
            CacheAction::Show => cache.load(key).map(|doc| match doc {
                Some(doc) => println!(
                    "{:<7} {} ({} bytes, {}, {})",
                    key.as_str(),
                    doc.name,
                    doc.bytes.len(),
                    doc.mime,
                    doc.updated_at.to_rfc3339()
                ),
                None => println!("{:<7} (empty)", key.as_str()),
            }),
            CacheAction::Clear => cache.remove(key).map(|removed| {
                if removed {
                    println!("Removed {}", key);
                }
            }),
        };
        if let Err(e) = result {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    0
}

fn cmd_config(path: Option<PathBuf>) -> i32 {
    match load_config(path.as_deref()).and_then(|config| config.to_yaml()) {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Load {
            file,
            engine,
            engine_args,
            config,
            threshold,
            db,
            no_cache,
        } => cmd_load(LoadArgs {
            file,
            engine,
            engine_args,
            config,
            threshold,
            db,
            no_cache,
        }),
        Commands::Cache { action, db } => cmd_cache(action, db),
        Commands::Config { config } => cmd_config(config),
    };
    std::process::exit(code);
}
