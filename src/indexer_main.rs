//! Projection indexer binary
//!
//! Registers the manifest's static sources, then replays a JSON-lines event
//! stream into a RocksDB entity store, reading contract state over JSON-RPC.

use anyhow::{Context, Result};
use clap::Parser;
use projector::config::load_manifest;
use projector::indexer::Indexer;
use projector::rpc::{RpcClient, RpcReader};
use projector::store::RocksEntityStore;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Event projection indexer
#[derive(Parser)]
#[command(name = "projector")]
#[command(about = "Project contract events into a queryable entity store")]
struct Args {
    /// RPC endpoint URL used for contract reads
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Path to source manifest (one `<SourceKind> <address>` per line)
    #[arg(short, long, default_value = "sources.txt")]
    manifest: PathBuf,

    /// Path to the event stream (one JSON envelope per line)
    #[arg(short, long, default_value = "events.jsonl")]
    events: PathBuf,

    /// Path to RocksDB database directory
    #[arg(short, long, default_value = "./projector_db")]
    db_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("Starting projection indexer");
    info!("RPC URL: {}", args.rpc_url);
    info!("Manifest: {:?}", args.manifest);
    info!("Events: {:?}", args.events);
    info!("Database: {:?}", args.db_path);

    let reader = RpcReader::new(RpcClient::new(args.rpc_url));

    let store = RocksEntityStore::open(&args.db_path)
        .with_context(|| format!("Failed to open database at {:?}", args.db_path))?;

    let indexer = Indexer::new(store, reader);

    let sources = load_manifest(&args.manifest).context("Failed to load source manifest")?;
    let added = indexer
        .register_static_sources(&sources)
        .context("Failed to register static sources")?;
    info!("{} static sources ({} new)", sources.len(), added);

    // Handle Ctrl+C gracefully; the last committed event stays the cursor
    tokio::select! {
        result = indexer.run(&args.events) => {
            let stats = result.context("Indexer error")?;
            info!("{} events applied, {} replays skipped", stats.applied, stats.skipped);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    info!("Indexer stopped");
    Ok(())
}
