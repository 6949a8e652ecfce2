//! CLI implementation for projctl
//!
//! Read-only inspection of a projection store. All commands output pretty
//! JSON.

use crate::config::parse_address;
use crate::entity::EntityKind;
use crate::keys::address_id;
use crate::store::{EntityStore, RocksEntityStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

/// Projection store CLI tool
#[derive(Parser)]
#[command(name = "projctl")]
#[command(about = "Inspect entities in a projection store")]
pub struct Cli {
    /// Path to the RocksDB database directory
    #[arg(short, long, default_value = "./projector_db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get one entity
    Get {
        /// Entity kind (see `kinds`)
        kind: String,
        /// Entity id; bare addresses are normalized to lowercase hex
        id: String,
    },
    /// List every entity of a kind
    List {
        /// Entity kind (see `kinds`)
        kind: String,
    },
    /// Get the position of the last applied event
    Cursor,
    /// List the known entity kinds
    Kinds,
}

fn parse_kind(name: &str) -> Result<EntityKind> {
    EntityKind::from_name(name).with_context(|| {
        format!("Unknown entity kind '{}' (run `projctl kinds` for the list)", name)
    })
}

/// Address ids are stored lowercase; accept checksummed input.
fn normalize_id(id: &str) -> String {
    match parse_address(id) {
        Ok(addr) if id.len() >= 40 => address_id(addr),
        _ => id.to_string(),
    }
}

/// Run the CLI command and print JSON output.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let open_store = || {
        RocksEntityStore::open(&cli.db_path)
            .with_context(|| format!("Failed to open database at {:?}", cli.db_path))
    };

    let result = match &cli.command {
        Commands::Get { kind, id } => {
            let kind = parse_kind(kind)?;
            let store = open_store()?;
            let id = normalize_id(id);
            match store.get(kind, &id)? {
                Some(bytes) => json!({
                    "kind": kind.name(),
                    "id": id,
                    "entity": kind.decode_json(&bytes)?,
                }),
                None => json!({
                    "kind": kind.name(),
                    "id": id,
                    "entity": null
                }),
            }
        }
        Commands::List { kind } => {
            let kind = parse_kind(kind)?;
            let store = open_store()?;
            let mut entities = Vec::new();
            for (id, bytes) in store.list(kind)? {
                let entity = kind
                    .decode_json(&bytes)
                    .with_context(|| format!("Failed to decode {} '{}'", kind, id))?;
                entities.push(entity);
            }
            json!({
                "kind": kind.name(),
                "count": entities.len(),
                "entities": entities,
            })
        }
        Commands::Cursor => match open_store()?.get_cursor()? {
            Some(position) => json!({
                "block_number": position.block_number,
                "log_index": position.log_index,
            }),
            None => json!({ "cursor": null }),
        },
        Commands::Kinds => {
            let names: Vec<&str> = EntityKind::ALL.iter().map(|kind| kind.name()).collect();
            json!({ "kinds": names })
        }
    };

    // Pretty print JSON
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
