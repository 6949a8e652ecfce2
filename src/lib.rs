//! Projector - contract event projection engine
//!
//! Consumes decoded contract events in chain order and maintains a store of
//! derived entities: distributions, sales, tokens and holders, escrows,
//! verification records, tiers and vaults. Each event is applied atomically
//! together with the processing cursor. Contracts discovered through
//! factories and parents are registered as new event sources on the fly.

pub mod abi;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod indexer;
pub mod keys;
pub mod lists;
pub mod reader;
pub mod records;
pub mod rpc;
pub mod sources;
pub mod store;
pub mod txn;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export the main types for convenience
pub use entity::{Entity, EntityKind};
pub use error::ProjectionError;
pub use indexer::{Indexer, ProcessOutcome, RunStats};
pub use reader::ContractReader;
pub use sources::{SourceContext, SourceKind};
pub use store::{EntityStore, MemoryEntityStore, RocksEntityStore};
pub use types::{Event, EventEnvelope, EventPosition};
