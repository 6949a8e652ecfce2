//! Static event dispatch
//!
//! Every registered source has a [`SourceKind`]; every envelope carries a
//! typed [`Event`]. The pair selects exactly one handler. A pair with no
//! handler means the source was registered with the wrong template or the
//! stream is mislabelled, and fails the event instead of dropping it.

use crate::handlers;
use crate::error::ProjectionError;
use crate::keys::{address_id, log_id};
use crate::reader::{ContractReader, Reads};
use crate::records::{Deployment, Emitted};
use crate::sources::{SourceContext, SourceKind};
use crate::store::{ChangeSet, EntityStore};
use crate::txn::EntityTx;
use crate::types::{Event, EventEnvelope};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};

/// Metadata of the event being handled.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Emitting contract
    pub address: Address,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub tx_hash: B256,
    pub tx_from: Address,
    pub log_index: u64,
    /// Context attached when the emitting source was registered
    pub context: SourceContext,
}

impl EventMeta {
    pub fn new(envelope: &EventEnvelope, context: SourceContext) -> Self {
        Self {
            address: envelope.address,
            block_number: envelope.block_number,
            block_timestamp: envelope.block_timestamp,
            tx_hash: envelope.tx_hash,
            tx_from: envelope.tx_from,
            log_index: envelope.log_index,
            context,
        }
    }

    /// Entity id of the emitting contract.
    pub fn address_id(&self) -> String {
        address_id(self.address)
    }

    /// Id for a record derived from this log.
    pub fn log_id(&self) -> String {
        log_id(self.tx_hash, self.log_index)
    }

    pub fn emitted(&self) -> Emitted {
        Emitted {
            block: self.block_number,
            timestamp: self.block_timestamp,
            tx: self.tx_hash,
        }
    }

    /// Deployment record for a child created by this (factory) event.
    pub fn deployment(&self) -> Deployment {
        Deployment {
            factory: self.address_id(),
            deployer: self.tx_from,
            block: self.block_number,
            timestamp: self.block_timestamp,
        }
    }

    /// Parent address the source was registered with.
    pub fn parent(&self, key: &str) -> Result<Address> {
        self.context.address(key)?.with_context(|| {
            format!(
                "Source {} was registered without '{}' context",
                self.address_id(),
                key
            )
        })
    }
}

/// Everything a handler may touch while processing one event.
pub struct HandlerContext<'a> {
    pub entities: EntityTx<'a>,
    pub reads: Reads<'a>,
    pub event: &'a EventMeta,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        reader: &'a dyn ContractReader,
        event: &'a EventMeta,
    ) -> Self {
        Self {
            entities: EntityTx::new(store),
            reads: Reads::new(reader, event.block_number),
            event,
        }
    }

    pub fn into_changes(self) -> ChangeSet {
        self.entities.into_changes()
    }
}

/// Route one event to its handler.
pub async fn dispatch(ctx: &mut HandlerContext<'_>, source: SourceKind, event: &Event) -> Result<()> {
    match (source, event) {
        (SourceKind::Factory(kind), Event::Factory(e)) => handlers::factory::handle(ctx, kind, e).await,
        (SourceKind::Trust, Event::Trust(e)) => handlers::trust::handle(ctx, e).await,
        (SourceKind::Pool, Event::Pool(e)) => handlers::pool::handle(ctx, e).await,
        (SourceKind::Sale, Event::Sale(e)) => handlers::sale::handle(ctx, e).await,
        (SourceKind::RedeemableErc20, Event::RedeemableErc20(e)) => {
            handlers::redeemable::handle(ctx, e).await
        }
        (SourceKind::SeedErc20, Event::SeedErc20(e)) => handlers::seed::handle(ctx, e).await,
        (SourceKind::Stake, Event::Stake(e)) => handlers::stake::handle(ctx, e).await,
        (SourceKind::Verify, Event::Verify(e)) => handlers::verify::handle(ctx, e),
        (SourceKind::Tier(_), Event::Tier(e)) => handlers::tier::handle(ctx, e).await,
        (SourceKind::GatedNft, Event::GatedNft(e)) => handlers::gated_nft::handle(ctx, e),
        (SourceKind::ClaimEscrow, Event::ClaimEscrow(e)) => handlers::escrow::handle(ctx, e).await,
        (SourceKind::OrderBook, Event::OrderBook(e)) => handlers::orderbook::handle(ctx, e).await,
        (SourceKind::NoticeBoard, Event::NoticeBoard(e)) => handlers::notice::handle(ctx, e),
        (source_kind, event) => Err(ProjectionError::UnexpectedEvent {
            source_kind,
            event: event.name().to_string(),
        }
        .into()),
    }
}
