//! Data source kinds and dynamic source registration
//!
//! A data source is a contract address whose events the indexer dispatches.
//! Static sources come from the manifest; every other source is registered
//! by a handler when a factory (or a parent contract) reveals a new address.
//! Registrations are persisted as `DataSource` entities inside the same
//! change set as the event that discovered them.

use crate::keys::address_id;
use crate::txn::EntityTx;
use alloy_primitives::Address;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Context key holding the parent trust address.
pub const CONTEXT_TRUST: &str = "trust";

/// Context key holding the parent sale address.
pub const CONTEXT_SALE: &str = "sale";

/// Which child contract a factory deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactoryKind {
    Trust,
    Sale,
    Stake,
    Verify,
    CombineTier,
    Erc20BalanceTier,
    Erc721BalanceTier,
    Erc20TransferTier,
    GatedNft,
}

impl FactoryKind {
    /// Source kind of the children this factory deploys.
    pub fn child_source(self) -> SourceKind {
        match self {
            FactoryKind::Trust => SourceKind::Trust,
            FactoryKind::Sale => SourceKind::Sale,
            FactoryKind::Stake => SourceKind::Stake,
            FactoryKind::Verify => SourceKind::Verify,
            FactoryKind::CombineTier => SourceKind::Tier(TierKind::CombineTier),
            FactoryKind::Erc20BalanceTier => SourceKind::Tier(TierKind::Erc20BalanceTier),
            FactoryKind::Erc721BalanceTier => SourceKind::Tier(TierKind::Erc721BalanceTier),
            FactoryKind::Erc20TransferTier => SourceKind::Tier(TierKind::Erc20TransferTier),
            FactoryKind::GatedNft => SourceKind::GatedNft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierKind {
    CombineTier,
    Erc20BalanceTier,
    Erc721BalanceTier,
    Erc20TransferTier,
}

/// Event template a data source is dispatched through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Factory(FactoryKind),
    Trust,
    Sale,
    RedeemableErc20,
    SeedErc20,
    Pool,
    Stake,
    Verify,
    Tier(TierKind),
    GatedNft,
    ClaimEscrow,
    OrderBook,
    NoticeBoard,
}

impl SourceKind {
    pub const ALL: &'static [SourceKind] = &[
        SourceKind::Factory(FactoryKind::Trust),
        SourceKind::Factory(FactoryKind::Sale),
        SourceKind::Factory(FactoryKind::Stake),
        SourceKind::Factory(FactoryKind::Verify),
        SourceKind::Factory(FactoryKind::CombineTier),
        SourceKind::Factory(FactoryKind::Erc20BalanceTier),
        SourceKind::Factory(FactoryKind::Erc721BalanceTier),
        SourceKind::Factory(FactoryKind::Erc20TransferTier),
        SourceKind::Factory(FactoryKind::GatedNft),
        SourceKind::Trust,
        SourceKind::Sale,
        SourceKind::RedeemableErc20,
        SourceKind::SeedErc20,
        SourceKind::Pool,
        SourceKind::Stake,
        SourceKind::Verify,
        SourceKind::Tier(TierKind::CombineTier),
        SourceKind::Tier(TierKind::Erc20BalanceTier),
        SourceKind::Tier(TierKind::Erc721BalanceTier),
        SourceKind::Tier(TierKind::Erc20TransferTier),
        SourceKind::GatedNft,
        SourceKind::ClaimEscrow,
        SourceKind::OrderBook,
        SourceKind::NoticeBoard,
    ];

    /// Contract name used in manifests and logs.
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Factory(FactoryKind::Trust) => "TrustFactory",
            SourceKind::Factory(FactoryKind::Sale) => "SaleFactory",
            SourceKind::Factory(FactoryKind::Stake) => "StakeFactory",
            SourceKind::Factory(FactoryKind::Verify) => "VerifyFactory",
            SourceKind::Factory(FactoryKind::CombineTier) => "CombineTierFactory",
            SourceKind::Factory(FactoryKind::Erc20BalanceTier) => "ERC20BalanceTierFactory",
            SourceKind::Factory(FactoryKind::Erc721BalanceTier) => "ERC721BalanceTierFactory",
            SourceKind::Factory(FactoryKind::Erc20TransferTier) => "ERC20TransferTierFactory",
            SourceKind::Factory(FactoryKind::GatedNft) => "GatedNFTFactory",
            SourceKind::Trust => "Trust",
            SourceKind::Sale => "Sale",
            SourceKind::RedeemableErc20 => "RedeemableERC20",
            SourceKind::SeedErc20 => "SeedERC20",
            SourceKind::Pool => "BPool",
            SourceKind::Stake => "Stake",
            SourceKind::Verify => "Verify",
            SourceKind::Tier(TierKind::CombineTier) => "CombineTier",
            SourceKind::Tier(TierKind::Erc20BalanceTier) => "ERC20BalanceTier",
            SourceKind::Tier(TierKind::Erc721BalanceTier) => "ERC721BalanceTier",
            SourceKind::Tier(TierKind::Erc20TransferTier) => "ERC20TransferTier",
            SourceKind::GatedNft => "GatedNFT",
            SourceKind::ClaimEscrow => "RedeemableERC20ClaimEscrow",
            SourceKind::OrderBook => "OrderBook",
            SourceKind::NoticeBoard => "NoticeBoard",
        }
    }

    /// Whether the kind may be declared in the manifest.
    ///
    /// Everything else is only ever discovered through a parent contract.
    pub fn is_static(self) -> bool {
        matches!(
            self,
            SourceKind::Factory(_)
                | SourceKind::ClaimEscrow
                | SourceKind::OrderBook
                | SourceKind::NoticeBoard
        )
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown source kind: {}", s))
    }
}

/// Immutable key-value side channel attached at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext(BTreeMap<String, String>);

impl SourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying one parent address.
    pub fn with_address(key: &str, addr: Address) -> Self {
        let mut context = Self::new();
        context.0.insert(key.to_string(), address_id(addr));
        context
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parent address stored under `key`.
    pub fn address(&self, key: &str) -> Result<Option<Address>> {
        match self.get(key) {
            Some(value) => {
                let addr = Address::from_str(value).map_err(|e| {
                    anyhow::anyhow!("Invalid address in source context '{}': {}", key, e)
                })?;
                Ok(Some(addr))
            }
            None => Ok(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A registered event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub address: Address,
    pub kind: SourceKind,
    pub context: SourceContext,
    /// Block of the event that registered the source (0 for manifest entries)
    pub created_block: u64,
}

/// Register `address` as a source of `kind`.
///
/// Returns `false` and leaves the existing registration untouched when the
/// address is already registered.
pub fn register_source(
    entities: &mut EntityTx<'_>,
    address: Address,
    kind: SourceKind,
    context: SourceContext,
    block: u64,
) -> Result<bool> {
    let id = address_id(address);
    if let Some(existing) = entities.load::<DataSource>(&id)? {
        debug!(
            "Source {} already registered as {}, ignoring {}",
            id, existing.kind, kind
        );
        return Ok(false);
    }

    info!("Registering {} source {} at block {}", kind, id, block);
    entities.save(&DataSource {
        id,
        address,
        kind,
        context,
        created_block: block,
    })?;
    Ok(true)
}
