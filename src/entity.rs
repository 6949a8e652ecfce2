//! Entity trait and kind registry
//!
//! Every persisted record implements [`Entity`], which ties the Rust type to
//! its [`EntityKind`]. The kind names double as RocksDB column family names
//! and as the type names accepted by `projctl`.

use crate::records::*;
use crate::sources::DataSource;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A persisted, uniquely keyed record.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// Primary key.
    fn id(&self) -> &str;
}

macro_rules! entity_kinds {
    ($($variant:ident => $name:literal,)*) => {
        /// Every entity type the projection persists.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum EntityKind {
            $($variant,)*
        }

        impl EntityKind {
            pub const ALL: &'static [EntityKind] = &[$(EntityKind::$variant,)*];

            /// Stable storage name of the kind.
            pub fn name(self) -> &'static str {
                match self {
                    $(EntityKind::$variant => $name,)*
                }
            }

            /// Look a kind up by its storage name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(EntityKind::$variant),)*
                    _ => None,
                }
            }

            /// Decode a stored record of this kind into JSON.
            pub fn decode_json(self, bytes: &[u8]) -> Result<serde_json::Value> {
                match self {
                    $(EntityKind::$variant => {
                        let entity: $variant = postcard::from_bytes(bytes)
                            .with_context(|| format!("Failed to deserialize {} record", $name))?;
                        serde_json::to_value(entity).context("Failed to render entity as JSON")
                    })*
                }
            }
        }

        $(
            impl Entity for $variant {
                const KIND: EntityKind = EntityKind::$variant;

                fn id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

entity_kinds! {
    Factory => "factory",
    Trust => "trust",
    DistributionProgress => "distribution_progress",
    Pool => "pool",
    Swap => "swap",
    Sale => "sale",
    SaleBuy => "sale_buy",
    SaleRefund => "sale_refund",
    SaleFeeRecipient => "sale_fee_recipient",
    RedeemableErc20 => "redeemable_erc20",
    Holder => "holder",
    Redeem => "redeem",
    TreasuryAsset => "treasury_asset",
    Erc20 => "erc20",
    SeedErc20 => "seed_erc20",
    SeedLog => "seed_log",
    Stake => "stake",
    StakeLog => "stake_log",
    Verify => "verify",
    VerifyAddress => "verify_address",
    VerifyLog => "verify_log",
    VerifyRoleHolder => "verify_role_holder",
    Tier => "tier",
    TierChange => "tier_change",
    TierAccount => "tier_account",
    GatedNft => "gated_nft",
    GatedToken => "gated_token",
    GatedNftHolder => "gated_nft_holder",
    ClaimEscrow => "claim_escrow",
    EscrowLog => "escrow_log",
    EscrowDepositor => "escrow_depositor",
    EscrowWithdrawer => "escrow_withdrawer",
    EscrowSupplyTokenDeposit => "escrow_supply_token_deposit",
    EscrowPendingDepositorToken => "escrow_pending_depositor_token",
    Vault => "vault",
    TokenVault => "token_vault",
    VaultLog => "vault_log",
    Notice => "notice",
    UnknownNotices => "unknown_notices",
    DataSource => "data_source",
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
