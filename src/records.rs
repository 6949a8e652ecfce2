//! Persisted entity records
//!
//! These structs are the stored layout of every entity kind. They use
//! postcard for binary serialization and serde_json when rendered by the
//! CLI. Field names are part of the queried schema; extend, don't rename.
//!
//! Relationship fields are ordered lists of entity ids. Lists documented as
//! logs are append-only event history; every other list has unique
//! membership (see [`crate::lists`]).

use crate::entity::EntityKind;
use crate::error::ProjectionError;
use crate::sources::{FactoryKind, TierKind};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────
// Shared value types
// ─────────────────────────────────────────────────────────────────

/// Fixed-point decimal with four fractional digits.
///
/// Used for percentages and token ratios derived from U256 amounts. The
/// stored form is the value multiplied by 10^4, rendered as a decimal
/// string (`"12.3456"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Ratio(U256);

const RATIO_SCALE: u64 = 10_000;

impl Ratio {
    pub const ZERO: Ratio = Ratio(U256::ZERO);

    /// 100%.
    pub fn hundred_percent() -> Self {
        Ratio(U256::from(100 * RATIO_SCALE))
    }

    /// `numerator / denominator`.
    ///
    /// Returns `None` when the denominator is zero or the scaled numerator
    /// overflows.
    pub fn of(numerator: U256, denominator: U256) -> Option<Self> {
        if denominator == U256::ZERO {
            return None;
        }
        let scaled = numerator.checked_mul(U256::from(RATIO_SCALE))?;
        Some(Ratio(scaled / denominator))
    }

    /// `numerator / denominator * 100`, zero-guarded like [`Ratio::of`].
    pub fn percent(numerator: U256, denominator: U256) -> Option<Self> {
        if denominator == U256::ZERO {
            return None;
        }
        let scaled = numerator.checked_mul(U256::from(100 * RATIO_SCALE))?;
        Some(Ratio(scaled / denominator))
    }

    /// The raw value scaled by 10^4.
    pub fn scaled(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = U256::from(RATIO_SCALE);
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        write!(f, "{}.{:04}", whole, frac.as_limbs()[0])
    }
}

impl FromStr for Ratio {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if frac.len() > 4 || !frac.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("Invalid ratio fraction: {}", s);
        }
        let whole: U256 = whole
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid ratio {}: {:?}", s, e))?;
        let frac = format!("{:0<4}", frac).parse::<u64>()?;
        let scaled = whole
            .checked_mul(U256::from(RATIO_SCALE))
            .and_then(|w| w.checked_add(U256::from(frac)))
            .ok_or_else(|| anyhow::anyhow!("Ratio out of range: {}", s))?;
        Ok(Ratio(scaled))
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One fixed-point unit used by sale prices (18 decimals).
pub fn one_ether() -> U256 {
    U256::from(1_000_000_000_000_000_000u64)
}

/// Where and by whom a factory child was deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Factory entity id
    pub factory: String,
    /// Transaction sender of the deploying transaction
    pub deployer: Address,
    pub block: u64,
    pub timestamp: u64,
}

/// Block and transaction a log record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emitted {
    pub block: u64,
    pub timestamp: u64,
    pub tx: B256,
}

// ─────────────────────────────────────────────────────────────────
// Status enums
// ─────────────────────────────────────────────────────────────────

/// Trust distribution phase as reported by `getDistributionProgress()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistributionStatus {
    Pending,
    Seeded,
    Trading,
    TradingCanEnd,
    Success,
    Fail,
}

impl DistributionStatus {
    pub fn from_code(code: u8) -> Result<Self, ProjectionError> {
        Ok(match code {
            0 => Self::Pending,
            1 => Self::Seeded,
            2 => Self::Trading,
            3 => Self::TradingCanEnd,
            4 => Self::Success,
            5 => Self::Fail,
            _ => {
                return Err(ProjectionError::InvalidStatus {
                    what: "distribution",
                    code,
                })
            }
        })
    }

    /// Trading has begun (the pool holds the distribution).
    pub fn has_started(self) -> bool {
        self >= Self::Trading
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SaleStatus {
    Pending,
    Active,
    Success,
    Fail,
}

impl SaleStatus {
    pub fn from_code(code: u8) -> Result<Self, ProjectionError> {
        Ok(match code {
            0 => Self::Pending,
            1 => Self::Active,
            2 => Self::Success,
            3 => Self::Fail,
            _ => return Err(ProjectionError::InvalidStatus { what: "sale", code }),
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyStatus {
    None,
    Approved,
    Banned,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    None,
    RequestApprove,
    RequestBan,
    RequestRemove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyAction {
    RequestApprove,
    Approve,
    RequestBan,
    Ban,
    RequestRemove,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedAction {
    Seed,
    Unseed,
    Redeem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeAction {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowAction {
    PendingDeposit,
    Deposit,
    Undeposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultAction {
    Deposit,
    Withdraw,
}

// ─────────────────────────────────────────────────────────────────
// Factories
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factory {
    pub id: String,
    pub address: Address,
    pub kind: FactoryKind,
    pub implementation: Option<Address>,
    /// Child entity ids (unique)
    pub children: Vec<String>,
    pub children_count: u64,
}

// ─────────────────────────────────────────────────────────────────
// Trust distribution
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trust {
    pub id: String,
    pub address: Address,
    pub deployment: Deployment,
    pub reserve: Address,
    pub redeemable: Address,
    pub seeder: Address,
    pub tier: Address,
    pub crp: Address,
    /// Pool entity id, set when the dutch auction starts
    pub pool: Option<String>,
    /// DistributionProgress entity id
    pub distribution_progress: String,
    pub dutch_auction: Option<DutchAuctionSettlement>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutchAuctionSettlement {
    pub final_balance: U256,
    pub seeder_pay: U256,
    pub creator_pay: U256,
    pub token_pay: U256,
    pub pool_dust: U256,
    pub block: u64,
}

/// Mutable progress snapshot of one trust's distribution.
///
/// `amount_raised`, `percent_raised` and `percent_available` are derived
/// from the other fields on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionProgress {
    pub id: String,
    pub trust: String,
    pub status: DistributionStatus,
    pub start_block: u64,
    pub end_block: u64,
    pub minimum_trading_duration: U256,
    pub final_weight: U256,
    pub final_valuation: U256,
    pub pool_reserve_balance: U256,
    pub pool_token_balance: U256,
    pub reserve_init: U256,
    pub minimum_creator_raise: U256,
    pub seeder_fee: U256,
    pub redeem_init: U256,
    pub minimum_raise: U256,
    pub amount_raised: U256,
    pub percent_raised: Ratio,
    pub percent_available: Ratio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub address: Address,
    pub trust: String,
    pub reserve: Address,
    pub token: Address,
    pub final_auction_block: u64,
    /// Swap log
    pub swaps: Vec<String>,
    pub number_of_swaps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub id: String,
    pub pool: String,
    pub trust: String,
    pub caller: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub token_amount_in: U256,
    pub token_amount_out: U256,
    pub emitted: Emitted,
}

// ─────────────────────────────────────────────────────────────────
// Sale
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub address: Address,
    pub deployment: Deployment,
    pub status: SaleStatus,
    pub recipient: Option<Address>,
    /// Erc20 entity id of the reserve asset
    pub reserve: Option<String>,
    /// RedeemableErc20 entity id of the sold token
    pub token: Option<String>,
    pub cooldown_duration: U256,
    pub minimum_raise: U256,
    pub dust_size: U256,
    pub total_raised: U256,
    pub total_fees: U256,
    pub percent_raised: Ratio,
    pub units_available: Option<U256>,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    /// SaleBuy log
    pub buys: Vec<String>,
    /// SaleRefund log
    pub refunds: Vec<String>,
    pub fee_recipients: Vec<String>,
    pub notices: Vec<String>,
}

/// Buy or refund receipt as recorded against a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub account: Address,
    pub receipt_id: U256,
    /// SaleFeeRecipient entity id
    pub fee_recipient: String,
    pub fee: U256,
    pub units: U256,
    pub price: U256,
    /// `units * price / 1e18`
    pub cost: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleBuy {
    pub id: String,
    pub sale: String,
    pub receipt: SaleReceipt,
    pub emitted: Emitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRefund {
    pub id: String,
    pub sale: String,
    pub receipt: SaleReceipt,
    pub emitted: Emitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFeeRecipient {
    pub id: String,
    pub sale: String,
    pub address: Address,
    pub total_fees: U256,
    pub buys: Vec<String>,
    pub refunds: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemableErc20 {
    pub id: String,
    pub address: Address,
    /// Trust or Sale entity id that distributes this token
    pub parent: Option<String>,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub holders: Vec<String>,
    /// Redeem log
    pub redeems: Vec<String>,
    pub treasury_assets: Vec<String>,
    pub notices: Vec<String>,
}

/// Balance of one account in one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub id: String,
    pub token: String,
    pub address: Address,
    pub balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redeem {
    pub id: String,
    pub token: String,
    pub redeemer: Address,
    pub treasury_asset: Address,
    pub redeem_amount: U256,
    pub asset_amount: U256,
    pub emitted: Emitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryAsset {
    pub id: String,
    pub token: String,
    pub address: Address,
    /// Erc20 entity id
    pub erc20: String,
    /// Balance held by the redeemable token, absent when the read reverted
    pub balance: Option<U256>,
    /// Redeem log
    pub redeems: Vec<String>,
    pub total_redeemed: U256,
}

/// Read-through snapshot of ERC20 metadata.
///
/// Fields are absent when the corresponding call reverted or returned
/// malformed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc20 {
    pub id: String,
    pub address: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
}

// ─────────────────────────────────────────────────────────────────
// Seed
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedErc20 {
    pub id: String,
    pub address: Address,
    pub trust: String,
    pub reserve: Option<Address>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    /// Total seed units (total supply at creation)
    pub seeder_units: Option<U256>,
    pub seeded_units: U256,
    pub seeded_amount: U256,
    pub percent_seeded: Ratio,
    pub holders: Vec<String>,
    /// SeedLog ids of seeds
    pub seeds: Vec<String>,
    /// SeedLog ids of unseeds
    pub unseeds: Vec<String>,
    /// SeedLog ids of redeems
    pub redeems: Vec<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedLog {
    pub id: String,
    pub seed_erc20: String,
    pub action: SeedAction,
    pub account: Address,
    pub units: U256,
    pub reserve_amount: U256,
    pub emitted: Emitted,
}

// ─────────────────────────────────────────────────────────────────
// Stake
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub id: String,
    pub address: Address,
    pub deployment: Deployment,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Erc20 entity id of the underlying token
    pub token: Option<String>,
    pub initial_ratio: U256,
    pub total_supply: U256,
    pub token_pool_size: Option<U256>,
    pub token_to_stake_token_ratio: Option<Ratio>,
    pub holders: Vec<String>,
    /// StakeLog ids of deposits
    pub deposits: Vec<String>,
    /// StakeLog ids of withdraws
    pub withdraws: Vec<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeLog {
    pub id: String,
    pub stake: String,
    pub action: StakeAction,
    pub account: Address,
    pub stake_token_amount: U256,
    pub token_pool_size: Option<U256>,
    pub emitted: Emitted,
}

// ─────────────────────────────────────────────────────────────────
// Verify
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verify {
    pub id: String,
    pub address: Address,
    pub deployment: Deployment,
    pub admin: Option<Address>,
    /// VerifyAddress ids
    pub addresses: Vec<String>,
    /// VerifyLog log
    pub events: Vec<String>,
    /// VerifyRoleHolder ids
    pub role_holders: Vec<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyAddress {
    pub id: String,
    pub verify: String,
    pub address: Address,
    pub status: VerifyStatus,
    pub request_status: RequestStatus,
    /// VerifyLog log
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyLog {
    pub id: String,
    pub verify: String,
    pub action: VerifyAction,
    pub sender: Address,
    pub account: Address,
    pub data: Bytes,
    pub emitted: Emitted,
}

/// Marker of a role currently held on a verify contract.
///
/// Hard-deleted when the role is revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRoleHolder {
    pub id: String,
    pub verify: String,
    pub role: B256,
    pub account: Address,
    pub granted_by: Address,
    pub granted_block: u64,
}

// ─────────────────────────────────────────────────────────────────
// Tier
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: String,
    pub address: Address,
    pub kind: TierKind,
    pub deployment: Deployment,
    pub tier_values: Vec<U256>,
    /// Erc20 entity id of the gating token
    pub token: Option<String>,
    /// TierChange log
    pub changes: Vec<String>,
    /// TierAccount ids
    pub accounts: Vec<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChange {
    pub id: String,
    pub tier: String,
    pub sender: Address,
    pub account: Address,
    pub start_tier: U256,
    pub end_tier: U256,
    pub emitted: Emitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAccount {
    pub id: String,
    pub tier: String,
    pub address: Address,
    pub current_tier: U256,
    pub changes: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────
// Gated NFT
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatedNft {
    pub id: String,
    pub address: Address,
    pub deployment: Deployment,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub tier: Option<Address>,
    pub minimum_status: U256,
    pub max_per_address: U256,
    pub transferrable: u8,
    pub max_mintable: U256,
    pub royalty_recipient: Option<Address>,
    pub royalty_bps: U256,
    pub minted: u64,
    pub tokens: Vec<String>,
    /// GatedNftHolder ids of current holders
    pub holders: Vec<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatedToken {
    pub id: String,
    pub nft: String,
    pub token_id: U256,
    pub owner: Address,
    pub minted: Emitted,
    pub transfers: u64,
}

/// Marker of an account currently holding at least one gated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatedNftHolder {
    pub id: String,
    pub nft: String,
    pub address: Address,
    pub tokens: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────
// Claim escrow
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEscrow {
    pub id: String,
    pub address: Address,
    pub deposits: Vec<String>,
    pub pending_deposits: Vec<String>,
    pub undeposits: Vec<String>,
    pub withdraws: Vec<String>,
    pub depositors: Vec<String>,
    pub withdrawers: Vec<String>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowLog {
    pub id: String,
    pub escrow: String,
    pub action: EscrowAction,
    pub account: Address,
    pub sale: Address,
    pub redeemable: Address,
    /// Erc20 entity id
    pub token: String,
    pub supply: Option<U256>,
    pub amount: U256,
    pub emitted: Emitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowDepositor {
    pub id: String,
    pub escrow: String,
    pub address: Address,
    pub deposits: Vec<String>,
    pub pending_deposits: Vec<String>,
    pub undeposits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowWithdrawer {
    pub id: String,
    pub escrow: String,
    pub address: Address,
    pub withdraws: Vec<String>,
    pub total_withdrawn: U256,
}

/// Deposits against one (sale, supply snapshot, token) inside an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSupplyTokenDeposit {
    pub id: String,
    pub escrow: String,
    pub sale: Address,
    pub token: String,
    pub supply: U256,
    /// Cumulative deposits net of undeposits
    pub total_deposited: U256,
    /// Funds still held: deposits net of undeposits and withdraws
    pub total_remaining: U256,
    pub total_withdrawn: U256,
    pub deposits: Vec<String>,
    pub undeposits: Vec<String>,
    pub withdraws: Vec<String>,
}

/// Pending deposits of one depositor in one token inside an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowPendingDepositorToken {
    pub id: String,
    pub escrow: String,
    pub sale: Address,
    pub depositor: Address,
    pub token: String,
    pub total_deposited: U256,
    /// Set once a deposit lands after the sale reached a terminal status
    pub swept: bool,
    pub pending_deposits: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────
// Order book vaults
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: String,
    pub vault_id: U256,
    pub owner: Address,
    pub token_vaults: Vec<String>,
    /// VaultLog log
    pub transfers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenVault {
    pub id: String,
    pub vault: String,
    pub vault_id: U256,
    pub owner: Address,
    /// Erc20 entity id
    pub token: String,
    pub balance: U256,
    /// VaultLog log
    pub transfers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLog {
    pub id: String,
    pub vault: String,
    pub token_vault: String,
    pub action: VaultAction,
    pub sender: Address,
    pub token: Address,
    pub requested: U256,
    pub amount: U256,
    pub emitted: Emitted,
}

// ─────────────────────────────────────────────────────────────────
// Notices
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub sender: Address,
    pub subject: Address,
    /// Entity kind the subject resolved to, if any
    pub subject_kind: Option<EntityKind>,
    pub data: Bytes,
    pub emitted: Emitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownNotices {
    pub id: String,
    pub notices: Vec<String>,
}
