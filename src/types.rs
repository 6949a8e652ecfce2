//! Event envelope and typed event families
//!
//! An envelope is one decoded contract log plus its block and transaction
//! metadata. Envelopes arrive as JSON lines:
//!
//! ```text
//! {"address":"0x..","blockNumber":"0x10","blockTimestamp":1650000000,
//!  "txHash":"0x..","txFrom":"0x..","logIndex":0,
//!  "event":{"source":"Factory","event":{"name":"NewChild","params":{..}}}}
//! ```
//!
//! `event.source` names the event family, `event.event.name` the Solidity
//! event, and `params` its arguments in camelCase.

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Position of a log in the chain: block number, then log index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventPosition {
    pub block_number: u64,
    pub log_index: u64,
}

/// Decoded event with block and transaction metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Address of the contract that emitted the log
    pub address: Address,

    /// Block number (JSON number or hex string)
    #[serde(deserialize_with = "deserialize_quantity")]
    pub block_number: u64,

    /// Block timestamp in seconds (JSON number or hex string)
    #[serde(deserialize_with = "deserialize_quantity")]
    pub block_timestamp: u64,

    pub tx_hash: B256,

    /// Sender of the transaction
    pub tx_from: Address,

    /// Log index within the block (JSON number or hex string)
    #[serde(deserialize_with = "deserialize_quantity")]
    pub log_index: u64,

    pub event: Event,
}

impl EventEnvelope {
    pub fn position(&self) -> EventPosition {
        EventPosition {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }

    /// Parse one JSON line.
    pub fn from_json_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to parse event envelope")
    }
}

/// Every event the projection understands, grouped by emitting contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "event")]
pub enum Event {
    Factory(FactoryEvent),
    Trust(TrustEvent),
    Pool(PoolEvent),
    Sale(SaleEvent),
    RedeemableErc20(RedeemableErc20Event),
    SeedErc20(SeedErc20Event),
    Stake(StakeEvent),
    Verify(VerifyEvent),
    Tier(TierEvent),
    GatedNft(GatedNftEvent),
    ClaimEscrow(ClaimEscrowEvent),
    OrderBook(OrderBookEvent),
    NoticeBoard(NoticeBoardEvent),
}

impl Event {
    /// Solidity event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Factory(e) => match e {
                FactoryEvent::Implementation(_) => "Implementation",
                FactoryEvent::NewChild(_) => "NewChild",
            },
            Event::Trust(e) => match e {
                TrustEvent::StartDutchAuction(_) => "StartDutchAuction",
                TrustEvent::EndDutchAuction(_) => "EndDutchAuction",
                TrustEvent::Notice(_) => "Notice",
            },
            Event::Pool(PoolEvent::Swap(_)) => "LOG_SWAP",
            Event::Sale(e) => match e {
                SaleEvent::Initialize(_) => "Initialize",
                SaleEvent::Start(_) => "Start",
                SaleEvent::End(_) => "End",
                SaleEvent::Buy(_) => "Buy",
                SaleEvent::Refund(_) => "Refund",
            },
            Event::RedeemableErc20(e) => match e {
                RedeemableErc20Event::Transfer(_) => "Transfer",
                RedeemableErc20Event::Redeem(_) => "Redeem",
                RedeemableErc20Event::TreasuryAsset(_) => "TreasuryAsset",
            },
            Event::SeedErc20(e) => match e {
                SeedErc20Event::Transfer(_) => "Transfer",
                SeedErc20Event::Seed(_) => "Seed",
                SeedErc20Event::Unseed(_) => "Unseed",
                SeedErc20Event::Redeem(_) => "Redeem",
            },
            Event::Stake(e) => match e {
                StakeEvent::Initialize(_) => "Initialize",
                StakeEvent::Transfer(_) => "Transfer",
            },
            Event::Verify(e) => match e {
                VerifyEvent::Initialize(_) => "Initialize",
                VerifyEvent::RequestApprove(_) => "RequestApprove",
                VerifyEvent::Approve(_) => "Approve",
                VerifyEvent::RequestBan(_) => "RequestBan",
                VerifyEvent::Ban(_) => "Ban",
                VerifyEvent::RequestRemove(_) => "RequestRemove",
                VerifyEvent::Remove(_) => "Remove",
                VerifyEvent::RoleGranted(_) => "RoleGranted",
                VerifyEvent::RoleRevoked(_) => "RoleRevoked",
            },
            Event::Tier(e) => match e {
                TierEvent::Initialize(_) => "Initialize",
                TierEvent::TierChange(_) => "TierChange",
            },
            Event::GatedNft(e) => match e {
                GatedNftEvent::Initialize(_) => "Initialize",
                GatedNftEvent::Transfer(_) => "Transfer",
                GatedNftEvent::UpdatedRoyaltyRecipient(_) => "UpdatedRoyaltyRecipient",
            },
            Event::ClaimEscrow(e) => match e {
                ClaimEscrowEvent::PendingDeposit(_) => "PendingDeposit",
                ClaimEscrowEvent::Deposit(_) => "Deposit",
                ClaimEscrowEvent::Undeposit(_) => "Undeposit",
                ClaimEscrowEvent::Withdraw(_) => "Withdraw",
            },
            Event::OrderBook(e) => match e {
                OrderBookEvent::Deposit(_) => "Deposit",
                OrderBookEvent::Withdraw(_) => "Withdraw",
            },
            Event::NoticeBoard(NoticeBoardEvent::NewNotice(_)) => "NewNotice",
        }
    }
}

// Shared parameter shapes

/// ERC20 `Transfer(from, to, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

// Factories

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum FactoryEvent {
    Implementation(Implementation),
    NewChild(NewChild),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub sender: Address,
    pub implementation: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChild {
    pub sender: Address,
    pub child: Address,
}

// Trust and its pool

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum TrustEvent {
    StartDutchAuction(StartDutchAuction),
    EndDutchAuction(EndDutchAuction),
    Notice(TrustNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDutchAuction {
    pub sender: Address,
    pub pool: Address,
    pub final_auction_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndDutchAuction {
    pub sender: Address,
    pub final_balance: U256,
    pub seeder_pay: U256,
    pub creator_pay: U256,
    pub token_pay: U256,
    pub pool_dust: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustNotice {
    pub sender: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum PoolEvent {
    #[serde(rename = "LOG_SWAP")]
    Swap(PoolSwap),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSwap {
    pub caller: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub token_amount_in: U256,
    pub token_amount_out: U256,
}

// Sale

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum SaleEvent {
    Initialize(SaleInitialize),
    Start(SaleStart),
    End(SaleEnd),
    Buy(SaleReceiptEvent),
    Refund(SaleReceiptEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleConfig {
    pub recipient: Address,
    pub reserve: Address,
    pub cooldown_duration: U256,
    pub minimum_raise: U256,
    pub dust_size: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleInitialize {
    pub sender: Address,
    pub config: SaleConfig,
    pub token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleStart {
    pub sender: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEnd {
    pub sender: Address,
    pub sale_status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyReceipt {
    pub id: U256,
    pub fee_recipient: Address,
    pub fee: U256,
    pub units: U256,
    pub price: U256,
}

/// Parameters of both `Buy` and `Refund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceiptEvent {
    pub sender: Address,
    pub receipt: BuyReceipt,
}

// Tokens

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum RedeemableErc20Event {
    Transfer(Transfer),
    Redeem(TokenRedeem),
    TreasuryAsset(TreasuryAssetAdded),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRedeem {
    pub sender: Address,
    pub treasury_asset: Address,
    pub redeem_amount: U256,
    pub asset_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryAssetAdded {
    pub sender: Address,
    pub asset: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum SeedErc20Event {
    Transfer(Transfer),
    Seed(SeedParams),
    Unseed(UnseedParams),
    Redeem(SeedRedeemParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedParams {
    pub sender: Address,
    pub tokens_seeded: U256,
    pub reserve_received: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnseedParams {
    pub sender: Address,
    pub tokens_unseeded: U256,
    pub reserve_returned: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRedeemParams {
    pub sender: Address,
    pub redeem_amount: U256,
    pub reserve_received: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum StakeEvent {
    Initialize(StakeInitialize),
    Transfer(Transfer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeInitialize {
    pub sender: Address,
    pub token: Address,
    pub initial_ratio: U256,
}

// Verify

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum VerifyEvent {
    Initialize(VerifyInitialize),
    RequestApprove(Evidence),
    Approve(Evidence),
    RequestBan(Evidence),
    Ban(Evidence),
    RequestRemove(Evidence),
    Remove(Evidence),
    RoleGranted(RoleChange),
    RoleRevoked(RoleChange),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInitialize {
    pub sender: Address,
    pub admin: Address,
}

/// Account and supporting data attached to a verification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub sender: Address,
    pub account: Address,
    #[serde(default)]
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChange {
    pub role: B256,
    pub account: Address,
    pub sender: Address,
}

// Tier

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum TierEvent {
    Initialize(TierInitialize),
    TierChange(TierChangeParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierInitialize {
    pub sender: Address,
    /// Gating token, for balance based tiers
    #[serde(default)]
    pub token: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChangeParams {
    pub sender: Address,
    pub account: Address,
    pub start_tier: U256,
    pub end_tier: U256,
}

// Gated NFT

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum GatedNftEvent {
    Initialize(GatedNftInitialize),
    Transfer(NftTransfer),
    UpdatedRoyaltyRecipient(UpdatedRoyaltyRecipient),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedNftConfig {
    pub name: String,
    pub symbol: String,
    pub tier: Address,
    pub minimum_status: U256,
    pub max_per_address: U256,
    pub transferrable: u8,
    pub max_mintable: U256,
    pub royalty_recipient: Address,
    pub royalty_bps: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedNftInitialize {
    pub sender: Address,
    pub config: GatedNftConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransfer {
    pub from: Address,
    pub to: Address,
    pub token_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedRoyaltyRecipient {
    pub origin: Address,
    pub next_recipient: Address,
}

// Claim escrow

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum ClaimEscrowEvent {
    PendingDeposit(PendingDeposit),
    Deposit(EscrowTransfer),
    Undeposit(EscrowTransfer),
    Withdraw(EscrowTransfer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeposit {
    pub sender: Address,
    pub sale: Address,
    pub redeemable: Address,
    pub token: Address,
    pub amount: U256,
}

/// Parameters of `Deposit`, `Undeposit` and `Withdraw`.
///
/// `sender` is the depositor for deposits and undeposits and the
/// withdrawer for withdraws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowTransfer {
    pub sender: Address,
    pub sale: Address,
    pub redeemable: Address,
    pub token: Address,
    /// Redeemable total supply snapshot the funds are bound to
    pub supply: U256,
    pub amount: U256,
}

// Order book

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum OrderBookEvent {
    Deposit(VaultDeposit),
    Withdraw(VaultWithdraw),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    pub token: Address,
    pub vault_id: U256,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDeposit {
    pub sender: Address,
    pub config: VaultConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultWithdraw {
    pub sender: Address,
    /// Requested withdrawal
    pub config: VaultConfig,
    /// Amount actually withdrawn (capped at the vault balance)
    pub amount: U256,
}

// Notice board

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum NoticeBoardEvent {
    NewNotice(NewNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticePayload {
    pub subject: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotice {
    pub sender: Address,
    pub notice: NoticePayload,
}

// Quantity deserialization

/// Deserialize a u64 given either as a JSON number or as a hex string.
///
/// Node-produced logs carry `"0x1a"` quantities; hand-written fixtures and
/// most decoders emit plain numbers.
fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Number(u64),
        Text(String),
    }

    match Quantity::deserialize(deserializer)? {
        Quantity::Number(n) => Ok(n),
        Quantity::Text(s) => match s.strip_prefix("0x") {
            Some(hex) if hex.is_empty() => Ok(0),
            Some(hex) => u64::from_str_radix(hex, 16).map_err(serde::de::Error::custom),
            None => s.parse::<u64>().map_err(serde::de::Error::custom),
        },
    }
}
