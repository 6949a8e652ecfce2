//! Outbound contract reads
//!
//! Handlers read auxiliary chain state through [`Reads`], which pins every
//! call to the block height of the event being processed. Each read comes in
//! two flavours:
//!
//! - trusting (`name`, `total_supply`, ...): for protocol-owned contracts
//!   that are guaranteed to implement the interface. A revert or malformed
//!   return aborts the event with [`ProjectionError::CallReverted`] or
//!   [`ProjectionError::Undecodable`].
//! - fallible (`try_name`, `try_total_supply`, ...): for addresses whose
//!   interface is not guaranteed (user-supplied reserves, arbitrary tokens).
//!   A revert or malformed return yields `Ok(None)` and the caller leaves
//!   the dependent field unset.
//!
//! Transport failures are errors in both flavours: they say nothing about
//! the target contract and must not be mistaken for "no data".

use crate::abi::{self, IERC20, ISale, ISeedERC20, ITier, ITrust};
use crate::error::ProjectionError;
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Result of one `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success(Vec<u8>),
    Reverted,
}

/// Executes read-only calls against chain state at a given block.
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn call(&self, target: Address, calldata: Vec<u8>, block: u64) -> Result<CallOutcome>;
}

/// Catalogue of the view functions the projection calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractCall {
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    BalanceOf(Address),
    GetDistributionProgress,
    GetContracts,
    MinimumTradingDuration,
    FinalWeight,
    FinalValuation,
    SaleStatus,
    TierValues,
    Reserve,
}

impl ContractCall {
    pub fn signature(&self) -> &'static str {
        match self {
            ContractCall::Name => IERC20::nameCall::SIGNATURE,
            ContractCall::Symbol => IERC20::symbolCall::SIGNATURE,
            ContractCall::Decimals => IERC20::decimalsCall::SIGNATURE,
            ContractCall::TotalSupply => IERC20::totalSupplyCall::SIGNATURE,
            ContractCall::BalanceOf(_) => IERC20::balanceOfCall::SIGNATURE,
            ContractCall::GetDistributionProgress => ITrust::getDistributionProgressCall::SIGNATURE,
            ContractCall::GetContracts => ITrust::getContractsCall::SIGNATURE,
            ContractCall::MinimumTradingDuration => ITrust::minimumTradingDurationCall::SIGNATURE,
            ContractCall::FinalWeight => ITrust::finalWeightCall::SIGNATURE,
            ContractCall::FinalValuation => ITrust::finalValuationCall::SIGNATURE,
            ContractCall::SaleStatus => ISale::saleStatusCall::SIGNATURE,
            ContractCall::TierValues => ITier::tierValuesCall::SIGNATURE,
            ContractCall::Reserve => ISeedERC20::reserveCall::SIGNATURE,
        }
    }

    pub fn calldata(&self) -> Vec<u8> {
        match *self {
            ContractCall::Name => IERC20::nameCall {}.abi_encode(),
            ContractCall::Symbol => IERC20::symbolCall {}.abi_encode(),
            ContractCall::Decimals => IERC20::decimalsCall {}.abi_encode(),
            ContractCall::TotalSupply => IERC20::totalSupplyCall {}.abi_encode(),
            ContractCall::BalanceOf(account) => IERC20::balanceOfCall { account }.abi_encode(),
            ContractCall::GetDistributionProgress => ITrust::getDistributionProgressCall {}.abi_encode(),
            ContractCall::GetContracts => ITrust::getContractsCall {}.abi_encode(),
            ContractCall::MinimumTradingDuration => ITrust::minimumTradingDurationCall {}.abi_encode(),
            ContractCall::FinalWeight => ITrust::finalWeightCall {}.abi_encode(),
            ContractCall::FinalValuation => ITrust::finalValuationCall {}.abi_encode(),
            ContractCall::SaleStatus => ISale::saleStatusCall {}.abi_encode(),
            ContractCall::TierValues => ITier::tierValuesCall {}.abi_encode(),
            ContractCall::Reserve => ISeedERC20::reserveCall {}.abi_encode(),
        }
    }
}

/// Decoded `getDistributionProgress()` tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionProgressView {
    pub status: u8,
    pub start_block: u64,
    pub end_block: u64,
    pub pool_reserve_balance: U256,
    pub pool_token_balance: U256,
    pub reserve_init: U256,
    pub minimum_creator_raise: U256,
    pub seeder_fee: U256,
    pub redeem_init: U256,
}

impl DistributionProgressView {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let ret = abi::returns::<ITrust::getDistributionProgressCall>(data)?;
        Ok(Self {
            status: ret.distributionStatus,
            start_block: u64::from(ret.distributionStartBlock),
            end_block: u64::from(ret.distributionEndBlock),
            pool_reserve_balance: ret.poolReserveBalance,
            pool_token_balance: ret.poolTokenBalance,
            reserve_init: ret.reserveInit,
            minimum_creator_raise: ret.minimumCreatorRaise,
            seeder_fee: ret.seederFee,
            redeem_init: ret.redeemInit,
        })
    }
}

/// Decoded `getContracts()` tuple of a trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustContracts {
    pub reserve: Address,
    pub redeemable: Address,
    pub seeder: Address,
    pub tier: Address,
    pub crp: Address,
}

impl TrustContracts {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let ret = abi::returns::<ITrust::getContractsCall>(data)?;
        Ok(Self {
            reserve: ret.reserve,
            redeemable: ret.redeemable,
            seeder: ret.seeder,
            tier: ret.tier,
            crp: ret.crp,
        })
    }
}

fn decode_u8(data: &[u8]) -> Result<u8> {
    Ok(abi::returns::<IERC20::decimalsCall>(data)?._0)
}

fn decode_u256(data: &[u8]) -> Result<U256> {
    Ok(abi::returns::<IERC20::totalSupplyCall>(data)?._0)
}

fn decode_address(data: &[u8]) -> Result<Address> {
    Ok(abi::returns::<ISeedERC20::reserveCall>(data)?._0)
}

fn decode_tier_values(data: &[u8]) -> Result<Vec<U256>> {
    Ok(abi::returns::<ITier::tierValuesCall>(data)?._0.to_vec())
}

/// Reads pinned to one block height.
#[derive(Clone, Copy)]
pub struct Reads<'a> {
    reader: &'a dyn ContractReader,
    block: u64,
}

impl<'a> Reads<'a> {
    pub fn new(reader: &'a dyn ContractReader, block: u64) -> Self {
        Self { reader, block }
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    /// Trusting call: a revert or malformed return is an error.
    pub async fn call<T>(
        &self,
        target: Address,
        call: ContractCall,
        decode: fn(&[u8]) -> Result<T>,
    ) -> Result<T> {
        match self.reader.call(target, call.calldata(), self.block).await? {
            CallOutcome::Success(data) => decode(&data).map_err(|e| {
                ProjectionError::Undecodable {
                    target,
                    call: call.signature(),
                    reason: e.to_string(),
                }
                .into()
            }),
            CallOutcome::Reverted => Err(ProjectionError::CallReverted {
                target,
                call: call.signature(),
                block: self.block,
            }
            .into()),
        }
    }

    /// Fallible call: a revert or malformed return is `Ok(None)`.
    pub async fn try_call<T>(
        &self,
        target: Address,
        call: ContractCall,
        decode: fn(&[u8]) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.reader.call(target, call.calldata(), self.block).await? {
            CallOutcome::Success(data) => match decode(&data) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    debug!(
                        "{} on 0x{:x} returned undecodable data at block {}: {}",
                        call.signature(),
                        target,
                        self.block,
                        e
                    );
                    Ok(None)
                }
            },
            CallOutcome::Reverted => {
                debug!(
                    "{} on 0x{:x} reverted at block {}",
                    call.signature(),
                    target,
                    self.block
                );
                Ok(None)
            }
        }
    }

    pub async fn name(&self, token: Address) -> Result<String> {
        self.call(token, ContractCall::Name, abi::decode_string).await
    }

    pub async fn try_name(&self, token: Address) -> Result<Option<String>> {
        self.try_call(token, ContractCall::Name, abi::decode_string).await
    }

    pub async fn symbol(&self, token: Address) -> Result<String> {
        self.call(token, ContractCall::Symbol, abi::decode_string).await
    }

    pub async fn try_symbol(&self, token: Address) -> Result<Option<String>> {
        self.try_call(token, ContractCall::Symbol, abi::decode_string).await
    }

    pub async fn decimals(&self, token: Address) -> Result<u8> {
        self.call(token, ContractCall::Decimals, decode_u8).await
    }

    pub async fn try_decimals(&self, token: Address) -> Result<Option<u8>> {
        self.try_call(token, ContractCall::Decimals, decode_u8).await
    }

    pub async fn total_supply(&self, token: Address) -> Result<U256> {
        self.call(token, ContractCall::TotalSupply, decode_u256).await
    }

    pub async fn try_total_supply(&self, token: Address) -> Result<Option<U256>> {
        self.try_call(token, ContractCall::TotalSupply, decode_u256).await
    }

    pub async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        self.call(token, ContractCall::BalanceOf(account), decode_u256).await
    }

    pub async fn try_balance_of(&self, token: Address, account: Address) -> Result<Option<U256>> {
        self.try_call(token, ContractCall::BalanceOf(account), decode_u256)
            .await
    }

    pub async fn distribution_progress(&self, trust: Address) -> Result<DistributionProgressView> {
        self.call(
            trust,
            ContractCall::GetDistributionProgress,
            DistributionProgressView::decode,
        )
        .await
    }

    pub async fn trust_contracts(&self, trust: Address) -> Result<TrustContracts> {
        self.call(trust, ContractCall::GetContracts, TrustContracts::decode)
            .await
    }

    pub async fn minimum_trading_duration(&self, trust: Address) -> Result<U256> {
        self.call(trust, ContractCall::MinimumTradingDuration, decode_u256)
            .await
    }

    pub async fn final_weight(&self, trust: Address) -> Result<U256> {
        self.call(trust, ContractCall::FinalWeight, decode_u256).await
    }

    pub async fn final_valuation(&self, trust: Address) -> Result<U256> {
        self.call(trust, ContractCall::FinalValuation, decode_u256).await
    }

    pub async fn try_sale_status(&self, sale: Address) -> Result<Option<u8>> {
        self.try_call(sale, ContractCall::SaleStatus, decode_u8).await
    }

    pub async fn tier_values(&self, tier: Address) -> Result<Vec<U256>> {
        self.call(tier, ContractCall::TierValues, decode_tier_values).await
    }

    /// Look for a `reserve()` accessor, used to recognise seed contracts.
    pub async fn try_reserve(&self, contract: Address) -> Result<Option<Address>> {
        self.try_call(contract, ContractCall::Reserve, decode_address).await
    }
}
