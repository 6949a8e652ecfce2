//! Stake tokens: deposits mint, withdrawals burn

use crate::dispatch::HandlerContext;
use crate::handlers::{erc20, holders, notice};
use crate::keys::address_id;
use crate::lists::{append_log, append_unique};
use crate::records::{Erc20, Ratio, Stake, StakeAction, StakeLog};
use crate::types::{StakeEvent, StakeInitialize, Transfer};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::debug;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &StakeEvent) -> Result<()> {
    match event {
        StakeEvent::Initialize(e) => initialize(ctx, e).await,
        StakeEvent::Transfer(e) => transfer(ctx, e).await,
    }
}

pub async fn create(ctx: &mut HandlerContext<'_>, stake: Address) -> Result<()> {
    let id = address_id(stake);
    if ctx.entities.exists::<Stake>(&id)? {
        return Ok(());
    }
    ctx.entities.save(&Stake {
        id,
        address: stake,
        deployment: ctx.event.deployment(),
        name: ctx.reads.name(stake).await?,
        symbol: ctx.reads.symbol(stake).await?,
        decimals: ctx.reads.decimals(stake).await?,
        token: None,
        initial_ratio: U256::ZERO,
        total_supply: ctx.reads.total_supply(stake).await?,
        token_pool_size: None,
        token_to_stake_token_ratio: None,
        holders: Vec::new(),
        deposits: Vec::new(),
        withdraws: Vec::new(),
        notices: Vec::new(),
    })
}

async fn initialize(ctx: &mut HandlerContext<'_>, e: &StakeInitialize) -> Result<()> {
    let mut stake: Stake = ctx.entities.require(&ctx.event.address_id())?;
    stake.token = Some(erc20::snapshot(ctx, e.token).await?);
    stake.initial_ratio = e.initial_ratio;
    ctx.entities.save(&stake)
}

/// Re-read supply and pool size and recompute the exchange ratio.
async fn refresh_pool(ctx: &mut HandlerContext<'_>, stake: &mut Stake) -> Result<()> {
    stake.total_supply = ctx.reads.total_supply(stake.address).await?;

    let underlying = match &stake.token {
        Some(token_id) => ctx.entities.require::<Erc20>(token_id)?.address,
        None => {
            debug!("Stake {} has no underlying token yet", stake.id);
            return Ok(());
        }
    };
    if let Some(size) = ctx.reads.try_balance_of(underlying, stake.address).await? {
        stake.token_pool_size = Some(size);
    }

    // Not computable until both sides are known and supply is non-zero
    if let Some(size) = stake.token_pool_size {
        if let Some(ratio) = Ratio::of(size, stake.total_supply) {
            stake.token_to_stake_token_ratio = Some(ratio);
        }
    }
    Ok(())
}

async fn transfer(ctx: &mut HandlerContext<'_>, e: &Transfer) -> Result<()> {
    let stake_addr = ctx.event.address;
    let mut stake: Stake = ctx.entities.require(&ctx.event.address_id())?;

    if e.from != Address::ZERO {
        holders::debit(&mut ctx.entities, stake_addr, e.from, e.value)?;
    }
    if e.to != Address::ZERO {
        let holder = holders::credit(&mut ctx.entities, stake_addr, e.to, e.value)?;
        stake.holders = append_unique(&stake.holders, &holder);
    }

    refresh_pool(ctx, &mut stake).await?;

    let action = if e.from == Address::ZERO {
        Some((StakeAction::Deposit, e.to))
    } else if e.to == Address::ZERO {
        Some((StakeAction::Withdraw, e.from))
    } else {
        None
    };
    if let Some((action, account)) = action {
        let entry = StakeLog {
            id: ctx.event.log_id(),
            stake: stake.id.clone(),
            action,
            account,
            stake_token_amount: e.value,
            token_pool_size: stake.token_pool_size,
            emitted: ctx.event.emitted(),
        };
        ctx.entities.save(&entry)?;
        match action {
            StakeAction::Deposit => stake.deposits = append_log(&stake.deposits, &entry.id),
            StakeAction::Withdraw => stake.withdraws = append_log(&stake.withdraws, &entry.id),
        }
    }
    ctx.entities.save(&stake)
}

impl notice::HasNotices for Stake {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}
