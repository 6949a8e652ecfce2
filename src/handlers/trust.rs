//! Trust distributions and their progress snapshot
//!
//! A trust owns a redeemable token, an optional seed contract, and (once
//! trading starts) a balancer pool. Its `DistributionProgress` is refreshed
//! from `getDistributionProgress()` on every lifecycle event of the trust,
//! its pool, and its seeder.

use crate::dispatch::HandlerContext;
use crate::handlers::{erc20, notice, redeemable, seed};
use crate::keys::address_id;
use crate::records::{
    DistributionProgress, DistributionStatus, DutchAuctionSettlement, Pool, Ratio, Trust,
};
use crate::sources::{register_source, SourceContext, SourceKind, CONTEXT_TRUST};
use crate::types::{EndDutchAuction, StartDutchAuction, TrustEvent};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::{debug, warn};

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &TrustEvent) -> Result<()> {
    match event {
        TrustEvent::StartDutchAuction(e) => start_dutch_auction(ctx, e).await,
        TrustEvent::EndDutchAuction(e) => end_dutch_auction(ctx, e).await,
        TrustEvent::Notice(e) => {
            let subject = ctx.event.address;
            notice::file(ctx, e.sender, subject, &e.data)
        }
    }
}

/// Create a trust discovered by its factory.
///
/// Reads the trust's contracts, creates and registers its redeemable token
/// and (when the seeder is a seed contract) its seed token, and takes the
/// first progress snapshot.
pub async fn create(ctx: &mut HandlerContext<'_>, trust: Address) -> Result<()> {
    let id = address_id(trust);
    if ctx.entities.exists::<Trust>(&id)? {
        return Ok(());
    }

    let contracts = ctx.reads.trust_contracts(trust).await?;
    redeemable::create(ctx, contracts.redeemable, CONTEXT_TRUST, trust).await?;
    erc20::snapshot(ctx, contracts.reserve).await?;

    // The seeder may be any address; only seed contracts answer reserve()
    match ctx.reads.try_reserve(contracts.seeder).await? {
        Some(reserve) => seed::create(ctx, contracts.seeder, trust, reserve).await?,
        None => debug!(
            "Seeder 0x{:x} of trust {} is not a seed contract",
            contracts.seeder, id
        ),
    }

    let progress = DistributionProgress {
        id: id.clone(),
        trust: id.clone(),
        status: DistributionStatus::Pending,
        start_block: 0,
        end_block: 0,
        minimum_trading_duration: ctx.reads.minimum_trading_duration(trust).await?,
        final_weight: ctx.reads.final_weight(trust).await?,
        final_valuation: ctx.reads.final_valuation(trust).await?,
        pool_reserve_balance: U256::ZERO,
        pool_token_balance: U256::ZERO,
        reserve_init: U256::ZERO,
        minimum_creator_raise: U256::ZERO,
        seeder_fee: U256::ZERO,
        redeem_init: U256::ZERO,
        minimum_raise: U256::ZERO,
        amount_raised: U256::ZERO,
        percent_raised: Ratio::ZERO,
        percent_available: Ratio::ZERO,
    };
    ctx.entities.save(&progress)?;

    ctx.entities.save(&Trust {
        id: id.clone(),
        address: trust,
        deployment: ctx.event.deployment(),
        reserve: contracts.reserve,
        redeemable: contracts.redeemable,
        seeder: contracts.seeder,
        tier: contracts.tier,
        crp: contracts.crp,
        pool: None,
        distribution_progress: id,
        dutch_auction: None,
        notices: Vec::new(),
    })?;

    refresh_progress(ctx, trust).await
}

async fn start_dutch_auction(ctx: &mut HandlerContext<'_>, e: &StartDutchAuction) -> Result<()> {
    let trust_addr = ctx.event.address;
    let mut trust: Trust = ctx.entities.require(&ctx.event.address_id())?;
    let pool_id = address_id(e.pool);

    let pool = ctx.entities.get_or_create(&pool_id, || Pool {
        id: pool_id.clone(),
        address: e.pool,
        trust: trust.id.clone(),
        reserve: trust.reserve,
        token: trust.redeemable,
        final_auction_block: e.final_auction_block,
        swaps: Vec::new(),
        number_of_swaps: 0,
    })?;
    ctx.entities.save(&pool)?;
    register_source(
        &mut ctx.entities,
        e.pool,
        SourceKind::Pool,
        SourceContext::with_address(CONTEXT_TRUST, trust_addr),
        ctx.event.block_number,
    )?;

    trust.pool = Some(pool_id);
    ctx.entities.save(&trust)?;
    refresh_progress(ctx, trust_addr).await
}

async fn end_dutch_auction(ctx: &mut HandlerContext<'_>, e: &EndDutchAuction) -> Result<()> {
    let mut trust: Trust = ctx.entities.require(&ctx.event.address_id())?;
    trust.dutch_auction = Some(DutchAuctionSettlement {
        final_balance: e.final_balance,
        seeder_pay: e.seeder_pay,
        creator_pay: e.creator_pay,
        token_pay: e.token_pay,
        pool_dust: e.pool_dust,
        block: ctx.event.block_number,
    });
    ctx.entities.save(&trust)?;
    let trust_addr = ctx.event.address;
    refresh_progress(ctx, trust_addr).await
}

/// Re-read a trust's distribution progress and recompute derived fields.
///
/// Before trading starts the derived fields are reset to zero. While
/// trading, `amount_raised`, `percent_raised` and `percent_available` are
/// recomputed. Once the distribution is terminal the last computed values
/// are kept.
pub async fn refresh_progress(ctx: &mut HandlerContext<'_>, trust_addr: Address) -> Result<()> {
    let trust: Trust = ctx.entities.require(&address_id(trust_addr))?;
    let mut progress: DistributionProgress = ctx.entities.require(&trust.distribution_progress)?;
    let view = ctx.reads.distribution_progress(trust_addr).await?;
    let status = DistributionStatus::from_code(view.status)?;

    progress.status = status;
    progress.start_block = view.start_block;
    progress.end_block = view.end_block;
    progress.pool_reserve_balance = view.pool_reserve_balance;
    progress.pool_token_balance = view.pool_token_balance;
    progress.reserve_init = view.reserve_init;
    progress.minimum_creator_raise = view.minimum_creator_raise;
    progress.seeder_fee = view.seeder_fee;
    progress.redeem_init = view.redeem_init;
    progress.minimum_raise = view
        .minimum_creator_raise
        .saturating_add(view.redeem_init)
        .saturating_add(view.seeder_fee);

    if !status.has_started() {
        progress.amount_raised = U256::ZERO;
        progress.percent_raised = Ratio::ZERO;
        progress.percent_available = Ratio::ZERO;
    } else if !status.is_terminal() {
        match view.pool_reserve_balance.checked_sub(view.reserve_init) {
            Some(raised) => progress.amount_raised = raised,
            None => warn!(
                "Trust {}: pool reserve {} below reserve init {}, keeping amount raised",
                trust.id, view.pool_reserve_balance, view.reserve_init
            ),
        }

        if progress.minimum_raise == U256::ZERO {
            progress.percent_raised = Ratio::hundred_percent();
        } else if let Some(percent) = Ratio::percent(progress.amount_raised, progress.minimum_raise) {
            progress.percent_raised = percent;
        }

        if trust.redeemable != Address::ZERO {
            let supply = ctx.reads.total_supply(trust.redeemable).await?;
            match Ratio::percent(view.pool_token_balance, supply) {
                Some(percent) => progress.percent_available = percent,
                None => debug!(
                    "Trust {}: redeemable supply is zero, keeping percent available",
                    trust.id
                ),
            }
        }
    }

    debug!(
        "Trust {} progress: status={:?} raised={} ({}%)",
        trust.id, progress.status, progress.amount_raised, progress.percent_raised
    );
    ctx.entities.save(&progress)
}

impl notice::HasNotices for Trust {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}
