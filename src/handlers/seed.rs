//! Seed tokens funding a trust's reserve
//!
//! Seed totals and holder balances are netted from event amounts, so an
//! unseed that would take a total below zero means an event was missed and
//! fails.

use crate::dispatch::HandlerContext;
use crate::entity::EntityKind;
use crate::error::{checked_decrease, checked_increase};
use crate::handlers::{holders, notice, trust};
use crate::keys::address_id;
use crate::lists::{append_log, append_unique};
use crate::records::{Ratio, SeedAction, SeedErc20, SeedLog};
use crate::sources::{register_source, SourceContext, SourceKind, CONTEXT_TRUST};
use crate::types::{SeedErc20Event, SeedParams, SeedRedeemParams, Transfer, UnseedParams};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::{debug, warn};

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &SeedErc20Event) -> Result<()> {
    match event {
        SeedErc20Event::Transfer(e) => transfer(ctx, e),
        SeedErc20Event::Seed(e) => seed(ctx, e).await,
        SeedErc20Event::Unseed(e) => unseed(ctx, e).await,
        SeedErc20Event::Redeem(e) => redeem(ctx, e),
    }
}

/// Create the seed token of `trust` and register it as a source.
///
/// The seeder is chosen by the trust's creator, so its metadata is read
/// with the fallible calls and left unset when it does not answer.
pub async fn create(
    ctx: &mut HandlerContext<'_>,
    seeder: Address,
    trust: Address,
    reserve: Address,
) -> Result<()> {
    let id = address_id(seeder);
    if ctx.entities.exists::<SeedErc20>(&id)? {
        return Ok(());
    }

    let seeder_units = ctx.reads.try_total_supply(seeder).await?;
    ctx.entities.save(&SeedErc20 {
        id: id.clone(),
        address: seeder,
        trust: address_id(trust),
        reserve: Some(reserve),
        name: ctx.reads.try_name(seeder).await?,
        symbol: ctx.reads.try_symbol(seeder).await?,
        decimals: ctx.reads.try_decimals(seeder).await?,
        seeder_units,
        seeded_units: U256::ZERO,
        seeded_amount: U256::ZERO,
        percent_seeded: Ratio::ZERO,
        holders: Vec::new(),
        seeds: Vec::new(),
        unseeds: Vec::new(),
        redeems: Vec::new(),
        notices: Vec::new(),
    })?;
    debug!(
        "Created seed {} for trust {} ({:?} units)",
        id,
        address_id(trust),
        seeder_units
    );

    let block = ctx.event.block_number;
    register_source(
        &mut ctx.entities,
        seeder,
        SourceKind::SeedErc20,
        SourceContext::with_address(CONTEXT_TRUST, trust),
        block,
    )?;
    Ok(())
}

fn transfer(ctx: &mut HandlerContext<'_>, e: &Transfer) -> Result<()> {
    let seed_addr = ctx.event.address;
    let mut seed: SeedErc20 = ctx.entities.require(&ctx.event.address_id())?;

    if e.from != Address::ZERO {
        holders::debit(&mut ctx.entities, seed_addr, e.from, e.value)?;
    }
    if e.to != Address::ZERO {
        let holder = holders::credit(&mut ctx.entities, seed_addr, e.to, e.value)?;
        seed.holders = append_unique(&seed.holders, &holder);
    }
    ctx.entities.save(&seed)
}

fn log(ctx: &HandlerContext<'_>, action: SeedAction, account: Address, units: U256, reserve_amount: U256) -> SeedLog {
    SeedLog {
        id: ctx.event.log_id(),
        seed_erc20: ctx.event.address_id(),
        action,
        account,
        units,
        reserve_amount,
        emitted: ctx.event.emitted(),
    }
}

/// Recompute the share of seed units sold from the contract's own balance.
///
/// Kept as is when the seeder's supply or balance is unknown.
async fn refresh_percent_seeded(ctx: &mut HandlerContext<'_>, seed: &mut SeedErc20) -> Result<()> {
    let Some(seeder_units) = seed.seeder_units else {
        return Ok(());
    };
    let Some(unsold) = ctx.reads.try_balance_of(seed.address, seed.address).await? else {
        debug!("Seed {}: balanceOf unavailable, keeping percent seeded", seed.id);
        return Ok(());
    };
    match seeder_units.checked_sub(unsold) {
        Some(sold) => {
            if let Some(percent) = Ratio::percent(sold, seeder_units) {
                seed.percent_seeded = percent;
            }
        }
        None => warn!(
            "Seed {}: unsold balance {} exceeds seeder units {}, keeping percent seeded",
            seed.id, unsold, seeder_units
        ),
    }
    Ok(())
}

async fn seed(ctx: &mut HandlerContext<'_>, e: &SeedParams) -> Result<()> {
    let mut seed: SeedErc20 = ctx.entities.require(&ctx.event.address_id())?;
    let entry = log(ctx, SeedAction::Seed, e.sender, e.tokens_seeded, e.reserve_received);
    ctx.entities.save(&entry)?;

    seed.seeded_units = checked_increase(
        seed.seeded_units,
        e.tokens_seeded,
        EntityKind::SeedErc20,
        &seed.id,
        "seeded_units",
    )?;
    seed.seeded_amount = checked_increase(
        seed.seeded_amount,
        e.reserve_received,
        EntityKind::SeedErc20,
        &seed.id,
        "seeded_amount",
    )?;
    seed.seeds = append_log(&seed.seeds, &entry.id);
    refresh_percent_seeded(ctx, &mut seed).await?;
    ctx.entities.save(&seed)?;

    let trust = ctx.event.parent(CONTEXT_TRUST)?;
    trust::refresh_progress(ctx, trust).await
}

async fn unseed(ctx: &mut HandlerContext<'_>, e: &UnseedParams) -> Result<()> {
    let mut seed: SeedErc20 = ctx.entities.require(&ctx.event.address_id())?;
    let entry = log(ctx, SeedAction::Unseed, e.sender, e.tokens_unseeded, e.reserve_returned);
    ctx.entities.save(&entry)?;

    seed.seeded_units = checked_decrease(
        seed.seeded_units,
        e.tokens_unseeded,
        EntityKind::SeedErc20,
        &seed.id,
        "seeded_units",
    )?;
    seed.seeded_amount = checked_decrease(
        seed.seeded_amount,
        e.reserve_returned,
        EntityKind::SeedErc20,
        &seed.id,
        "seeded_amount",
    )?;
    seed.unseeds = append_log(&seed.unseeds, &entry.id);
    refresh_percent_seeded(ctx, &mut seed).await?;
    ctx.entities.save(&seed)?;

    let trust = ctx.event.parent(CONTEXT_TRUST)?;
    trust::refresh_progress(ctx, trust).await
}

fn redeem(ctx: &mut HandlerContext<'_>, e: &SeedRedeemParams) -> Result<()> {
    let mut seed: SeedErc20 = ctx.entities.require(&ctx.event.address_id())?;
    let entry = log(ctx, SeedAction::Redeem, e.sender, e.redeem_amount, e.reserve_received);
    ctx.entities.save(&entry)?;
    seed.redeems = append_log(&seed.redeems, &entry.id);
    ctx.entities.save(&seed)
}

impl notice::HasNotices for SeedErc20 {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}
