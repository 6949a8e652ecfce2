//! Tier contracts and per-account tier changes

use crate::dispatch::HandlerContext;
use crate::handlers::{erc20, notice};
use crate::keys::{address_id, pair_id};
use crate::lists::{append_log, append_unique};
use crate::records::{Tier, TierAccount, TierChange};
use crate::sources::TierKind;
use crate::types::{TierChangeParams, TierEvent, TierInitialize};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::debug;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &TierEvent) -> Result<()> {
    match event {
        TierEvent::Initialize(e) => initialize(ctx, e).await,
        TierEvent::TierChange(e) => tier_change(ctx, e),
    }
}

/// Create a tier contract. Every kind except `CombineTier` publishes its
/// thresholds through `tierValues()`.
pub async fn create(ctx: &mut HandlerContext<'_>, tier: Address, kind: TierKind) -> Result<()> {
    let id = address_id(tier);
    if ctx.entities.exists::<Tier>(&id)? {
        return Ok(());
    }
    let tier_values = match kind {
        TierKind::CombineTier => Vec::new(),
        _ => ctx.reads.tier_values(tier).await?,
    };
    ctx.entities.save(&Tier {
        id,
        address: tier,
        kind,
        deployment: ctx.event.deployment(),
        tier_values,
        token: None,
        changes: Vec::new(),
        accounts: Vec::new(),
        notices: Vec::new(),
    })
}

async fn initialize(ctx: &mut HandlerContext<'_>, e: &TierInitialize) -> Result<()> {
    let mut tier: Tier = ctx.entities.require(&ctx.event.address_id())?;
    if let Some(token) = e.token {
        tier.token = Some(erc20::snapshot(ctx, token).await?);
    }
    ctx.entities.save(&tier)
}

fn tier_change(ctx: &mut HandlerContext<'_>, e: &TierChangeParams) -> Result<()> {
    let mut tier: Tier = ctx.entities.require(&ctx.event.address_id())?;
    let change = TierChange {
        id: ctx.event.log_id(),
        tier: tier.id.clone(),
        sender: e.sender,
        account: e.account,
        start_tier: e.start_tier,
        end_tier: e.end_tier,
        emitted: ctx.event.emitted(),
    };
    ctx.entities.save(&change)?;

    let account_id = pair_id(tier.address, e.account);
    let mut account = ctx.entities.get_or_create(&account_id, || TierAccount {
        id: account_id.clone(),
        tier: tier.id.clone(),
        address: e.account,
        current_tier: U256::ZERO,
        changes: Vec::new(),
    })?;
    account.current_tier = e.end_tier;
    account.changes = append_log(&account.changes, &change.id);
    ctx.entities.save(&account)?;

    tier.changes = append_log(&tier.changes, &change.id);
    tier.accounts = append_unique(&tier.accounts, &account_id);
    debug!(
        "Tier {}: 0x{:x} {} -> {}",
        tier.id, e.account, e.start_tier, e.end_tier
    );
    ctx.entities.save(&tier)
}

impl notice::HasNotices for Tier {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}
