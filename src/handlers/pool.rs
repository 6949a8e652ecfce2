//! Balancer pool swaps

use crate::dispatch::HandlerContext;
use crate::handlers::trust;
use crate::lists::append_log;
use crate::records::{Pool, Swap};
use crate::sources::CONTEXT_TRUST;
use crate::types::{PoolEvent, PoolSwap};
use anyhow::Result;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &PoolEvent) -> Result<()> {
    match event {
        PoolEvent::Swap(e) => swap(ctx, e).await,
    }
}

async fn swap(ctx: &mut HandlerContext<'_>, e: &PoolSwap) -> Result<()> {
    let mut pool: Pool = ctx.entities.require(&ctx.event.address_id())?;
    let swap = Swap {
        id: ctx.event.log_id(),
        pool: pool.id.clone(),
        trust: pool.trust.clone(),
        caller: e.caller,
        token_in: e.token_in,
        token_out: e.token_out,
        token_amount_in: e.token_amount_in,
        token_amount_out: e.token_amount_out,
        emitted: ctx.event.emitted(),
    };
    ctx.entities.save(&swap)?;

    pool.swaps = append_log(&pool.swaps, &swap.id);
    pool.number_of_swaps += 1;
    ctx.entities.save(&pool)?;

    let trust = ctx.event.parent(CONTEXT_TRUST)?;
    trust::refresh_progress(ctx, trust).await
}
