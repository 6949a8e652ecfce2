//! Read-through ERC20 metadata snapshots
//!
//! Reserve assets, staked tokens and escrowed tokens are arbitrary
//! user-supplied addresses, so every read here is fallible and a revert
//! leaves the field unset. The snapshot is taken once, on first sight.

use crate::dispatch::HandlerContext;
use crate::keys::address_id;
use crate::records::Erc20;
use alloy_primitives::Address;
use anyhow::Result;
use tracing::debug;

/// Ensure an `Erc20` snapshot exists for `token`, returning its id.
pub async fn snapshot(ctx: &mut HandlerContext<'_>, token: Address) -> Result<String> {
    let id = address_id(token);
    if ctx.entities.exists::<Erc20>(&id)? {
        return Ok(id);
    }

    let erc20 = Erc20 {
        id: id.clone(),
        address: token,
        name: ctx.reads.try_name(token).await?,
        symbol: ctx.reads.try_symbol(token).await?,
        decimals: ctx.reads.try_decimals(token).await?,
        total_supply: ctx.reads.try_total_supply(token).await?,
    };
    debug!(
        "Snapshot ERC20 {} (name={:?}, symbol={:?}, decimals={:?})",
        id, erc20.name, erc20.symbol, erc20.decimals
    );
    ctx.entities.save(&erc20)?;
    Ok(id)
}
