//! Per-(token, account) balance records
//!
//! Two update styles coexist. Redeemable tokens re-read `balanceOf` after
//! every transfer ([`refresh`]). Seed and stake tokens net the transferred
//! amount ([`credit`] / [`debit`]); a debit below zero or a credit past
//! `U256::MAX` fails the event.

use crate::dispatch::HandlerContext;
use crate::entity::EntityKind;
use crate::error::{checked_decrease, checked_increase};
use crate::keys::{address_id, pair_id};
use crate::records::Holder;
use crate::txn::EntityTx;
use alloy_primitives::{Address, U256};
use anyhow::Result;

fn new_holder(id: &str, token: Address, account: Address) -> Holder {
    Holder {
        id: id.to_string(),
        token: address_id(token),
        address: account,
        balance: U256::ZERO,
    }
}

/// Add `amount` to the holder's balance, creating the holder if needed.
pub fn credit(
    entities: &mut EntityTx<'_>,
    token: Address,
    account: Address,
    amount: U256,
) -> Result<String> {
    let id = pair_id(token, account);
    let mut holder = entities.get_or_create(&id, || new_holder(&id, token, account))?;
    holder.balance = checked_increase(holder.balance, amount, EntityKind::Holder, &id, "balance")?;
    entities.save(&holder)?;
    Ok(id)
}

/// Subtract `amount` from an existing holder's balance.
pub fn debit(
    entities: &mut EntityTx<'_>,
    token: Address,
    account: Address,
    amount: U256,
) -> Result<String> {
    let id = pair_id(token, account);
    let mut holder: Holder = entities.require(&id)?;
    holder.balance = checked_decrease(holder.balance, amount, EntityKind::Holder, &id, "balance")?;
    entities.save(&holder)?;
    Ok(id)
}

/// Set the holder's balance from a fresh `balanceOf` read.
pub async fn refresh(ctx: &mut HandlerContext<'_>, token: Address, account: Address) -> Result<String> {
    let id = pair_id(token, account);
    let balance = ctx.reads.balance_of(token, account).await?;
    let mut holder = ctx
        .entities
        .get_or_create(&id, || new_holder(&id, token, account))?;
    holder.balance = balance;
    ctx.entities.save(&holder)?;
    Ok(id)
}
