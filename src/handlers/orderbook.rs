//! Order book vault deposits and withdrawals

use crate::dispatch::HandlerContext;
use crate::entity::EntityKind;
use crate::error::{checked_decrease, checked_increase};
use crate::handlers::erc20;
use crate::keys::{token_vault_id, vault_id};
use crate::lists::{append_log, append_unique};
use crate::records::{TokenVault, Vault, VaultAction, VaultLog};
use crate::types::{OrderBookEvent, VaultConfig, VaultDeposit, VaultWithdraw};
use alloy_primitives::{Address, U256};
use anyhow::Result;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &OrderBookEvent) -> Result<()> {
    match event {
        OrderBookEvent::Deposit(e) => deposit(ctx, e).await,
        OrderBookEvent::Withdraw(e) => withdraw(ctx, e).await,
    }
}

/// Load or create the owner's vault and its per-token vault.
async fn load_vaults(
    ctx: &mut HandlerContext<'_>,
    owner: Address,
    config: &VaultConfig,
) -> Result<(Vault, TokenVault)> {
    let token = erc20::snapshot(ctx, config.token).await?;
    let id = vault_id(config.vault_id, owner);
    let vault = ctx.entities.get_or_create(&id, || Vault {
        id: id.clone(),
        vault_id: config.vault_id,
        owner,
        token_vaults: Vec::new(),
        transfers: Vec::new(),
    })?;
    let token_id = token_vault_id(config.vault_id, owner, config.token);
    let token_vault = ctx.entities.get_or_create(&token_id, || TokenVault {
        id: token_id.clone(),
        vault: id.clone(),
        vault_id: config.vault_id,
        owner,
        token,
        balance: U256::ZERO,
        transfers: Vec::new(),
    })?;
    Ok((vault, token_vault))
}

fn record(
    ctx: &mut HandlerContext<'_>,
    mut vault: Vault,
    mut token_vault: TokenVault,
    entry: VaultLog,
) -> Result<()> {
    ctx.entities.save(&entry)?;
    token_vault.transfers = append_log(&token_vault.transfers, &entry.id);
    ctx.entities.save(&token_vault)?;
    vault.transfers = append_log(&vault.transfers, &entry.id);
    vault.token_vaults = append_unique(&vault.token_vaults, &token_vault.id);
    ctx.entities.save(&vault)
}

async fn deposit(ctx: &mut HandlerContext<'_>, e: &VaultDeposit) -> Result<()> {
    let (vault, mut token_vault) = load_vaults(ctx, e.sender, &e.config).await?;
    token_vault.balance = checked_increase(
        token_vault.balance,
        e.config.amount,
        EntityKind::TokenVault,
        &token_vault.id,
        "balance",
    )?;
    let entry = VaultLog {
        id: ctx.event.log_id(),
        vault: vault.id.clone(),
        token_vault: token_vault.id.clone(),
        action: VaultAction::Deposit,
        sender: e.sender,
        token: e.config.token,
        requested: e.config.amount,
        amount: e.config.amount,
        emitted: ctx.event.emitted(),
    };
    record(ctx, vault, token_vault, entry)
}

/// A withdrawal asks for `config.amount` and receives `amount`, which the
/// contract caps at the vault balance.
async fn withdraw(ctx: &mut HandlerContext<'_>, e: &VaultWithdraw) -> Result<()> {
    let (vault, mut token_vault) = load_vaults(ctx, e.sender, &e.config).await?;
    token_vault.balance = checked_decrease(
        token_vault.balance,
        e.amount,
        EntityKind::TokenVault,
        &token_vault.id,
        "balance",
    )?;
    let entry = VaultLog {
        id: ctx.event.log_id(),
        vault: vault.id.clone(),
        token_vault: token_vault.id.clone(),
        action: VaultAction::Withdraw,
        sender: e.sender,
        token: e.config.token,
        requested: e.config.amount,
        amount: e.amount,
        emitted: ctx.event.emitted(),
    };
    record(ctx, vault, token_vault, entry)
}
