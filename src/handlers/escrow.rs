//! Redeemable ERC20 claim escrow
//!
//! Deposits are tracked three ways: per depositor, per
//! (sale, supply snapshot, token) aggregate, and per (depositor, token)
//! pending aggregate. Logs are never rewritten; undeposits and withdrawals
//! only move the aggregate totals.

use crate::dispatch::HandlerContext;
use crate::entity::EntityKind;
use crate::error::{checked_decrease, checked_increase};
use crate::handlers::{erc20, notice};
use crate::keys::{address_id, pair_id, pending_aggregate_id, supply_aggregate_id};
use crate::lists::{append_log, append_unique};
use crate::records::{
    ClaimEscrow, DistributionProgress, EscrowAction, EscrowDepositor, EscrowLog,
    EscrowPendingDepositorToken, EscrowSupplyTokenDeposit, EscrowWithdrawer, Sale, SaleStatus,
};
use crate::types::{ClaimEscrowEvent, EscrowTransfer, PendingDeposit};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::debug;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &ClaimEscrowEvent) -> Result<()> {
    match event {
        ClaimEscrowEvent::PendingDeposit(e) => pending_deposit(ctx, e).await,
        ClaimEscrowEvent::Deposit(e) => deposit(ctx, e).await,
        ClaimEscrowEvent::Undeposit(e) => undeposit(ctx, e).await,
        ClaimEscrowEvent::Withdraw(e) => withdraw(ctx, e).await,
    }
}

fn load_escrow(ctx: &HandlerContext<'_>) -> Result<ClaimEscrow> {
    let id = ctx.event.address_id();
    ctx.entities.get_or_create(&id, || ClaimEscrow {
        id: id.clone(),
        address: ctx.event.address,
        deposits: Vec::new(),
        pending_deposits: Vec::new(),
        undeposits: Vec::new(),
        withdraws: Vec::new(),
        depositors: Vec::new(),
        withdrawers: Vec::new(),
        notices: Vec::new(),
    })
}

fn load_depositor(ctx: &HandlerContext<'_>, depositor: Address) -> Result<EscrowDepositor> {
    let id = pair_id(ctx.event.address, depositor);
    ctx.entities.get_or_create(&id, || EscrowDepositor {
        id: id.clone(),
        escrow: ctx.event.address_id(),
        address: depositor,
        deposits: Vec::new(),
        pending_deposits: Vec::new(),
        undeposits: Vec::new(),
    })
}

#[allow(clippy::too_many_arguments)]
fn escrow_log(
    ctx: &HandlerContext<'_>,
    action: EscrowAction,
    account: Address,
    sale: Address,
    redeemable: Address,
    token: &str,
    supply: Option<U256>,
    amount: U256,
) -> EscrowLog {
    EscrowLog {
        id: ctx.event.log_id(),
        escrow: ctx.event.address_id(),
        action,
        account,
        sale,
        redeemable,
        token: token.to_string(),
        supply,
        amount,
        emitted: ctx.event.emitted(),
    }
}

/// Whether the sale (or trust) behind `sale` has reached a final status.
///
/// Indexed sales and trusts answer from the store. Anything else is asked
/// through a fallible `saleStatus()` read, and an unreadable status counts
/// as not final.
async fn sale_is_terminal(ctx: &HandlerContext<'_>, sale: Address) -> Result<bool> {
    let id = address_id(sale);
    if let Some(sale) = ctx.entities.load::<Sale>(&id)? {
        return Ok(sale.status.is_terminal());
    }
    if let Some(progress) = ctx.entities.load::<DistributionProgress>(&id)? {
        return Ok(progress.status.is_terminal());
    }
    match ctx.reads.try_sale_status(sale).await? {
        Some(code) => match SaleStatus::from_code(code) {
            Ok(status) => Ok(status.is_terminal()),
            Err(e) => {
                debug!("Escrow sale {}: {}", id, e);
                Ok(false)
            }
        },
        None => Ok(false),
    }
}

async fn pending_deposit(ctx: &mut HandlerContext<'_>, e: &PendingDeposit) -> Result<()> {
    let mut escrow = load_escrow(ctx)?;
    let token = erc20::snapshot(ctx, e.token).await?;
    let entry = escrow_log(
        ctx,
        EscrowAction::PendingDeposit,
        e.sender,
        e.sale,
        e.redeemable,
        &token,
        None,
        e.amount,
    );
    ctx.entities.save(&entry)?;

    let mut depositor = load_depositor(ctx, e.sender)?;
    depositor.pending_deposits = append_log(&depositor.pending_deposits, &entry.id);
    ctx.entities.save(&depositor)?;

    let pending_id = pending_aggregate_id(escrow.address, e.sender, e.token);
    let mut pending = ctx.entities.get_or_create(&pending_id, || EscrowPendingDepositorToken {
        id: pending_id.clone(),
        escrow: escrow.id.clone(),
        sale: e.sale,
        depositor: e.sender,
        token: token.clone(),
        total_deposited: U256::ZERO,
        swept: false,
        pending_deposits: Vec::new(),
    })?;
    pending.total_deposited = checked_increase(
        pending.total_deposited,
        e.amount,
        EntityKind::EscrowPendingDepositorToken,
        &pending_id,
        "total_deposited",
    )?;
    pending.pending_deposits = append_log(&pending.pending_deposits, &entry.id);
    ctx.entities.save(&pending)?;

    escrow.pending_deposits = append_log(&escrow.pending_deposits, &entry.id);
    escrow.depositors = append_unique(&escrow.depositors, &depositor.id);
    ctx.entities.save(&escrow)
}

async fn deposit(ctx: &mut HandlerContext<'_>, e: &EscrowTransfer) -> Result<()> {
    let mut escrow = load_escrow(ctx)?;
    let token = erc20::snapshot(ctx, e.token).await?;
    let entry = escrow_log(
        ctx,
        EscrowAction::Deposit,
        e.sender,
        e.sale,
        e.redeemable,
        &token,
        Some(e.supply),
        e.amount,
    );
    ctx.entities.save(&entry)?;

    let mut depositor = load_depositor(ctx, e.sender)?;
    depositor.deposits = append_log(&depositor.deposits, &entry.id);
    ctx.entities.save(&depositor)?;

    let aggregate_id = supply_aggregate_id(escrow.address, e.sale, e.supply, e.token);
    let mut aggregate = ctx.entities.get_or_create(&aggregate_id, || EscrowSupplyTokenDeposit {
        id: aggregate_id.clone(),
        escrow: escrow.id.clone(),
        sale: e.sale,
        token: token.clone(),
        supply: e.supply,
        total_deposited: U256::ZERO,
        total_remaining: U256::ZERO,
        total_withdrawn: U256::ZERO,
        deposits: Vec::new(),
        undeposits: Vec::new(),
        withdraws: Vec::new(),
    })?;
    let kind = EntityKind::EscrowSupplyTokenDeposit;
    aggregate.total_deposited =
        checked_increase(aggregate.total_deposited, e.amount, kind, &aggregate_id, "total_deposited")?;
    aggregate.total_remaining =
        checked_increase(aggregate.total_remaining, e.amount, kind, &aggregate_id, "total_remaining")?;
    aggregate.deposits = append_log(&aggregate.deposits, &entry.id);
    ctx.entities.save(&aggregate)?;

    let pending_id = pending_aggregate_id(escrow.address, e.sender, e.token);
    if let Some(mut pending) = ctx.entities.load::<EscrowPendingDepositorToken>(&pending_id)? {
        if !pending.swept && sale_is_terminal(ctx, e.sale).await? {
            debug!("Escrow {}: pending deposits {} swept", escrow.id, pending_id);
            pending.swept = true;
            ctx.entities.save(&pending)?;
        }
    }

    escrow.deposits = append_log(&escrow.deposits, &entry.id);
    escrow.depositors = append_unique(&escrow.depositors, &depositor.id);
    ctx.entities.save(&escrow)
}

async fn undeposit(ctx: &mut HandlerContext<'_>, e: &EscrowTransfer) -> Result<()> {
    let mut escrow = load_escrow(ctx)?;
    let token = erc20::snapshot(ctx, e.token).await?;
    let entry = escrow_log(
        ctx,
        EscrowAction::Undeposit,
        e.sender,
        e.sale,
        e.redeemable,
        &token,
        Some(e.supply),
        e.amount,
    );
    ctx.entities.save(&entry)?;

    let mut depositor = load_depositor(ctx, e.sender)?;
    depositor.undeposits = append_log(&depositor.undeposits, &entry.id);
    ctx.entities.save(&depositor)?;

    let aggregate_id = supply_aggregate_id(escrow.address, e.sale, e.supply, e.token);
    let mut aggregate: EscrowSupplyTokenDeposit = ctx.entities.require(&aggregate_id)?;
    let kind = EntityKind::EscrowSupplyTokenDeposit;
    aggregate.total_deposited =
        checked_decrease(aggregate.total_deposited, e.amount, kind, &aggregate_id, "total_deposited")?;
    aggregate.total_remaining =
        checked_decrease(aggregate.total_remaining, e.amount, kind, &aggregate_id, "total_remaining")?;
    aggregate.undeposits = append_log(&aggregate.undeposits, &entry.id);
    ctx.entities.save(&aggregate)?;

    escrow.undeposits = append_log(&escrow.undeposits, &entry.id);
    escrow.depositors = append_unique(&escrow.depositors, &depositor.id);
    ctx.entities.save(&escrow)
}

async fn withdraw(ctx: &mut HandlerContext<'_>, e: &EscrowTransfer) -> Result<()> {
    let mut escrow = load_escrow(ctx)?;
    let token = erc20::snapshot(ctx, e.token).await?;
    let entry = escrow_log(
        ctx,
        EscrowAction::Withdraw,
        e.sender,
        e.sale,
        e.redeemable,
        &token,
        Some(e.supply),
        e.amount,
    );
    ctx.entities.save(&entry)?;

    let withdrawer_id = pair_id(escrow.address, e.sender);
    let mut withdrawer = ctx.entities.get_or_create(&withdrawer_id, || EscrowWithdrawer {
        id: withdrawer_id.clone(),
        escrow: escrow.id.clone(),
        address: e.sender,
        withdraws: Vec::new(),
        total_withdrawn: U256::ZERO,
    })?;
    withdrawer.withdraws = append_log(&withdrawer.withdraws, &entry.id);
    withdrawer.total_withdrawn = checked_increase(
        withdrawer.total_withdrawn,
        e.amount,
        EntityKind::EscrowWithdrawer,
        &withdrawer_id,
        "total_withdrawn",
    )?;
    ctx.entities.save(&withdrawer)?;

    let aggregate_id = supply_aggregate_id(escrow.address, e.sale, e.supply, e.token);
    let mut aggregate: EscrowSupplyTokenDeposit = ctx.entities.require(&aggregate_id)?;
    let kind = EntityKind::EscrowSupplyTokenDeposit;
    aggregate.total_remaining =
        checked_decrease(aggregate.total_remaining, e.amount, kind, &aggregate_id, "total_remaining")?;
    aggregate.total_withdrawn =
        checked_increase(aggregate.total_withdrawn, e.amount, kind, &aggregate_id, "total_withdrawn")?;
    aggregate.withdraws = append_log(&aggregate.withdraws, &entry.id);
    ctx.entities.save(&aggregate)?;

    escrow.withdraws = append_log(&escrow.withdraws, &entry.id);
    escrow.withdrawers = append_unique(&escrow.withdrawers, &withdrawer_id);
    ctx.entities.save(&escrow)
}

impl notice::HasNotices for ClaimEscrow {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectionError;
    use crate::reader::ContractCall;
    use crate::sources::{SourceContext, SourceKind};
    use crate::testing::Harness;
    use crate::types::Event;
    use alloy_primitives::address;

    const ESCROW: Address = address!("00000000000000000000000000000000000000ec");
    const SALE: Address = address!("0000000000000000000000000000000000000051");
    const REDEEMABLE: Address = address!("00000000000000000000000000000000000000e2");
    const TOKEN: Address = address!("00000000000000000000000000000000000000e8");
    const ALICE: Address = address!("00000000000000000000000000000000000000a1");

    fn harness() -> Harness {
        let harness = Harness::new();
        harness.add_source(ESCROW, SourceKind::ClaimEscrow, SourceContext::new());
        harness
    }

    fn transfer(amount: u64) -> EscrowTransfer {
        EscrowTransfer {
            sender: ALICE,
            sale: SALE,
            redeemable: REDEEMABLE,
            token: TOKEN,
            supply: U256::from(1_000u64),
            amount: U256::from(amount),
        }
    }

    fn pending(amount: u64) -> Event {
        Event::ClaimEscrow(ClaimEscrowEvent::PendingDeposit(PendingDeposit {
            sender: ALICE,
            sale: SALE,
            redeemable: REDEEMABLE,
            token: TOKEN,
            amount: U256::from(amount),
        }))
    }

    fn aggregate_id() -> String {
        supply_aggregate_id(ESCROW, SALE, U256::from(1_000u64), TOKEN)
    }

    #[tokio::test]
    async fn test_two_deposits_sum_into_aggregate() {
        let mut harness = harness();
        let first = harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Deposit(transfer(30))))
            .await
            .unwrap();
        let second = harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Deposit(transfer(12))))
            .await
            .unwrap();

        let aggregate: EscrowSupplyTokenDeposit = harness.require(&aggregate_id());
        assert_eq!(aggregate.deposits, vec![first.clone(), second.clone()]);
        assert_eq!(aggregate.total_deposited, U256::from(42u64));
        assert_eq!(aggregate.total_remaining, U256::from(42u64));

        let depositor: EscrowDepositor = harness.require(&pair_id(ESCROW, ALICE));
        assert_eq!(depositor.deposits, vec![first.clone(), second.clone()]);
        let escrow: ClaimEscrow = harness.require(&address_id(ESCROW));
        assert_eq!(escrow.deposits, vec![first, second]);
        assert_eq!(escrow.depositors, vec![depositor.id]);
    }

    #[tokio::test]
    async fn test_undeposit_and_withdraw_move_totals_not_logs() {
        let mut harness = harness();
        let deposit = harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Deposit(transfer(100))))
            .await
            .unwrap();
        harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Undeposit(transfer(20))))
            .await
            .unwrap();
        harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Withdraw(transfer(50))))
            .await
            .unwrap();

        let aggregate: EscrowSupplyTokenDeposit = harness.require(&aggregate_id());
        assert_eq!(aggregate.total_deposited, U256::from(80u64));
        assert_eq!(aggregate.total_remaining, U256::from(30u64));
        assert_eq!(aggregate.total_withdrawn, U256::from(50u64));
        assert_eq!(aggregate.deposits, vec![deposit.clone()]);
        let entry: EscrowLog = harness.require(&deposit);
        assert_eq!(entry.amount, U256::from(100u64));

        let withdrawer: EscrowWithdrawer = harness.require(&pair_id(ESCROW, ALICE));
        assert_eq!(withdrawer.total_withdrawn, U256::from(50u64));

        // Only 30 left
        let err = harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Withdraw(transfer(31))))
            .await
            .unwrap_err();
        assert!(err
            .downcast_ref::<ProjectionError>()
            .map(|e| e.is_data_consistency())
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn test_deposit_after_final_sale_sweeps_pending() {
        let mut harness = harness();
        harness.apply(ESCROW, pending(10)).await.unwrap();
        harness.apply(ESCROW, pending(5)).await.unwrap();

        // Still trading: not swept
        harness
            .reader()
            .respond_u256(SALE, ContractCall::SaleStatus, U256::from(1u64));
        harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Deposit(transfer(15))))
            .await
            .unwrap();
        let pending_id = pending_aggregate_id(ESCROW, ALICE, TOKEN);
        let aggregate: EscrowPendingDepositorToken = harness.require(&pending_id);
        assert_eq!(aggregate.total_deposited, U256::from(15u64));
        assert_eq!(aggregate.pending_deposits.len(), 2);
        assert!(!aggregate.swept);

        harness
            .reader()
            .respond_u256(SALE, ContractCall::SaleStatus, U256::from(2u64));
        harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Deposit(transfer(1))))
            .await
            .unwrap();
        let aggregate: EscrowPendingDepositorToken = harness.require(&pending_id);
        assert!(aggregate.swept);
    }

    #[tokio::test]
    async fn test_unreadable_sale_status_is_not_final() {
        let mut harness = harness();
        harness.apply(ESCROW, pending(10)).await.unwrap();
        harness
            .apply(ESCROW, Event::ClaimEscrow(ClaimEscrowEvent::Deposit(transfer(10))))
            .await
            .unwrap();
        let aggregate: EscrowPendingDepositorToken =
            harness.require(&pending_aggregate_id(ESCROW, ALICE, TOKEN));
        assert!(!aggregate.swept);
    }
}
