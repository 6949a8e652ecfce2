//! Sales: configuration, lifecycle and buy/refund receipts

use crate::dispatch::HandlerContext;
use crate::entity::EntityKind;
use crate::error::{checked_decrease, checked_increase, ProjectionError};
use crate::handlers::{erc20, notice, redeemable};
use crate::keys::{address_id, pair_id};
use crate::lists::{append_log, append_unique};
use crate::records::{
    one_ether, Ratio, RedeemableErc20, Sale, SaleBuy, SaleFeeRecipient, SaleReceipt, SaleRefund,
    SaleStatus,
};
use crate::sources::CONTEXT_SALE;
use crate::types::{SaleEnd, SaleEvent, SaleInitialize, SaleReceiptEvent};
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use tracing::debug;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &SaleEvent) -> Result<()> {
    match event {
        SaleEvent::Initialize(e) => initialize(ctx, e).await,
        SaleEvent::Start(_) => start(ctx),
        SaleEvent::End(e) => end(ctx, e),
        SaleEvent::Buy(e) => buy(ctx, e).await,
        SaleEvent::Refund(e) => refund(ctx, e).await,
    }
}

/// Create a sale discovered by its factory. Configuration arrives later
/// with `Initialize`.
pub fn create(ctx: &mut HandlerContext<'_>, sale: Address) -> Result<()> {
    let id = address_id(sale);
    if ctx.entities.exists::<Sale>(&id)? {
        return Ok(());
    }
    ctx.entities.save(&Sale {
        id,
        address: sale,
        deployment: ctx.event.deployment(),
        status: SaleStatus::Pending,
        recipient: None,
        reserve: None,
        token: None,
        cooldown_duration: U256::ZERO,
        minimum_raise: U256::ZERO,
        dust_size: U256::ZERO,
        total_raised: U256::ZERO,
        total_fees: U256::ZERO,
        percent_raised: Ratio::ZERO,
        units_available: None,
        start_block: None,
        end_block: None,
        buys: Vec::new(),
        refunds: Vec::new(),
        fee_recipients: Vec::new(),
        notices: Vec::new(),
    })
}

fn percent_raised(sale: &Sale) -> Ratio {
    if sale.minimum_raise == U256::ZERO {
        return Ratio::hundred_percent();
    }
    Ratio::percent(sale.total_raised, sale.minimum_raise).unwrap_or(sale.percent_raised)
}

async fn initialize(ctx: &mut HandlerContext<'_>, e: &SaleInitialize) -> Result<()> {
    let sale_addr = ctx.event.address;
    let mut sale: Sale = ctx.entities.require(&ctx.event.address_id())?;

    sale.recipient = Some(e.config.recipient);
    sale.cooldown_duration = e.config.cooldown_duration;
    sale.minimum_raise = e.config.minimum_raise;
    sale.dust_size = e.config.dust_size;
    sale.reserve = Some(erc20::snapshot(ctx, e.config.reserve).await?);
    sale.token = Some(redeemable::create(ctx, e.token, CONTEXT_SALE, sale_addr).await?);
    sale.units_available = Some(ctx.reads.balance_of(e.token, sale_addr).await?);
    sale.percent_raised = percent_raised(&sale);

    debug!(
        "Sale {} initialized: minimum raise {}, token {:?}",
        sale.id, sale.minimum_raise, sale.token
    );
    ctx.entities.save(&sale)
}

fn start(ctx: &mut HandlerContext<'_>) -> Result<()> {
    let mut sale: Sale = ctx.entities.require(&ctx.event.address_id())?;
    sale.status = SaleStatus::Active;
    sale.start_block = Some(ctx.event.block_number);
    ctx.entities.save(&sale)
}

/// A sale only ends in `Success` or `Fail`.
fn end(ctx: &mut HandlerContext<'_>, e: &SaleEnd) -> Result<()> {
    let mut sale: Sale = ctx.entities.require(&ctx.event.address_id())?;
    let status = SaleStatus::from_code(e.sale_status)?;
    if !status.is_terminal() {
        return Err(ProjectionError::InvalidStatus {
            what: "sale end",
            code: e.sale_status,
        }
        .into());
    }
    sale.status = status;
    sale.end_block = Some(ctx.event.block_number);
    ctx.entities.save(&sale)
}

fn receipt(sale: &Sale, e: &SaleReceiptEvent) -> Result<SaleReceipt> {
    let r = &e.receipt;
    let cost = r
        .units
        .checked_mul(r.price)
        .with_context(|| format!("Sale {}: receipt {} cost overflows", sale.id, r.id))?
        / one_ether();
    Ok(SaleReceipt {
        account: e.sender,
        receipt_id: r.id,
        fee_recipient: pair_id(sale.address, r.fee_recipient),
        fee: r.fee,
        units: r.units,
        price: r.price,
        cost,
    })
}

/// Re-read the sale's unsold token balance.
async fn refresh_units_available(ctx: &mut HandlerContext<'_>, sale: &mut Sale) -> Result<()> {
    let token_id = sale
        .token
        .clone()
        .with_context(|| format!("Sale {} has no token before initialize", sale.id))?;
    let token: RedeemableErc20 = ctx.entities.require(&token_id)?;
    sale.units_available = Some(ctx.reads.balance_of(token.address, sale.address).await?);
    Ok(())
}

async fn buy(ctx: &mut HandlerContext<'_>, e: &SaleReceiptEvent) -> Result<()> {
    let mut sale: Sale = ctx.entities.require(&ctx.event.address_id())?;
    let receipt = receipt(&sale, e)?;
    let log = SaleBuy {
        id: ctx.event.log_id(),
        sale: sale.id.clone(),
        receipt,
        emitted: ctx.event.emitted(),
    };

    let fee_id = log.receipt.fee_recipient.clone();
    let mut recipient = ctx.entities.get_or_create(&fee_id, || SaleFeeRecipient {
        id: fee_id.clone(),
        sale: sale.id.clone(),
        address: e.receipt.fee_recipient,
        total_fees: U256::ZERO,
        buys: Vec::new(),
        refunds: Vec::new(),
    })?;
    recipient.total_fees = checked_increase(
        recipient.total_fees,
        log.receipt.fee,
        EntityKind::SaleFeeRecipient,
        &fee_id,
        "total_fees",
    )?;
    recipient.buys = append_log(&recipient.buys, &log.id);
    ctx.entities.save(&recipient)?;

    sale.total_raised = checked_increase(
        sale.total_raised,
        log.receipt.cost,
        EntityKind::Sale,
        &sale.id,
        "total_raised",
    )?;
    sale.total_fees = checked_increase(
        sale.total_fees,
        log.receipt.fee,
        EntityKind::Sale,
        &sale.id,
        "total_fees",
    )?;
    sale.buys = append_log(&sale.buys, &log.id);
    sale.fee_recipients = append_unique(&sale.fee_recipients, &fee_id);
    sale.percent_raised = percent_raised(&sale);
    refresh_units_available(ctx, &mut sale).await?;

    ctx.entities.save(&log)?;
    ctx.entities.save(&sale)
}

async fn refund(ctx: &mut HandlerContext<'_>, e: &SaleReceiptEvent) -> Result<()> {
    let mut sale: Sale = ctx.entities.require(&ctx.event.address_id())?;
    let receipt = receipt(&sale, e)?;
    let log = SaleRefund {
        id: ctx.event.log_id(),
        sale: sale.id.clone(),
        receipt,
        emitted: ctx.event.emitted(),
    };

    let fee_id = log.receipt.fee_recipient.clone();
    let mut recipient: SaleFeeRecipient = ctx.entities.require(&fee_id)?;
    recipient.total_fees = checked_decrease(
        recipient.total_fees,
        log.receipt.fee,
        EntityKind::SaleFeeRecipient,
        &fee_id,
        "total_fees",
    )?;
    recipient.refunds = append_log(&recipient.refunds, &log.id);
    ctx.entities.save(&recipient)?;

    sale.total_raised = checked_decrease(
        sale.total_raised,
        log.receipt.cost,
        EntityKind::Sale,
        &sale.id,
        "total_raised",
    )?;
    sale.total_fees = checked_decrease(
        sale.total_fees,
        log.receipt.fee,
        EntityKind::Sale,
        &sale.id,
        "total_fees",
    )?;
    sale.refunds = append_log(&sale.refunds, &log.id);
    sale.percent_raised = percent_raised(&sale);
    refresh_units_available(ctx, &mut sale).await?;

    ctx.entities.save(&log)?;
    ctx.entities.save(&sale)
}

impl notice::HasNotices for Sale {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}
