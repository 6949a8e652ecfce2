//! Redeemable ERC20 tokens distributed by trusts and sales
//!
//! Holder balances here are re-read with `balanceOf` after every transfer
//! rather than netted from the transfer amount.

use crate::dispatch::HandlerContext;
use crate::entity::EntityKind;
use crate::error::checked_increase;
use crate::handlers::{erc20, holders, notice};
use crate::keys::{address_id, pair_id};
use crate::lists::{append_log, append_unique};
use crate::records::{Redeem, RedeemableErc20, TreasuryAsset};
use crate::sources::{register_source, SourceContext, SourceKind};
use crate::types::{RedeemableErc20Event, TokenRedeem, Transfer, TreasuryAssetAdded};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::debug;

pub async fn handle(ctx: &mut HandlerContext<'_>, event: &RedeemableErc20Event) -> Result<()> {
    match event {
        RedeemableErc20Event::Transfer(e) => transfer(ctx, e).await,
        RedeemableErc20Event::Redeem(e) => redeem(ctx, e).await,
        RedeemableErc20Event::TreasuryAsset(e) => treasury_asset_added(ctx, e).await,
    }
}

/// Create the token distributed by `parent` and register it as a source,
/// remembering the parent under `context_key`.
///
/// The token is protocol-owned, so its metadata reads are trusting.
pub async fn create(
    ctx: &mut HandlerContext<'_>,
    token: Address,
    context_key: &str,
    parent: Address,
) -> Result<String> {
    let id = address_id(token);
    if ctx.entities.exists::<RedeemableErc20>(&id)? {
        return Ok(id);
    }

    let record = RedeemableErc20 {
        id: id.clone(),
        address: token,
        parent: Some(address_id(parent)),
        name: ctx.reads.name(token).await?,
        symbol: ctx.reads.symbol(token).await?,
        decimals: ctx.reads.decimals(token).await?,
        total_supply: ctx.reads.total_supply(token).await?,
        holders: Vec::new(),
        redeems: Vec::new(),
        treasury_assets: Vec::new(),
        notices: Vec::new(),
    };
    debug!("Created redeemable {} ({}) for {}", id, record.symbol, address_id(parent));
    ctx.entities.save(&record)?;

    let block = ctx.event.block_number;
    register_source(
        &mut ctx.entities,
        token,
        SourceKind::RedeemableErc20,
        SourceContext::with_address(context_key, parent),
        block,
    )?;
    Ok(id)
}

async fn transfer(ctx: &mut HandlerContext<'_>, e: &Transfer) -> Result<()> {
    let token_addr = ctx.event.address;
    let mut token: RedeemableErc20 = ctx.entities.require(&ctx.event.address_id())?;

    for party in [e.from, e.to] {
        if party == Address::ZERO {
            continue;
        }
        let holder = holders::refresh(ctx, token_addr, party).await?;
        token.holders = append_unique(&token.holders, &holder);
    }

    if e.from == Address::ZERO || e.to == Address::ZERO {
        token.total_supply = ctx.reads.total_supply(token_addr).await?;
    }
    ctx.entities.save(&token)
}

/// Load or create the treasury asset record, refreshing its balance.
async fn treasury_asset(
    ctx: &mut HandlerContext<'_>,
    token: Address,
    asset: Address,
) -> Result<TreasuryAsset> {
    let id = pair_id(token, asset);
    let balance = ctx.reads.try_balance_of(asset, token).await?;

    let mut record = match ctx.entities.load::<TreasuryAsset>(&id)? {
        Some(existing) => existing,
        None => {
            let erc20 = erc20::snapshot(ctx, asset).await?;
            TreasuryAsset {
                id: id.clone(),
                token: address_id(token),
                address: asset,
                erc20,
                balance: None,
                redeems: Vec::new(),
                total_redeemed: U256::ZERO,
            }
        }
    };
    if balance.is_some() {
        record.balance = balance;
    }
    Ok(record)
}

async fn redeem(ctx: &mut HandlerContext<'_>, e: &TokenRedeem) -> Result<()> {
    let token_addr = ctx.event.address;
    let mut token: RedeemableErc20 = ctx.entities.require(&ctx.event.address_id())?;
    let mut asset = treasury_asset(ctx, token_addr, e.treasury_asset).await?;

    let log = Redeem {
        id: ctx.event.log_id(),
        token: token.id.clone(),
        redeemer: e.sender,
        treasury_asset: e.treasury_asset,
        redeem_amount: e.redeem_amount,
        asset_amount: e.asset_amount,
        emitted: ctx.event.emitted(),
    };
    ctx.entities.save(&log)?;

    asset.redeems = append_log(&asset.redeems, &log.id);
    asset.total_redeemed = checked_increase(
        asset.total_redeemed,
        e.asset_amount,
        EntityKind::TreasuryAsset,
        &asset.id,
        "total_redeemed",
    )?;
    ctx.entities.save(&asset)?;

    token.redeems = append_log(&token.redeems, &log.id);
    token.treasury_assets = append_unique(&token.treasury_assets, &asset.id);
    ctx.entities.save(&token)
}

async fn treasury_asset_added(ctx: &mut HandlerContext<'_>, e: &TreasuryAssetAdded) -> Result<()> {
    let token_addr = ctx.event.address;
    let mut token: RedeemableErc20 = ctx.entities.require(&ctx.event.address_id())?;
    let asset = treasury_asset(ctx, token_addr, e.asset).await?;
    ctx.entities.save(&asset)?;

    token.treasury_assets = append_unique(&token.treasury_assets, &asset.id);
    ctx.entities.save(&token)
}

impl notice::HasNotices for RedeemableErc20 {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Erc20, Holder};
    use crate::sources::CONTEXT_SALE;
    use crate::testing::Harness;
    use crate::types::Event;
    use alloy_primitives::address;

    const TOKEN: Address = address!("00000000000000000000000000000000000000e2");
    const SALE: Address = address!("0000000000000000000000000000000000000051");
    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b1");
    const ASSET: Address = address!("00000000000000000000000000000000000000a5");

    fn harness_with_token() -> Harness {
        let harness = Harness::new();
        harness.add_source(TOKEN, SourceKind::RedeemableErc20, SourceContext::new());
        let mut tx = crate::txn::EntityTx::new(harness.store());
        tx.save(&RedeemableErc20 {
            id: address_id(TOKEN),
            address: TOKEN,
            parent: Some(address_id(SALE)),
            name: "Raise".to_string(),
            symbol: "RAISE".to_string(),
            decimals: 18,
            total_supply: U256::ZERO,
            holders: Vec::new(),
            redeems: Vec::new(),
            treasury_assets: Vec::new(),
            notices: Vec::new(),
        })
        .unwrap();
        crate::store::EntityStore::commit(harness.store(), tx.into_changes()).unwrap();
        harness
    }

    fn transfer_event(from: Address, to: Address, value: u64) -> Event {
        Event::RedeemableErc20(RedeemableErc20Event::Transfer(Transfer {
            from,
            to,
            value: U256::from(value),
        }))
    }

    #[tokio::test]
    async fn test_transfer_reads_fresh_balances() {
        let mut harness = harness_with_token();
        let reader = harness.reader();
        reader.balance(TOKEN, ALICE, U256::from(1_000u64));
        reader.respond_u256(TOKEN, crate::reader::ContractCall::TotalSupply, U256::from(1_000u64));
        harness.apply(TOKEN, transfer_event(Address::ZERO, ALICE, 1_000)).await.unwrap();

        // The read is authoritative even when it disagrees with the amount
        let reader = harness.reader();
        reader.balance(TOKEN, ALICE, U256::from(690u64));
        reader.balance(TOKEN, BOB, U256::from(300u64));
        harness.apply(TOKEN, transfer_event(ALICE, BOB, 300)).await.unwrap();

        let token: RedeemableErc20 = harness.require(&address_id(TOKEN));
        assert_eq!(token.holders, vec![pair_id(TOKEN, ALICE), pair_id(TOKEN, BOB)]);
        assert_eq!(token.total_supply, U256::from(1_000u64));
        let alice: Holder = harness.require(&pair_id(TOKEN, ALICE));
        assert_eq!(alice.balance, U256::from(690u64));
        let bob: Holder = harness.require(&pair_id(TOKEN, BOB));
        assert_eq!(bob.balance, U256::from(300u64));
    }

    #[tokio::test]
    async fn test_plain_transfer_does_not_read_supply() {
        let mut harness = harness_with_token();
        let reader = harness.reader();
        reader.balance(TOKEN, ALICE, U256::from(1u64));
        reader.balance(TOKEN, BOB, U256::from(1u64));
        harness.apply(TOKEN, transfer_event(ALICE, BOB, 1)).await.unwrap();

        let calls = harness
            .reader()
            .call_count(TOKEN, crate::reader::ContractCall::TotalSupply);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_redeem_accumulates_treasury_asset() {
        let mut harness = harness_with_token();
        harness
            .reader()
            .erc20(ASSET, "Dai", "DAI", 18, U256::from(1_000_000u64));
        harness.reader().balance(ASSET, TOKEN, U256::from(500u64));

        let redeem = |amount: u64| {
            Event::RedeemableErc20(RedeemableErc20Event::Redeem(TokenRedeem {
                sender: ALICE,
                treasury_asset: ASSET,
                redeem_amount: U256::from(amount * 2),
                asset_amount: U256::from(amount),
            }))
        };
        let first = harness.apply(TOKEN, redeem(10)).await.unwrap();
        let second = harness.apply(TOKEN, redeem(15)).await.unwrap();

        let token: RedeemableErc20 = harness.require(&address_id(TOKEN));
        assert_eq!(token.redeems, vec![first.clone(), second.clone()]);
        assert_eq!(token.treasury_assets, vec![pair_id(TOKEN, ASSET)]);

        let asset: TreasuryAsset = harness.require(&pair_id(TOKEN, ASSET));
        assert_eq!(asset.redeems, vec![first, second]);
        assert_eq!(asset.total_redeemed, U256::from(25u64));
        assert_eq!(asset.balance, Some(U256::from(500u64)));
        let erc20: Erc20 = harness.require(&asset.erc20);
        assert_eq!(erc20.symbol.as_deref(), Some("DAI"));
    }

    #[tokio::test]
    async fn test_treasury_asset_without_code_has_no_balance() {
        let mut harness = harness_with_token();
        let event = Event::RedeemableErc20(RedeemableErc20Event::TreasuryAsset(TreasuryAssetAdded {
            sender: ALICE,
            asset: ASSET,
        }));
        harness.apply(TOKEN, event.clone()).await.unwrap();
        harness.apply(TOKEN, event).await.unwrap();

        let asset: TreasuryAsset = harness.require(&pair_id(TOKEN, ASSET));
        assert_eq!(asset.balance, None);
        let token: RedeemableErc20 = harness.require(&address_id(TOKEN));
        assert_eq!(token.treasury_assets.len(), 1);
        let erc20: Erc20 = harness.require(&address_id(ASSET));
        assert_eq!(erc20.name, None);
    }

    #[tokio::test]
    async fn test_create_registers_with_parent_context() {
        let mut harness = Harness::new();
        harness.add_source(SALE, SourceKind::Sale, SourceContext::new());
        harness.reader().erc20(TOKEN, "Raise", "RAISE", 18, U256::ZERO);

        let envelope = harness.envelope(SALE, Event::Sale(crate::types::SaleEvent::Start(
            crate::types::SaleStart { sender: ALICE },
        )));
        let meta = crate::dispatch::EventMeta::new(&envelope, SourceContext::new());
        let mut ctx = HandlerContext::new(harness.store(), harness.reader(), &meta);
        let id = create(&mut ctx, TOKEN, CONTEXT_SALE, SALE).await.unwrap();
        // A second call is a no-op
        create(&mut ctx, TOKEN, CONTEXT_SALE, SALE).await.unwrap();
        let changes = ctx.into_changes();
        crate::store::EntityStore::commit(harness.store(), changes).unwrap();

        let token: RedeemableErc20 = harness.require(&id);
        assert_eq!(token.parent, Some(address_id(SALE)));
        let source: crate::sources::DataSource = harness.require(&id);
        assert_eq!(source.context.address(CONTEXT_SALE).unwrap(), Some(SALE));
        assert_eq!(harness.reader().call_count(TOKEN, crate::reader::ContractCall::Name), 1);
    }
}
