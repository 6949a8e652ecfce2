//! Tier-gated NFTs: ownership and holder markers
//!
//! A `GatedNftHolder` exists only while its account holds at least one
//! token. When its last token leaves, the marker is deleted and dropped
//! from the collection's holder list.

use crate::dispatch::HandlerContext;
use crate::handlers::notice;
use crate::keys::{address_id, gated_token_id, pair_id};
use crate::lists::{append_unique, remove_id};
use crate::records::{GatedNft, GatedNftHolder, GatedToken};
use crate::types::{GatedNftEvent, GatedNftInitialize, NftTransfer, UpdatedRoyaltyRecipient};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use tracing::debug;

pub fn handle(ctx: &mut HandlerContext<'_>, event: &GatedNftEvent) -> Result<()> {
    match event {
        GatedNftEvent::Initialize(e) => initialize(ctx, e),
        GatedNftEvent::Transfer(e) => transfer(ctx, e),
        GatedNftEvent::UpdatedRoyaltyRecipient(e) => royalty_recipient(ctx, e),
    }
}

pub fn create(ctx: &mut HandlerContext<'_>, nft: Address) -> Result<()> {
    let id = address_id(nft);
    if ctx.entities.exists::<GatedNft>(&id)? {
        return Ok(());
    }
    ctx.entities.save(&GatedNft {
        id,
        address: nft,
        deployment: ctx.event.deployment(),
        name: None,
        symbol: None,
        tier: None,
        minimum_status: U256::ZERO,
        max_per_address: U256::ZERO,
        transferrable: 0,
        max_mintable: U256::ZERO,
        royalty_recipient: None,
        royalty_bps: U256::ZERO,
        minted: 0,
        tokens: Vec::new(),
        holders: Vec::new(),
        notices: Vec::new(),
    })
}

fn initialize(ctx: &mut HandlerContext<'_>, e: &GatedNftInitialize) -> Result<()> {
    let mut nft: GatedNft = ctx.entities.require(&ctx.event.address_id())?;
    let config = &e.config;
    nft.name = Some(config.name.clone());
    nft.symbol = Some(config.symbol.clone());
    nft.tier = Some(config.tier);
    nft.minimum_status = config.minimum_status;
    nft.max_per_address = config.max_per_address;
    nft.transferrable = config.transferrable;
    nft.max_mintable = config.max_mintable;
    nft.royalty_recipient = Some(config.royalty_recipient);
    nft.royalty_bps = config.royalty_bps;
    ctx.entities.save(&nft)
}

fn transfer(ctx: &mut HandlerContext<'_>, e: &NftTransfer) -> Result<()> {
    let nft_addr = ctx.event.address;
    let mut nft: GatedNft = ctx.entities.require(&ctx.event.address_id())?;
    let token_id = gated_token_id(nft_addr, e.token_id);

    let mut token = if e.from == Address::ZERO {
        nft.minted += 1;
        nft.tokens = append_unique(&nft.tokens, &token_id);
        GatedToken {
            id: token_id.clone(),
            nft: nft.id.clone(),
            token_id: e.token_id,
            owner: e.to,
            minted: ctx.event.emitted(),
            transfers: 0,
        }
    } else {
        let mut token: GatedToken = ctx.entities.require(&token_id)?;
        token.transfers += 1;

        let holder_id = pair_id(nft_addr, e.from);
        let mut holder: GatedNftHolder = ctx.entities.require(&holder_id)?;
        holder.tokens = remove_id(&holder.tokens, &token_id);
        if holder.tokens.is_empty() {
            debug!("Gated NFT {}: 0x{:x} no longer holds tokens", nft.id, e.from);
            ctx.entities.remove::<GatedNftHolder>(&holder_id);
            nft.holders = remove_id(&nft.holders, &holder_id);
        } else {
            ctx.entities.save(&holder)?;
        }
        token
    };
    token.owner = e.to;

    if e.to != Address::ZERO {
        let holder_id = pair_id(nft_addr, e.to);
        let mut holder = ctx.entities.get_or_create(&holder_id, || GatedNftHolder {
            id: holder_id.clone(),
            nft: nft.id.clone(),
            address: e.to,
            tokens: Vec::new(),
        })?;
        holder.tokens = append_unique(&holder.tokens, &token_id);
        ctx.entities.save(&holder)?;
        nft.holders = append_unique(&nft.holders, &holder_id);
    }

    ctx.entities.save(&token)?;
    ctx.entities.save(&nft)
}

fn royalty_recipient(ctx: &mut HandlerContext<'_>, e: &UpdatedRoyaltyRecipient) -> Result<()> {
    let mut nft: GatedNft = ctx.entities.require(&ctx.event.address_id())?;
    nft.royalty_recipient = Some(e.next_recipient);
    ctx.entities.save(&nft)
}

impl notice::HasNotices for GatedNft {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FactoryKind, SourceContext, SourceKind};
    use crate::testing::Harness;
    use crate::types::{Event, FactoryEvent, GatedNftConfig, NewChild};
    use alloy_primitives::address;

    const FACTORY: Address = address!("00000000000000000000000000000000000000f7");
    const NFT: Address = address!("0000000000000000000000000000000000000077");
    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b1");

    async fn deployed_nft() -> Harness {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::GatedNft), SourceContext::new());
        harness
            .apply(
                FACTORY,
                Event::Factory(FactoryEvent::NewChild(NewChild {
                    sender: Address::ZERO,
                    child: NFT,
                })),
            )
            .await
            .unwrap();
        harness
    }

    fn transfer_event(from: Address, to: Address, token_id: u64) -> Event {
        Event::GatedNft(GatedNftEvent::Transfer(NftTransfer {
            from,
            to,
            token_id: U256::from(token_id),
        }))
    }

    #[tokio::test]
    async fn test_initialize_applies_config() {
        let mut harness = deployed_nft().await;
        harness
            .apply(
                NFT,
                Event::GatedNft(GatedNftEvent::Initialize(GatedNftInitialize {
                    sender: Address::ZERO,
                    config: GatedNftConfig {
                        name: "Pass".to_string(),
                        symbol: "PASS".to_string(),
                        tier: address!("0000000000000000000000000000000000000041"),
                        minimum_status: U256::from(2u64),
                        max_per_address: U256::from(1u64),
                        transferrable: 1,
                        max_mintable: U256::from(100u64),
                        royalty_recipient: ALICE,
                        royalty_bps: U256::from(250u64),
                    },
                })),
            )
            .await
            .unwrap();
        harness
            .apply(
                NFT,
                Event::GatedNft(GatedNftEvent::UpdatedRoyaltyRecipient(UpdatedRoyaltyRecipient {
                    origin: ALICE,
                    next_recipient: BOB,
                })),
            )
            .await
            .unwrap();

        let nft: GatedNft = harness.require(&address_id(NFT));
        assert_eq!(nft.symbol.as_deref(), Some("PASS"));
        assert_eq!(nft.max_mintable, U256::from(100u64));
        assert_eq!(nft.royalty_recipient, Some(BOB));
    }

    #[tokio::test]
    async fn test_transfer_moves_holder_markers() {
        let mut harness = deployed_nft().await;
        harness.apply(NFT, transfer_event(Address::ZERO, ALICE, 1)).await.unwrap();
        harness.apply(NFT, transfer_event(Address::ZERO, ALICE, 2)).await.unwrap();
        harness.apply(NFT, transfer_event(ALICE, BOB, 1)).await.unwrap();

        let alice: GatedNftHolder = harness.require(&pair_id(NFT, ALICE));
        assert_eq!(alice.tokens, vec![gated_token_id(NFT, U256::from(2u64))]);

        harness.apply(NFT, transfer_event(ALICE, BOB, 2)).await.unwrap();
        assert!(harness.load::<GatedNftHolder>(&pair_id(NFT, ALICE)).is_none());

        let nft: GatedNft = harness.require(&address_id(NFT));
        assert_eq!(nft.minted, 2);
        assert_eq!(nft.holders, vec![pair_id(NFT, BOB)]);
        assert_eq!(nft.tokens.len(), 2);

        let token: GatedToken = harness.require(&gated_token_id(NFT, U256::from(1u64)));
        assert_eq!(token.owner, BOB);
        assert_eq!(token.transfers, 1);
        let bob: GatedNftHolder = harness.require(&pair_id(NFT, BOB));
        assert_eq!(bob.tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_self_transfer_keeps_holder() {
        let mut harness = deployed_nft().await;
        harness.apply(NFT, transfer_event(Address::ZERO, ALICE, 1)).await.unwrap();
        harness.apply(NFT, transfer_event(ALICE, ALICE, 1)).await.unwrap();

        let token_id = gated_token_id(NFT, U256::from(1u64));
        let alice: GatedNftHolder = harness.require(&pair_id(NFT, ALICE));
        assert_eq!(alice.tokens, vec![token_id.clone()]);
        let nft: GatedNft = harness.require(&address_id(NFT));
        assert_eq!(nft.holders, vec![pair_id(NFT, ALICE)]);
        let token: GatedToken = harness.require(&token_id);
        assert_eq!(token.owner, ALICE);
        assert_eq!(token.transfers, 1);
    }

    #[tokio::test]
    async fn test_transfer_back_to_former_holder() {
        let mut harness = deployed_nft().await;
        harness.apply(NFT, transfer_event(Address::ZERO, ALICE, 1)).await.unwrap();
        harness.apply(NFT, transfer_event(ALICE, BOB, 1)).await.unwrap();
        assert!(harness.load::<GatedNftHolder>(&pair_id(NFT, ALICE)).is_none());

        harness.apply(NFT, transfer_event(BOB, ALICE, 1)).await.unwrap();
        assert!(harness.load::<GatedNftHolder>(&pair_id(NFT, BOB)).is_none());
        let alice: GatedNftHolder = harness.require(&pair_id(NFT, ALICE));
        assert_eq!(alice.tokens, vec![gated_token_id(NFT, U256::from(1u64))]);
        let nft: GatedNft = harness.require(&address_id(NFT));
        assert_eq!(nft.holders, vec![pair_id(NFT, ALICE)]);
    }

    #[tokio::test]
    async fn test_transfer_of_unminted_token_fails() {
        let mut harness = deployed_nft().await;
        assert!(harness.apply(NFT, transfer_event(ALICE, BOB, 9)).await.is_err());
    }
}
