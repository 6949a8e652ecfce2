//! Factory implementation and child discovery

use crate::dispatch::HandlerContext;
use crate::handlers::{gated_nft, sale, stake, tier, trust, verify};
use crate::keys::address_id;
use crate::lists::append_unique;
use crate::records::Factory;
use crate::sources::{register_source, FactoryKind, SourceContext, SourceKind};
use crate::types::{FactoryEvent, Implementation, NewChild};
use anyhow::Result;
use tracing::{debug, info};

pub async fn handle(ctx: &mut HandlerContext<'_>, kind: FactoryKind, event: &FactoryEvent) -> Result<()> {
    match event {
        FactoryEvent::Implementation(e) => implementation(ctx, kind, e),
        FactoryEvent::NewChild(e) => new_child(ctx, kind, e).await,
    }
}

fn load_factory(ctx: &HandlerContext<'_>, kind: FactoryKind) -> Result<Factory> {
    let id = ctx.event.address_id();
    ctx.entities.get_or_create(&id, || Factory {
        id: id.clone(),
        address: ctx.event.address,
        kind,
        implementation: None,
        children: Vec::new(),
        children_count: 0,
    })
}

fn implementation(ctx: &mut HandlerContext<'_>, kind: FactoryKind, e: &Implementation) -> Result<()> {
    let mut factory = load_factory(ctx, kind)?;
    factory.implementation = Some(e.implementation);
    debug!(
        "Factory {} implementation set to 0x{:x}",
        factory.id, e.implementation
    );
    ctx.entities.save(&factory)
}

async fn new_child(ctx: &mut HandlerContext<'_>, kind: FactoryKind, e: &NewChild) -> Result<()> {
    let mut factory = load_factory(ctx, kind)?;
    let child_id = address_id(e.child);
    if !factory.children.contains(&child_id) {
        factory.children_count += 1;
    }
    factory.children = append_unique(&factory.children, &child_id);
    ctx.entities.save(&factory)?;

    let child_source = kind.child_source();
    match child_source {
        SourceKind::Trust => trust::create(ctx, e.child).await?,
        SourceKind::Sale => sale::create(ctx, e.child)?,
        SourceKind::Stake => stake::create(ctx, e.child).await?,
        SourceKind::Verify => verify::create(ctx, e.child)?,
        SourceKind::Tier(tier_kind) => tier::create(ctx, e.child, tier_kind).await?,
        SourceKind::GatedNft => gated_nft::create(ctx, e.child)?,
        other => anyhow::bail!("Factory kind {:?} produced non-child source {}", kind, other),
    }

    let block = ctx.event.block_number;
    register_source(&mut ctx.entities, e.child, child_source, SourceContext::new(), block)?;
    info!(
        "{} {} deployed {} {}",
        SourceKind::Factory(kind),
        factory.id,
        child_source,
        child_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Sale, SaleStatus, Verify};
    use crate::sources::DataSource;
    use crate::testing::Harness;
    use crate::types::Event;
    use alloy_primitives::{address, Address};

    const FACTORY: Address = address!("000000000000000000000000000000000000000f");
    const IMPL: Address = address!("0000000000000000000000000000000000000001");
    const CHILD: Address = address!("00000000000000000000000000000000000000c1");

    fn implementation_event() -> Event {
        Event::Factory(FactoryEvent::Implementation(Implementation {
            sender: Address::ZERO,
            implementation: IMPL,
        }))
    }

    fn new_child_event(child: Address) -> Event {
        Event::Factory(FactoryEvent::NewChild(NewChild {
            sender: Address::ZERO,
            child,
        }))
    }

    #[tokio::test]
    async fn test_implementation_then_new_child() {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::Verify), SourceContext::new());

        harness.apply(FACTORY, implementation_event()).await.unwrap();
        harness.apply(FACTORY, new_child_event(CHILD)).await.unwrap();

        let factory: Factory = harness.require(&address_id(FACTORY));
        assert_eq!(factory.implementation, Some(IMPL));
        assert_eq!(factory.children, vec![address_id(CHILD)]);
        assert_eq!(factory.children_count, 1);

        let child: Verify = harness.require(&address_id(CHILD));
        assert_eq!(child.deployment.factory, address_id(FACTORY));
        assert_eq!(child.deployment.block, harness.block());

        let source: DataSource = harness.require(&address_id(CHILD));
        assert_eq!(source.kind, SourceKind::Verify);
    }

    #[tokio::test]
    async fn test_new_child_without_implementation_creates_factory() {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::Sale), SourceContext::new());

        harness.apply(FACTORY, new_child_event(CHILD)).await.unwrap();

        let factory: Factory = harness.require(&address_id(FACTORY));
        assert_eq!(factory.implementation, None);
        assert_eq!(factory.kind, FactoryKind::Sale);
        let sale: Sale = harness.require(&address_id(CHILD));
        assert_eq!(sale.status, SaleStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_child_is_counted_once() {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::Verify), SourceContext::new());

        harness.apply(FACTORY, new_child_event(CHILD)).await.unwrap();
        let created: Verify = harness.require(&address_id(CHILD));
        harness.apply(FACTORY, new_child_event(CHILD)).await.unwrap();

        let factory: Factory = harness.require(&address_id(FACTORY));
        assert_eq!(factory.children, vec![address_id(CHILD)]);
        assert_eq!(factory.children_count, 1);
        // The child keeps its original deployment record
        let child: Verify = harness.require(&address_id(CHILD));
        assert_eq!(child, created);
    }

    #[tokio::test]
    async fn test_child_events_dispatch_after_registration() {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::Verify), SourceContext::new());

        // Unknown before the factory announces it
        let init = Event::Verify(crate::types::VerifyEvent::Initialize(
            crate::types::VerifyInitialize {
                sender: Address::ZERO,
                admin: address!("00000000000000000000000000000000000000ad"),
            },
        ));
        assert!(harness.apply(CHILD, init.clone()).await.is_err());

        harness.apply(FACTORY, new_child_event(CHILD)).await.unwrap();
        harness.apply(CHILD, init).await.unwrap();
        let child: Verify = harness.require(&address_id(CHILD));
        assert_eq!(child.admin, Some(address!("00000000000000000000000000000000000000ad")));
    }
}
