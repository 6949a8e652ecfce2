//! Verify contracts: per-account approval state and role markers
//!
//! Request events only move `request_status`. Decision events set `status`
//! and clear the pending request. Every evidence event is logged against
//! both the contract and the account record.

use crate::dispatch::HandlerContext;
use crate::keys::{address_id, pair_id, role_holder_id};
use crate::lists::{append_log, append_unique, remove_id};
use crate::records::{
    RequestStatus, Verify, VerifyAction, VerifyAddress, VerifyLog, VerifyRoleHolder, VerifyStatus,
};
use crate::handlers::notice;
use crate::types::{Evidence, RoleChange, VerifyEvent, VerifyInitialize};
use alloy_primitives::Address;
use anyhow::Result;
use tracing::debug;

pub fn handle(ctx: &mut HandlerContext<'_>, event: &VerifyEvent) -> Result<()> {
    match event {
        VerifyEvent::Initialize(e) => initialize(ctx, e),
        VerifyEvent::RequestApprove(e) => evidence(ctx, VerifyAction::RequestApprove, e),
        VerifyEvent::Approve(e) => evidence(ctx, VerifyAction::Approve, e),
        VerifyEvent::RequestBan(e) => evidence(ctx, VerifyAction::RequestBan, e),
        VerifyEvent::Ban(e) => evidence(ctx, VerifyAction::Ban, e),
        VerifyEvent::RequestRemove(e) => evidence(ctx, VerifyAction::RequestRemove, e),
        VerifyEvent::Remove(e) => evidence(ctx, VerifyAction::Remove, e),
        VerifyEvent::RoleGranted(e) => role_granted(ctx, e),
        VerifyEvent::RoleRevoked(e) => role_revoked(ctx, e),
    }
}

pub fn create(ctx: &mut HandlerContext<'_>, verify: Address) -> Result<()> {
    let id = address_id(verify);
    if ctx.entities.exists::<Verify>(&id)? {
        return Ok(());
    }
    ctx.entities.save(&Verify {
        id,
        address: verify,
        deployment: ctx.event.deployment(),
        admin: None,
        addresses: Vec::new(),
        events: Vec::new(),
        role_holders: Vec::new(),
        notices: Vec::new(),
    })
}

fn initialize(ctx: &mut HandlerContext<'_>, e: &VerifyInitialize) -> Result<()> {
    let mut verify: Verify = ctx.entities.require(&ctx.event.address_id())?;
    verify.admin = Some(e.admin);
    ctx.entities.save(&verify)
}

/// Transition applied by one evidence action.
enum Transition {
    Request(RequestStatus),
    Decide(VerifyStatus),
}

fn transition(action: VerifyAction) -> Transition {
    match action {
        VerifyAction::RequestApprove => Transition::Request(RequestStatus::RequestApprove),
        VerifyAction::RequestBan => Transition::Request(RequestStatus::RequestBan),
        VerifyAction::RequestRemove => Transition::Request(RequestStatus::RequestRemove),
        VerifyAction::Approve => Transition::Decide(VerifyStatus::Approved),
        VerifyAction::Ban => Transition::Decide(VerifyStatus::Banned),
        VerifyAction::Remove => Transition::Decide(VerifyStatus::Removed),
    }
}

fn evidence(ctx: &mut HandlerContext<'_>, action: VerifyAction, e: &Evidence) -> Result<()> {
    let mut verify: Verify = ctx.entities.require(&ctx.event.address_id())?;
    let record_id = pair_id(ctx.event.address, e.account);
    let mut record = ctx.entities.get_or_create(&record_id, || VerifyAddress {
        id: record_id.clone(),
        verify: verify.id.clone(),
        address: e.account,
        status: VerifyStatus::None,
        request_status: RequestStatus::None,
        events: Vec::new(),
    })?;

    match transition(action) {
        Transition::Request(request) => record.request_status = request,
        Transition::Decide(status) => {
            record.status = status;
            record.request_status = RequestStatus::None;
        }
    }

    let entry = VerifyLog {
        id: ctx.event.log_id(),
        verify: verify.id.clone(),
        action,
        sender: e.sender,
        account: e.account,
        data: e.data.clone(),
        emitted: ctx.event.emitted(),
    };
    ctx.entities.save(&entry)?;

    record.events = append_log(&record.events, &entry.id);
    ctx.entities.save(&record)?;

    verify.events = append_log(&verify.events, &entry.id);
    verify.addresses = append_unique(&verify.addresses, &record_id);
    debug!(
        "Verify {}: {:?} for 0x{:x} -> status {:?}, request {:?}",
        verify.id, action, e.account, record.status, record.request_status
    );
    ctx.entities.save(&verify)
}

fn role_granted(ctx: &mut HandlerContext<'_>, e: &RoleChange) -> Result<()> {
    let mut verify: Verify = ctx.entities.require(&ctx.event.address_id())?;
    let id = role_holder_id(ctx.event.address, e.role, e.account);
    ctx.entities.save(&VerifyRoleHolder {
        id: id.clone(),
        verify: verify.id.clone(),
        role: e.role,
        account: e.account,
        granted_by: e.sender,
        granted_block: ctx.event.block_number,
    })?;
    verify.role_holders = append_unique(&verify.role_holders, &id);
    ctx.entities.save(&verify)
}

fn role_revoked(ctx: &mut HandlerContext<'_>, e: &RoleChange) -> Result<()> {
    let mut verify: Verify = ctx.entities.require(&ctx.event.address_id())?;
    let id = role_holder_id(ctx.event.address, e.role, e.account);
    ctx.entities.remove::<VerifyRoleHolder>(&id);
    verify.role_holders = remove_id(&verify.role_holders, &id);
    ctx.entities.save(&verify)
}

impl notice::HasNotices for Verify {
    fn notices_mut(&mut self) -> &mut Vec<String> {
        &mut self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SourceContext, SourceKind};
    use crate::testing::Harness;
    use crate::txn::EntityTx;
    use crate::store::EntityStore;
    use crate::types::Event;
    use alloy_primitives::{address, b256, Bytes};

    const VERIFY: Address = address!("00000000000000000000000000000000000000f0");
    const ACCOUNT: Address = address!("000000000000000000000000000000000000000a");
    const ADMIN: Address = address!("00000000000000000000000000000000000000ad");

    fn harness_with_verify() -> Harness {
        let harness = Harness::new();
        harness.add_source(VERIFY, SourceKind::Verify, SourceContext::new());
        let mut tx = EntityTx::new(harness.store());
        tx.save(&Verify {
            id: address_id(VERIFY),
            address: VERIFY,
            deployment: crate::records::Deployment {
                factory: address_id(Address::ZERO),
                deployer: ADMIN,
                block: 0,
                timestamp: 0,
            },
            admin: None,
            addresses: Vec::new(),
            events: Vec::new(),
            role_holders: Vec::new(),
            notices: Vec::new(),
        })
        .unwrap();
        harness.store().commit(tx.into_changes()).unwrap();
        harness
    }

    fn evidence_of(account: Address) -> Evidence {
        Evidence {
            sender: ADMIN,
            account,
            data: Bytes::from(vec![0xde, 0xad]),
        }
    }

    #[tokio::test]
    async fn test_request_then_approve() {
        let mut harness = harness_with_verify();
        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::RequestApprove(evidence_of(ACCOUNT))))
            .await
            .unwrap();

        let record: VerifyAddress = harness.require(&pair_id(VERIFY, ACCOUNT));
        assert_eq!(record.status, VerifyStatus::None);
        assert_eq!(record.request_status, RequestStatus::RequestApprove);

        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::Approve(evidence_of(ACCOUNT))))
            .await
            .unwrap();

        let record: VerifyAddress = harness.require(&pair_id(VERIFY, ACCOUNT));
        assert_eq!(record.status, VerifyStatus::Approved);
        assert_eq!(record.request_status, RequestStatus::None);
        assert_eq!(record.events.len(), 2);

        let verify: Verify = harness.require(&address_id(VERIFY));
        assert_eq!(verify.addresses, vec![record.id.clone()]);
        assert_eq!(verify.events, record.events);

        let entry: VerifyLog = harness.require(&record.events[1]);
        assert_eq!(entry.action, VerifyAction::Approve);
        assert_eq!(entry.data, Bytes::from(vec![0xde, 0xad]));
    }

    #[tokio::test]
    async fn test_request_leaves_decided_status() {
        let mut harness = harness_with_verify();
        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::Approve(evidence_of(ACCOUNT))))
            .await
            .unwrap();
        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::RequestBan(evidence_of(ACCOUNT))))
            .await
            .unwrap();

        let record: VerifyAddress = harness.require(&pair_id(VERIFY, ACCOUNT));
        assert_eq!(record.status, VerifyStatus::Approved);
        assert_eq!(record.request_status, RequestStatus::RequestBan);

        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::Ban(evidence_of(ACCOUNT))))
            .await
            .unwrap();
        let record: VerifyAddress = harness.require(&pair_id(VERIFY, ACCOUNT));
        assert_eq!(record.status, VerifyStatus::Banned);
        assert_eq!(record.request_status, RequestStatus::None);
        assert_eq!(record.events.len(), 3);
    }

    #[tokio::test]
    async fn test_role_grant_and_revoke() {
        let mut harness = harness_with_verify();
        let role = b256!("00000000000000000000000000000000000000000000000000000000000000a0");
        let change = RoleChange {
            role,
            account: ACCOUNT,
            sender: ADMIN,
        };

        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::RoleGranted(change.clone())))
            .await
            .unwrap();
        let id = role_holder_id(VERIFY, role, ACCOUNT);
        let holder: VerifyRoleHolder = harness.require(&id);
        assert_eq!(holder.granted_by, ADMIN);

        harness
            .apply(VERIFY, Event::Verify(VerifyEvent::RoleRevoked(change)))
            .await
            .unwrap();
        assert!(harness.load::<VerifyRoleHolder>(&id).is_none());
        let verify: Verify = harness.require(&address_id(VERIFY));
        assert!(verify.role_holders.is_empty());
    }

    #[tokio::test]
    async fn test_role_regranted_after_revoke() {
        let mut harness = harness_with_verify();
        let role = b256!("00000000000000000000000000000000000000000000000000000000000000a0");
        let change = RoleChange {
            role,
            account: ACCOUNT,
            sender: ADMIN,
        };
        for event in [
            VerifyEvent::RoleGranted(change.clone()),
            VerifyEvent::RoleRevoked(change.clone()),
            VerifyEvent::RoleGranted(change),
        ] {
            harness.apply(VERIFY, Event::Verify(event)).await.unwrap();
        }

        let id = role_holder_id(VERIFY, role, ACCOUNT);
        let holder: VerifyRoleHolder = harness.require(&id);
        assert_eq!(holder.account, ACCOUNT);
        assert_eq!(holder.granted_block, harness.block());
        let verify: Verify = harness.require(&address_id(VERIFY));
        assert_eq!(verify.role_holders, vec![id]);
    }
}
