//! Notice board and notice routing
//!
//! A notice's subject is a bare address. It is matched against the subject
//! kinds below in a fixed order and attached to the first one that exists.
//! Unmatched notices go to the `UNKNOWN_NOTICES` bucket. The order is part
//! of the stored data layout and must not change.

use crate::dispatch::HandlerContext;
use crate::entity::{Entity, EntityKind};
use crate::keys::{address_id, UNKNOWN_NOTICES_ID};
use crate::lists::append_log;
use crate::records::{
    ClaimEscrow, GatedNft, Notice, RedeemableErc20, Sale, SeedErc20, Stake, Tier, Trust,
    UnknownNotices, Verify,
};
use crate::types::{NewNotice, NoticeBoardEvent};
use alloy_primitives::{Address, Bytes};
use anyhow::Result;
use tracing::debug;

/// An entity that keeps a log of notices about it.
pub trait HasNotices: Entity {
    fn notices_mut(&mut self) -> &mut Vec<String>;
}

pub fn handle(ctx: &mut HandlerContext<'_>, event: &NoticeBoardEvent) -> Result<()> {
    match event {
        NoticeBoardEvent::NewNotice(e) => new_notice(ctx, e),
    }
}

fn new_notice(ctx: &mut HandlerContext<'_>, e: &NewNotice) -> Result<()> {
    file(ctx, e.sender, e.notice.subject, &e.notice.data)
}

/// Append `notice` to the subject's log if a `E` with that id exists.
fn attach<E: HasNotices>(ctx: &mut HandlerContext<'_>, subject: &str, notice: &str) -> Result<bool> {
    match ctx.entities.load::<E>(subject)? {
        Some(mut entity) => {
            let notices = entity.notices_mut();
            *notices = append_log(notices, notice);
            ctx.entities.save(&entity)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Resolve `subject` in priority order, returning the matching kind.
fn route(ctx: &mut HandlerContext<'_>, subject: &str, notice: &str) -> Result<Option<EntityKind>> {
    let attached = if attach::<Sale>(ctx, subject, notice)? {
        Some(EntityKind::Sale)
    } else if attach::<Trust>(ctx, subject, notice)? {
        Some(EntityKind::Trust)
    } else if attach::<Verify>(ctx, subject, notice)? {
        Some(EntityKind::Verify)
    } else if attach::<Tier>(ctx, subject, notice)? {
        Some(EntityKind::Tier)
    } else if attach::<GatedNft>(ctx, subject, notice)? {
        Some(EntityKind::GatedNft)
    } else if attach::<RedeemableErc20>(ctx, subject, notice)? {
        Some(EntityKind::RedeemableErc20)
    } else if attach::<SeedErc20>(ctx, subject, notice)? {
        Some(EntityKind::SeedErc20)
    } else if attach::<Stake>(ctx, subject, notice)? {
        Some(EntityKind::Stake)
    } else if attach::<ClaimEscrow>(ctx, subject, notice)? {
        Some(EntityKind::ClaimEscrow)
    } else {
        None
    };
    Ok(attached)
}

/// Record a notice from `sender` about `subject`.
pub fn file(ctx: &mut HandlerContext<'_>, sender: Address, subject: Address, data: &Bytes) -> Result<()> {
    let id = ctx.event.log_id();
    let subject_kind = route(ctx, &address_id(subject), &id)?;

    if subject_kind.is_none() {
        let mut bucket = ctx.entities.get_or_create(UNKNOWN_NOTICES_ID, || UnknownNotices {
            id: UNKNOWN_NOTICES_ID.to_string(),
            notices: Vec::new(),
        })?;
        bucket.notices = append_log(&bucket.notices, &id);
        ctx.entities.save(&bucket)?;
    }
    debug!(
        "Notice {} about 0x{:x} filed under {}",
        id,
        subject,
        subject_kind.map(|k| k.name()).unwrap_or(UNKNOWN_NOTICES_ID)
    );

    ctx.entities.save(&Notice {
        id,
        sender,
        subject,
        subject_kind,
        data: data.clone(),
        emitted: ctx.event.emitted(),
    })
}
