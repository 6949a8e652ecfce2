//! Error taxonomy for projection handlers
//!
//! Handlers return `anyhow::Result`; the variants below are raised inside it
//! so callers can classify a failure with `downcast_ref`.

use crate::entity::EntityKind;
use crate::sources::SourceKind;
use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors that abort the processing of a single event.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("missing {kind} entity '{id}'")]
    MissingEntity { kind: EntityKind, id: String },

    #[error("event {event} is not handled by {source_kind} sources")]
    UnexpectedEvent { source_kind: SourceKind, event: String },

    #[error("no data source registered for address 0x{0:x}")]
    UnknownSource(Address),

    #[error("call {call} to 0x{target:x} reverted at block {block}")]
    CallReverted {
        target: Address,
        call: &'static str,
        block: u64,
    },

    #[error("call {call} to 0x{target:x} returned undecodable data: {reason}")]
    Undecodable {
        target: Address,
        call: &'static str,
        reason: String,
    },

    #[error("{field} underflow on {kind} '{id}': {current} - {delta}")]
    Underflow {
        kind: EntityKind,
        id: String,
        field: &'static str,
        current: U256,
        delta: U256,
    },

    #[error("{field} overflow on {kind} '{id}': {current} + {delta}")]
    Overflow {
        kind: EntityKind,
        id: String,
        field: &'static str,
        current: U256,
        delta: U256,
    },

    #[error("invalid {what} status code {code}")]
    InvalidStatus { what: &'static str, code: u8 },
}

impl ProjectionError {
    /// Returns `true` when the error points at a missing or out-of-order
    /// upstream event rather than a configuration or transport problem.
    pub fn is_data_consistency(&self) -> bool {
        matches!(
            self,
            Self::MissingEntity { .. } | Self::Underflow { .. } | Self::Overflow { .. }
        )
    }
}

/// Subtract `delta` from a running total, failing instead of clamping.
pub fn checked_decrease(
    current: U256,
    delta: U256,
    kind: EntityKind,
    id: &str,
    field: &'static str,
) -> Result<U256, ProjectionError> {
    current
        .checked_sub(delta)
        .ok_or_else(|| ProjectionError::Underflow {
            kind,
            id: id.to_string(),
            field,
            current,
            delta,
        })
}

/// Add `delta` to a running total, failing instead of wrapping.
pub fn checked_increase(
    current: U256,
    delta: U256,
    kind: EntityKind,
    id: &str,
    field: &'static str,
) -> Result<U256, ProjectionError> {
    current
        .checked_add(delta)
        .ok_or_else(|| ProjectionError::Overflow {
            kind,
            id: id.to_string(),
            field,
            current,
            delta,
        })
}
