//! Code presence cache
//!
//! In-memory cache to avoid an `eth_getCode` round trip before every
//! `eth_call` made by [`crate::rpc::RpcReader`].
//!
//! Strategy:
//! - If an address has code at some block, cache it forever: events are
//!   processed in block order, so every later read also sees the code
//! - If an address has no code, don't cache it (it could be deployed at a
//!   later block)

use alloy_primitives::Address;
use std::collections::HashMap;

/// Cache of addresses known to hold code.
///
/// Maps addresses to the first block at which code was observed.
#[derive(Default)]
pub struct CodeCache {
    cache: HashMap<Address, u64>,
}

impl CodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an address is known to hold code at `block`.
    ///
    /// Returns:
    /// - `Some(true)` if code was observed at or before `block`
    /// - `None` if unknown (the caller must ask the node)
    pub fn has_code(&self, addr: Address, block: u64) -> Option<bool> {
        match self.cache.get(&addr) {
            Some(seen) if *seen <= block => Some(true),
            _ => None,
        }
    }

    /// Record that `addr` held code at `block`.
    ///
    /// Keeps the earliest block seen.
    pub fn mark_code(&mut self, addr: Address, block: u64) {
        self.cache
            .entry(addr)
            .and_modify(|seen| *seen = (*seen).min(block))
            .or_insert(block);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
