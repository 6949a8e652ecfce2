//! Projection handlers, one module per contract family
//!
//! Each module exposes a `handle` function taking the [`HandlerContext`] and
//! the family's event enum, plus a `create` function when the contract is
//! discovered through a parent. Handlers only stage writes; the indexer
//! commits them once the whole event has been applied.
//!
//! [`HandlerContext`]: crate::dispatch::HandlerContext

pub mod erc20;
pub mod escrow;
pub mod factory;
pub mod gated_nft;
pub mod holders;
pub mod notice;
pub mod orderbook;
pub mod pool;
pub mod redeemable;
pub mod sale;
pub mod seed;
pub mod stake;
pub mod tier;
pub mod trust;
pub mod verify;
