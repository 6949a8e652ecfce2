//! Entity id construction and key encoding
//!
//! Entity ids are strings: lowercase hex addresses, log ids derived from the
//! transaction hash and log index, or composites of those joined with a
//! separator. Composite ids are part of the persisted layout and must not
//! change shape.
//!
//! RocksDB keys are the raw id bytes inside the entity kind's column family,
//! plus single-byte meta keys for bookkeeping values.

use crate::types::EventPosition;
use alloy_primitives::{Address, B256, U256};

/// Meta id of the processing cursor.
pub const META_CURSOR: u8 = 0x01;

/// Id of the singleton bucket for notices whose subject matched nothing.
pub const UNKNOWN_NOTICES_ID: &str = "UNKNOWN_NOTICES";

/// Lowercase `0x`-prefixed hex id of an address.
pub fn address_id(addr: Address) -> String {
    format!("0x{:x}", addr)
}

/// Id of a per-log record: `{txHash}-{logIndex}`.
pub fn log_id(tx_hash: B256, log_index: u64) -> String {
    format!("0x{:x}-{}", tx_hash, log_index)
}

/// Id of a per-(parent, account) record: `{parent} - {account}`.
///
/// Used for token holders, escrow depositors and withdrawers, verify
/// addresses, tier accounts and similar per-account aggregates.
pub fn pair_id(parent: Address, account: Address) -> String {
    format!("0x{:x} - 0x{:x}", parent, account)
}

/// Id of a per-(escrow, depositor, token) pending aggregate.
pub fn pending_aggregate_id(escrow: Address, depositor: Address, token: Address) -> String {
    format!("0x{:x} - 0x{:x} - 0x{:x}", escrow, depositor, token)
}

/// Id of a per-(escrow, sale, supply, token) deposit aggregate.
pub fn supply_aggregate_id(escrow: Address, sale: Address, supply: U256, token: Address) -> String {
    format!("0x{:x} - 0x{:x} - {} - 0x{:x}", escrow, sale, supply, token)
}

/// Id of an order book vault: `{vaultId}-{owner}`.
pub fn vault_id(vault_id: U256, owner: Address) -> String {
    format!("{}-0x{:x}", vault_id, owner)
}

/// Id of an order book token vault: `{vaultId}-{owner}-{token}`.
pub fn token_vault_id(vault_id: U256, owner: Address, token: Address) -> String {
    format!("{}-0x{:x}-0x{:x}", vault_id, owner, token)
}

/// Id of a gated NFT token: `{nft} - {tokenId}`.
pub fn gated_token_id(nft: Address, token_id: U256) -> String {
    format!("0x{:x} - {}", nft, token_id)
}

/// Id of a role marker: `{contract} - {role} - {account}`.
pub fn role_holder_id(contract: Address, role: B256, account: Address) -> String {
    format!("0x{:x} - 0x{:x} - 0x{:x}", contract, role, account)
}

/// Encode an entity key.
///
/// Entity kinds live in separate column families, so the key is just the
/// UTF-8 id.
pub fn encode_entity_key(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Encode a meta key.
///
/// Format: byte 'M' (0x4D) + meta_id (1 byte)
/// Total length: 2 bytes
///
/// Meta IDs:
/// - 0x01: processing cursor
pub fn encode_meta_key(meta_id: u8) -> Vec<u8> {
    vec![b'M', meta_id]
}

/// Encode an event position.
///
/// Format: block_number (8 bytes, big-endian) + log_index (8 bytes, big-endian)
/// Total length: 16 bytes
pub fn encode_position(position: EventPosition) -> Vec<u8> {
    let mut value = Vec::with_capacity(16);
    value.extend_from_slice(&position.block_number.to_be_bytes());
    value.extend_from_slice(&position.log_index.to_be_bytes());
    value
}

/// Decode an event position written by [`encode_position`].
pub fn decode_position(bytes: &[u8]) -> anyhow::Result<EventPosition> {
    if bytes.len() != 16 {
        anyhow::bail!("Event position must be 16 bytes, got {}", bytes.len());
    }
    let mut block = [0u8; 8];
    let mut log = [0u8; 8];
    block.copy_from_slice(&bytes[0..8]);
    log.copy_from_slice(&bytes[8..16]);
    Ok(EventPosition {
        block_number: u64::from_be_bytes(block),
        log_index: u64::from_be_bytes(log),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_address_id_is_lowercase_hex() {
        let addr = Address::from_slice(
            &hex::decode("0742d35Cc6634C0532925a3b844Bc9e7595f0bEb").unwrap(),
        );
        assert_eq!(address_id(addr), "0x0742d35cc6634c0532925a3b844bc9e7595f0beb");
    }

    #[test]
    fn test_log_id() {
        let tx = b256!("00000000000000000000000000000000000000000000000000000000000000ff");
        assert_eq!(
            log_id(tx, 7),
            "0x00000000000000000000000000000000000000000000000000000000000000ff-7"
        );
    }

    #[test]
    fn test_composite_ids() {
        let escrow = address!("00000000000000000000000000000000000000e5");
        let depositor = address!("00000000000000000000000000000000000000d1");
        let token = address!("00000000000000000000000000000000000000aa");

        assert_eq!(
            pair_id(escrow, depositor),
            "0x00000000000000000000000000000000000000e5 - 0x00000000000000000000000000000000000000d1"
        );
        assert_eq!(
            token_vault_id(U256::from(3u64), depositor, token),
            "3-0x00000000000000000000000000000000000000d1-0x00000000000000000000000000000000000000aa"
        );
        assert_ne!(
            pending_aggregate_id(escrow, depositor, token),
            pending_aggregate_id(escrow, token, depositor)
        );
    }

    #[test]
    fn test_supply_aggregate_separates_supply_snapshots() {
        let escrow = address!("00000000000000000000000000000000000000e5");
        let sale = address!("0000000000000000000000000000000000000005");
        let token = address!("00000000000000000000000000000000000000aa");
        let a = supply_aggregate_id(escrow, sale, U256::from(1000u64), token);
        let b = supply_aggregate_id(escrow, sale, U256::from(2000u64), token);
        assert_ne!(a, b);
    }

    #[test]
    fn test_meta_key_encoding() {
        let key = encode_meta_key(META_CURSOR);
        assert_eq!(key.len(), 2);
        assert_eq!(key[0], b'M');
        assert_eq!(key[1], 0x01);
    }

    #[test]
    fn test_position_encoding_orders_like_position() {
        let a = EventPosition { block_number: 10, log_index: 300 };
        let b = EventPosition { block_number: 11, log_index: 0 };
        assert!(encode_position(a) < encode_position(b));
        assert_eq!(decode_position(&encode_position(a)).unwrap(), a);
        assert!(decode_position(&[0u8; 3]).is_err());
    }
}
