//! Static source manifest loading
//!
//! Each line declares one statically known contract: its source kind
//! followed by its address in hex format.

use crate::sources::SourceKind;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load a source manifest from a file.
///
/// Each line is `<SourceKind> <address>` (address with or without 0x
/// prefix). Empty lines and lines starting with '#' are ignored. Only kinds
/// that can be declared statically are accepted.
///
/// # Example file format:
/// ```text
/// TrustFactory 0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb
/// # This is a comment
/// NoticeBoard  0xdAC17F958D2ee523a2206206994597C13D831ec7
/// ```
pub fn load_manifest(path: &Path) -> Result<Vec<(SourceKind, Address)>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest file: {:?}", path))?;

    let mut sources = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry = parse_entry(line)
            .with_context(|| format!("Invalid manifest entry on line {}: {}", line_num + 1, line))?;
        sources.push(entry);
    }

    if sources.is_empty() {
        anyhow::bail!("Manifest is empty (no sources found)");
    }

    Ok(sources)
}

fn parse_entry(line: &str) -> Result<(SourceKind, Address)> {
    let mut fields = line.split_whitespace();
    let (Some(kind), Some(address), None) = (fields.next(), fields.next(), fields.next()) else {
        anyhow::bail!("Expected '<SourceKind> <address>'");
    };

    let kind: SourceKind = kind.parse()?;
    if !kind.is_static() {
        anyhow::bail!("{} sources are discovered through their parent and cannot be declared", kind);
    }
    Ok((kind, parse_address(address)?))
}

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!("Address must be 20 bytes (40 hex chars), got {} bytes", bytes.len());
    }

    Ok(Address::from_slice(&bytes))
}
