//! JSON-RPC client for Ethereum nodes
//!
//! Provides the two calls the read adapter needs (`eth_call` and
//! `eth_getCode`) and [`RpcReader`], the [`ContractReader`] used by the
//! `projector` binary.

use crate::cache::CodeCache;
use crate::reader::{CallOutcome, ContractReader};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use tracing::debug;

/// JSON-RPC error code geth and most clients use for EVM reverts.
const EXECUTION_REVERTED: i64 = 3;

/// Outcome of one JSON-RPC request that reached the node.
enum RpcReply {
    Result(Value),
    Error { code: i64, message: String },
}

/// JSON-RPC client for Ethereum nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Send a JSON-RPC request, returning node errors as values.
    async fn request(&self, method: &str, params: Value) -> Result<RpcReply> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to send RPC request")?;

        let json: Value = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        if let Some(error) = json.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(RpcReply::Error { code, message });
        }

        json.get("result")
            .cloned()
            .map(RpcReply::Result)
            .context("RPC response missing 'result' field")
    }

    /// Make a JSON-RPC call, treating node errors as failures.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        match self.request(method, params).await? {
            RpcReply::Result(value) => Ok(value),
            RpcReply::Error { code, message } => {
                anyhow::bail!("RPC error {}: {}", code, message)
            }
        }
    }

    /// Execute a read-only call at a block height.
    pub async fn eth_call(&self, to: Address, data: &[u8], block: u64) -> Result<CallOutcome> {
        let params = json!([
            {
                "to": format!("0x{:x}", to),
                "data": format!("0x{}", hex::encode(data)),
            },
            format!("0x{:x}", block)
        ]);

        match self.request("eth_call", params).await? {
            RpcReply::Result(value) => {
                let data_str = value.as_str().context("eth_call result is not a string")?;
                Ok(CallOutcome::Success(decode_hex_data(data_str)?))
            }
            RpcReply::Error { code, message } if is_revert(code, &message) => {
                debug!("eth_call to 0x{:x} reverted: {}", to, message);
                Ok(CallOutcome::Reverted)
            }
            RpcReply::Error { code, message } => {
                anyhow::bail!("eth_call to 0x{:x} failed with RPC error {}: {}", to, code, message)
            }
        }
    }

    /// Get the code at an address at a specific block.
    ///
    /// Returns empty Vec for EOA addresses, contract bytecode for contracts.
    pub async fn get_code(&self, address: Address, block: u64) -> Result<Vec<u8>> {
        let addr_str = format!("0x{:x}", address);
        let params = json!([addr_str, format!("0x{:x}", block)]);
        let result = self.call("eth_getCode", params).await?;

        let code_str = result.as_str().context("Code response is not a string")?;
        decode_hex_data(code_str).context("Failed to decode code hex")
    }
}

/// Whether a JSON-RPC error denotes an EVM revert rather than a node fault.
fn is_revert(code: i64, message: &str) -> bool {
    code == EXECUTION_REVERTED || message.to_ascii_lowercase().contains("revert")
}

/// Decode `0x`-prefixed hex data, padding odd-length strings.
fn decode_hex_data(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Vec::new());
    }

    // Handle odd-length hex strings by padding with a leading zero
    let s = if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    };

    hex::decode(&s).context("Failed to decode hex data")
}

/// [`ContractReader`] backed by a JSON-RPC node.
///
/// Calls to addresses without code short-circuit to
/// [`CallOutcome::Reverted`]: `eth_call` against an EOA succeeds with empty
/// data, which would otherwise read as a malformed return.
pub struct RpcReader {
    client: RpcClient,
    code_cache: Mutex<CodeCache>,
}

impl RpcReader {
    pub fn new(client: RpcClient) -> Self {
        Self {
            client,
            code_cache: Mutex::new(CodeCache::new()),
        }
    }

    async fn has_code(&self, target: Address, block: u64) -> Result<bool> {
        {
            let cache = self
                .code_cache
                .lock()
                .map_err(|_| anyhow::anyhow!("Code cache lock poisoned"))?;
            if let Some(known) = cache.has_code(target, block) {
                return Ok(known);
            }
        }

        let code = self.client.get_code(target, block).await?;
        if code.is_empty() {
            return Ok(false);
        }
        self.code_cache
            .lock()
            .map_err(|_| anyhow::anyhow!("Code cache lock poisoned"))?
            .mark_code(target, block);
        Ok(true)
    }
}

#[async_trait]
impl ContractReader for RpcReader {
    async fn call(&self, target: Address, calldata: Vec<u8>, block: u64) -> Result<CallOutcome> {
        if !self.has_code(target, block).await? {
            debug!("0x{:x} has no code at block {}", target, block);
            return Ok(CallOutcome::Reverted);
        }
        self.client.eth_call(target, &calldata, block).await
    }
}
