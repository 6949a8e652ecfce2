//! Test doubles shared by handler and indexer tests

use crate::entity::Entity;
use crate::indexer::{Indexer, ProcessOutcome};
use crate::keys::log_id;
use crate::reader::{CallOutcome, ContractCall, ContractReader, DistributionProgressView, TrustContracts};
use crate::sources::{register_source, SourceContext, SourceKind};
use crate::store::{load_entity, EntityStore, MemoryEntityStore};
use crate::txn::EntityTx;
use crate::types::{Event, EventEnvelope};
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolValue;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Scripted [`ContractReader`].
///
/// Unscripted calls revert, which is also what an address without code
/// does.
#[derive(Default)]
pub struct MockReader {
    responses: Mutex<HashMap<(Address, Vec<u8>), Vec<u8>>>,
    broken: Mutex<HashSet<Address>>,
    calls: Mutex<Vec<(Address, Vec<u8>, u64)>>,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, target: Address, call: ContractCall, data: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert((target, call.calldata()), data);
    }

    pub fn respond_u256(&self, target: Address, call: ContractCall, value: U256) {
        self.respond(target, call, value.abi_encode());
    }

    pub fn respond_string(&self, target: Address, call: ContractCall, value: &str) {
        self.respond(target, call, (value.to_string(),).abi_encode_params());
    }

    pub fn respond_address(&self, target: Address, call: ContractCall, value: Address) {
        self.respond(target, call, value.abi_encode());
    }

    /// Make a previously scripted call revert again.
    pub fn revert(&self, target: Address, call: ContractCall) {
        self.responses
            .lock()
            .unwrap()
            .remove(&(target, call.calldata()));
    }

    /// Every call to `target` fails at the transport level.
    pub fn fail_transport(&self, target: Address) {
        self.broken.lock().unwrap().insert(target);
    }

    /// Script the standard ERC20 metadata reads.
    pub fn erc20(&self, token: Address, name: &str, symbol: &str, decimals: u8, supply: U256) {
        self.respond_string(token, ContractCall::Name, name);
        self.respond_string(token, ContractCall::Symbol, symbol);
        self.respond_u256(token, ContractCall::Decimals, U256::from(decimals));
        self.respond_u256(token, ContractCall::TotalSupply, supply);
    }

    pub fn balance(&self, token: Address, account: Address, balance: U256) {
        self.respond_u256(token, ContractCall::BalanceOf(account), balance);
    }

    pub fn trust_contracts(&self, trust: Address, contracts: &TrustContracts) {
        let data = (
            contracts.reserve,
            contracts.redeemable,
            contracts.seeder,
            contracts.tier,
            contracts.crp,
        )
            .abi_encode_params();
        self.respond(trust, ContractCall::GetContracts, data);
    }

    pub fn distribution_progress(&self, trust: Address, view: &DistributionProgressView) {
        let data = (
            U256::from(view.status),
            U256::from(view.start_block),
            U256::from(view.end_block),
            view.pool_reserve_balance,
            view.pool_token_balance,
            view.reserve_init,
            view.minimum_creator_raise,
            view.seeder_fee,
            view.redeem_init,
        )
            .abi_encode_params();
        self.respond(trust, ContractCall::GetDistributionProgress, data);
    }

    /// Number of calls made to `target` with `call`'s calldata.
    pub fn call_count(&self, target: Address, call: ContractCall) -> usize {
        let calldata = call.calldata();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, data, _)| *t == target && *data == calldata)
            .count()
    }
}

#[async_trait]
impl ContractReader for MockReader {
    async fn call(&self, target: Address, calldata: Vec<u8>, block: u64) -> Result<CallOutcome> {
        self.calls.lock().unwrap().push((target, calldata.clone(), block));
        if self.broken.lock().unwrap().contains(&target) {
            anyhow::bail!("connection refused");
        }
        Ok(match self.responses.lock().unwrap().get(&(target, calldata)) {
            Some(data) => CallOutcome::Success(data.clone()),
            None => CallOutcome::Reverted,
        })
    }
}

/// Drives envelopes through a real [`Indexer`] over a memory store.
///
/// Every envelope lands in a fresh block with its own transaction hash.
pub struct Harness {
    pub indexer: Indexer<MemoryEntityStore, MockReader>,
    block: u64,
    timestamp: u64,
    tx_from: Address,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            indexer: Indexer::new(MemoryEntityStore::new(), MockReader::new()),
            block: 100,
            timestamp: 1_650_000_000,
            tx_from: Address::repeat_byte(0xd0),
        }
    }

    pub fn reader(&self) -> &MockReader {
        self.indexer.reader()
    }

    pub fn store(&self) -> &MemoryEntityStore {
        self.indexer.store()
    }

    /// Register a source directly, as if a parent had discovered it.
    pub fn add_source(&self, address: Address, kind: SourceKind, context: SourceContext) {
        let mut tx = EntityTx::new(self.store());
        register_source(&mut tx, address, kind, context, 0).unwrap();
        self.store().commit(tx.into_changes()).unwrap();
    }

    /// Sender of every following transaction.
    pub fn set_tx_from(&mut self, from: Address) {
        self.tx_from = from;
    }

    /// Next envelope emitted by `address`.
    pub fn envelope(&mut self, address: Address, event: Event) -> EventEnvelope {
        self.block += 1;
        self.timestamp += 12;
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&self.block.to_be_bytes());
        EventEnvelope {
            address,
            block_number: self.block,
            block_timestamp: self.timestamp,
            tx_hash: B256::from(hash),
            tx_from: self.tx_from,
            log_index: 0,
            event,
        }
    }

    /// Apply the next event, returning the log id it was recorded under.
    pub async fn apply(&mut self, address: Address, event: Event) -> Result<String> {
        let envelope = self.envelope(address, event);
        self.indexer.process_event(&envelope).await?;
        Ok(log_id(envelope.tx_hash, envelope.log_index))
    }

    pub async fn replay(&self, envelope: &EventEnvelope) -> Result<ProcessOutcome> {
        self.indexer.process_event(envelope).await
    }

    /// Current block height.
    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn load<E: Entity>(&self, id: &str) -> Option<E> {
        load_entity::<E>(self.store(), id).unwrap()
    }

    pub fn require<E: Entity>(&self, id: &str) -> E {
        self.load(id)
            .unwrap_or_else(|| panic!("missing {} '{}'", E::KIND, id))
    }
}
