//! Sequential event processor
//!
//! Applies envelopes one at a time in chain order. Each envelope is
//! dispatched against a fresh [`HandlerContext`]; its staged writes and the
//! advanced cursor are committed together, so an event is either fully
//! applied or leaves no trace.

use crate::dispatch::{dispatch, EventMeta, HandlerContext};
use crate::error::ProjectionError;
use crate::keys::address_id;
use crate::reader::ContractReader;
use crate::sources::{register_source, DataSource, SourceContext, SourceKind};
use crate::store::{load_entity, EntityStore};
use crate::txn::EntityTx;
use crate::types::EventEnvelope;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// What happened to one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Applied,
    /// At or before the cursor: already applied
    Skipped,
}

/// Counters for one replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub applied: u64,
    pub skipped: u64,
}

pub struct Indexer<S: EntityStore, R: ContractReader> {
    store: S,
    reader: R,
}

impl<S: EntityStore, R: ContractReader> Indexer<S, R> {
    pub fn new(store: S, reader: R) -> Self {
        Self { store, reader }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Register manifest sources. Already registered addresses are left
    /// untouched. Returns the number of new registrations.
    pub fn register_static_sources(&self, sources: &[(SourceKind, Address)]) -> Result<usize> {
        let mut tx = EntityTx::new(&self.store);
        let mut added = 0;
        for (kind, address) in sources {
            if !kind.is_static() {
                anyhow::bail!(
                    "{} cannot be declared statically (0x{:x}); it is discovered through its parent",
                    kind,
                    address
                );
            }
            if register_source(&mut tx, *address, *kind, SourceContext::new(), 0)? {
                added += 1;
            }
        }
        self.store
            .commit(tx.into_changes())
            .context("Failed to commit static sources")?;
        Ok(added)
    }

    /// Apply one envelope.
    pub async fn process_event(&self, envelope: &EventEnvelope) -> Result<ProcessOutcome> {
        let position = envelope.position();
        if let Some(cursor) = self.store.get_cursor()? {
            if position <= cursor {
                debug!(
                    "Skipping {} at {}:{}, already applied (cursor {}:{})",
                    envelope.event.name(),
                    position.block_number,
                    position.log_index,
                    cursor.block_number,
                    cursor.log_index
                );
                return Ok(ProcessOutcome::Skipped);
            }
        }

        let source: DataSource = load_entity(&self.store, &address_id(envelope.address))?
            .ok_or(ProjectionError::UnknownSource(envelope.address))?;

        let meta = EventMeta::new(envelope, source.context.clone());
        let mut ctx = HandlerContext::new(&self.store, &self.reader, &meta);
        dispatch(&mut ctx, source.kind, &envelope.event)
            .await
            .with_context(|| {
                format!(
                    "Failed to apply {} from {} {} at {}:{}",
                    envelope.event.name(),
                    source.kind,
                    source.id,
                    position.block_number,
                    position.log_index
                )
            })?;

        let mut changes = ctx.into_changes();
        let writes = changes.len();
        changes.set_cursor(position);
        self.store.commit(changes)?;

        info!(
            "Applied {} from {} {} at {}:{} ({} writes)",
            envelope.event.name(),
            source.kind,
            source.id,
            position.block_number,
            position.log_index,
            writes
        );
        Ok(ProcessOutcome::Applied)
    }

    /// Replay a JSON-lines envelope file. Blank lines are ignored; the
    /// first failing envelope stops the run.
    pub async fn run(&self, path: &Path) -> Result<RunStats> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open event stream {:?}", path))?;
        let mut lines = BufReader::new(file).lines();
        let mut stats = RunStats::default();
        let mut line_no = 0u64;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let envelope = EventEnvelope::from_json_line(line)
                .with_context(|| format!("Invalid envelope on line {}", line_no))?;
            match self.process_event(&envelope).await? {
                ProcessOutcome::Applied => stats.applied += 1,
                ProcessOutcome::Skipped => stats.skipped += 1,
            }
        }

        info!(
            "Replay of {:?} finished: {} applied, {} skipped",
            path, stats.applied, stats.skipped
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::pair_id;
    use crate::records::{
        ClaimEscrow, EscrowSupplyTokenDeposit, Factory, RequestStatus, VerifyAddress, VerifyStatus,
    };
    use crate::sources::FactoryKind;
    use crate::store::MemoryEntityStore;
    use crate::testing::{Harness, MockReader};
    use crate::types::{
        ClaimEscrowEvent, EscrowTransfer, Event, Evidence, FactoryEvent, NewChild, VerifyEvent,
    };
    use alloy_primitives::{address, Bytes, U256};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FACTORY: Address = address!("000000000000000000000000000000000000000f");
    const CHILD: Address = address!("00000000000000000000000000000000000000c1");
    const ESCROW: Address = address!("00000000000000000000000000000000000000ec");
    const ACCOUNT: Address = address!("000000000000000000000000000000000000000a");

    fn new_child(child: Address) -> Event {
        Event::Factory(FactoryEvent::NewChild(NewChild {
            sender: Address::ZERO,
            child,
        }))
    }

    fn escrow_deposit(amount: u64) -> Event {
        Event::ClaimEscrow(ClaimEscrowEvent::Deposit(EscrowTransfer {
            sender: ACCOUNT,
            sale: address!("0000000000000000000000000000000000000051"),
            redeemable: address!("00000000000000000000000000000000000000e2"),
            token: address!("00000000000000000000000000000000000000e8"),
            supply: U256::from(10u64),
            amount: U256::from(amount),
        }))
    }

    #[tokio::test]
    async fn test_replayed_event_is_skipped_without_changes() {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::Verify), SourceContext::new());

        let envelope = harness.envelope(FACTORY, new_child(CHILD));
        assert_eq!(harness.replay(&envelope).await.unwrap(), ProcessOutcome::Applied);
        let before = harness.store().snapshot().unwrap();

        assert_eq!(harness.replay(&envelope).await.unwrap(), ProcessOutcome::Skipped);
        assert_eq!(harness.store().snapshot().unwrap(), before);

        let factory: Factory = harness.require(&address_id(FACTORY));
        assert_eq!(factory.children_count, 1);
    }

    #[tokio::test]
    async fn test_same_events_on_fresh_stores_give_same_state() {
        let mut first = Harness::new();
        let mut second = Harness::new();
        for harness in [&mut first, &mut second] {
            harness.add_source(ESCROW, SourceKind::ClaimEscrow, SourceContext::new());
            harness.apply(ESCROW, escrow_deposit(3)).await.unwrap();
            harness.apply(ESCROW, escrow_deposit(4)).await.unwrap();
        }
        assert_eq!(
            first.store().snapshot().unwrap(),
            second.store().snapshot().unwrap()
        );
    }

    #[tokio::test]
    async fn test_failed_event_leaves_no_writes() {
        let mut harness = Harness::new();
        harness.add_source(ESCROW, SourceKind::ClaimEscrow, SourceContext::new());
        harness.apply(ESCROW, escrow_deposit(5)).await.unwrap();
        let before = harness.store().snapshot().unwrap();
        let cursor = harness.store().get_cursor().unwrap();

        // The withdraw stages a log and a withdrawer before underflowing
        let withdraw = Event::ClaimEscrow(ClaimEscrowEvent::Withdraw(EscrowTransfer {
            sender: ACCOUNT,
            sale: address!("0000000000000000000000000000000000000051"),
            redeemable: address!("00000000000000000000000000000000000000e2"),
            token: address!("00000000000000000000000000000000000000e8"),
            supply: U256::from(10u64),
            amount: U256::from(6u64),
        }));
        let err = harness.apply(ESCROW, withdraw).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProjectionError>(),
            Some(ProjectionError::Underflow { .. })
        ));

        assert_eq!(harness.store().snapshot().unwrap(), before);
        assert_eq!(harness.store().get_cursor().unwrap(), cursor);
        let escrow: ClaimEscrow = harness.require(&address_id(ESCROW));
        assert!(escrow.withdraws.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_address_is_rejected() {
        let mut harness = Harness::new();
        let err = harness.apply(CHILD, new_child(CHILD)).await.unwrap_err();
        match err.downcast_ref::<ProjectionError>() {
            Some(ProjectionError::UnknownSource(addr)) => assert_eq!(*addr, CHILD),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(harness.store().get_cursor().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verification_flow_scenario() {
        let mut harness = Harness::new();
        harness.add_source(FACTORY, SourceKind::Factory(FactoryKind::Verify), SourceContext::new());
        harness.apply(FACTORY, new_child(CHILD)).await.unwrap();

        let evidence = Evidence {
            sender: ACCOUNT,
            account: ACCOUNT,
            data: Bytes::new(),
        };
        harness
            .apply(CHILD, Event::Verify(VerifyEvent::RequestApprove(evidence.clone())))
            .await
            .unwrap();
        harness
            .apply(CHILD, Event::Verify(VerifyEvent::Approve(evidence)))
            .await
            .unwrap();

        let record: VerifyAddress = harness.require(&pair_id(CHILD, ACCOUNT));
        assert_eq!(record.request_status, RequestStatus::None);
        assert_eq!(record.status, VerifyStatus::Approved);
        assert_eq!(record.events.len(), 2);
    }

    #[tokio::test]
    async fn test_append_only_log_growth() {
        let mut harness = Harness::new();
        harness.add_source(ESCROW, SourceKind::ClaimEscrow, SourceContext::new());
        harness.apply(ESCROW, escrow_deposit(3)).await.unwrap();
        harness.apply(ESCROW, escrow_deposit(4)).await.unwrap();

        let aggregate: EscrowSupplyTokenDeposit = harness.require(&crate::keys::supply_aggregate_id(
            ESCROW,
            address!("0000000000000000000000000000000000000051"),
            U256::from(10u64),
            address!("00000000000000000000000000000000000000e8"),
        ));
        assert_eq!(aggregate.deposits.len(), 2);
        assert_eq!(aggregate.total_deposited, U256::from(7u64));
    }

    #[test]
    fn test_static_sources_register_once() {
        let indexer = Indexer::new(MemoryEntityStore::new(), MockReader::new());
        let sources = [
            (SourceKind::Factory(FactoryKind::Trust), FACTORY),
            (SourceKind::ClaimEscrow, ESCROW),
        ];
        assert_eq!(indexer.register_static_sources(&sources).unwrap(), 2);
        assert_eq!(indexer.register_static_sources(&sources).unwrap(), 0);

        let source: DataSource = load_entity(indexer.store(), &address_id(ESCROW))
            .unwrap()
            .unwrap();
        assert_eq!(source.kind, SourceKind::ClaimEscrow);
        assert!(indexer
            .register_static_sources(&[(SourceKind::Trust, CHILD)])
            .is_err());
    }

    #[tokio::test]
    async fn test_run_replays_json_lines() {
        let indexer = Indexer::new(MemoryEntityStore::new(), MockReader::new());
        indexer
            .register_static_sources(&[(SourceKind::Factory(FactoryKind::Verify), FACTORY)])
            .unwrap();

        let line = |block: u64, child: &str| {
            format!(
                r#"{{"address":"0x000000000000000000000000000000000000000f","blockNumber":{},"blockTimestamp":"0x64","txHash":"0x{:064x}","txFrom":"0x00000000000000000000000000000000000000d0","logIndex":0,"event":{{"source":"Factory","event":{{"name":"NewChild","params":{{"sender":"0x0000000000000000000000000000000000000000","child":"{}"}}}}}}}}"#,
                block, block, child
            )
        };
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", line(1, "0x00000000000000000000000000000000000000c1")).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", line(2, "0x00000000000000000000000000000000000000c2")).unwrap();
        // Duplicate delivery of the first line
        writeln!(file, "{}", line(1, "0x00000000000000000000000000000000000000c1")).unwrap();
        file.flush().unwrap();

        let stats = indexer.run(file.path()).await.unwrap();
        assert_eq!(stats, RunStats { applied: 2, skipped: 1 });

        let factory: Factory = load_entity(indexer.store(), &address_id(FACTORY))
            .unwrap()
            .unwrap();
        assert_eq!(factory.children_count, 2);
    }
}
