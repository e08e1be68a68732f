//! Receipt verification for tx-backed actions.
//!
//! Each cycle claims a batch of due entries from the durable queue and
//! settles them against chain receipts. Confirmation applies the kind's
//! settlement effect; any unambiguous failure applies the compensating
//! mutation, immediately and exactly once. Ambiguous results (unknown tx,
//! missing depth, transport trouble) reschedule the entry until the
//! attempt budget runs out.

use std::sync::Arc;

use merit_actions::{compensation_for, confirm_mutation_for};
use merit_chain::{find_event, ChainEvent, ReceiptProvider, ReceiptStatus};
use merit_realtime::{BroadcastEvent, BroadcastManager, DeliveryReport};
use merit_store::{Store, StoreError};
use merit_types::{ActionRecord, Timestamp, VerificationEntry};

/// Knobs for one verification cycle.
#[derive(Clone, Copy, Debug)]
pub struct VerifierConfig {
    /// Maximum entries claimed per cycle.
    pub batch_size: usize,
    /// Delay before a not-yet-final entry becomes due again.
    pub retry_delay_secs: u64,
    /// Blocks a receipt must be buried under before it counts.
    pub min_confirmations: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            retry_delay_secs: 30,
            min_confirmations: 3,
        }
    }
}

/// How one claimed entry was settled.
#[derive(Clone, Debug)]
pub enum EntryOutcome {
    /// Receipt verified; the record is `confirmed`.
    Confirmed(ActionRecord),
    /// Unambiguous failure; compensation applied, record `rolled_back`.
    RolledBack { record: ActionRecord, reason: String },
    /// Not final yet; the entry is due again after the retry delay.
    Rescheduled,
    /// Bookkeeping failed terminally; the record is parked in `failed`.
    Parked,
}

/// Tally of one cycle, fed into the node's metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub claimed: usize,
    pub confirmed: usize,
    pub rolled_back: usize,
    pub rescheduled: usize,
    pub parked: usize,
    pub broadcasts_sent: usize,
    pub broadcast_failures: usize,
}

impl CycleStats {
    fn add_delivery(&mut self, report: DeliveryReport) {
        self.broadcasts_sent += report.sent;
        self.broadcast_failures += report.failed;
    }
}

/// What a receipt says about one entry.
enum Verdict {
    Confirmed,
    TxReverted,
    /// Receipt succeeded but the logs contradict the action.
    LogMismatch(String),
    /// Nothing conclusive yet; carries the reason for the entry log.
    NotYetFinal(String),
}

/// The background verification worker. The node owns the polling loop and
/// calls [`run_cycle`](Self::run_cycle); tests drive it the same way.
pub struct VerificationService {
    store: Arc<dyn Store>,
    chain: Arc<dyn ReceiptProvider>,
    broadcaster: Arc<BroadcastManager>,
    config: VerifierConfig,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ReceiptProvider>,
        broadcaster: Arc<BroadcastManager>,
        config: VerifierConfig,
    ) -> Self {
        Self {
            store,
            chain,
            broadcaster,
            config,
        }
    }

    /// Claim one batch of due entries and settle each in claim order.
    ///
    /// One entry's failure never aborts the rest of the batch; only the
    /// claim query itself can fail the cycle.
    pub async fn run_cycle(&self, now: Timestamp) -> Result<CycleStats, StoreError> {
        let batch = self.store.claim_due_entries(now, self.config.batch_size)?;
        let mut stats = CycleStats {
            claimed: batch.len(),
            ..CycleStats::default()
        };

        for entry in &batch {
            match self.process_entry(entry, now).await {
                EntryOutcome::Confirmed(record) => {
                    stats.confirmed += 1;
                    stats.add_delivery(self.announce(&record, None).await);
                }
                EntryOutcome::RolledBack { record, reason } => {
                    stats.rolled_back += 1;
                    stats.add_delivery(self.announce(&record, Some(&reason)).await);
                }
                EntryOutcome::Rescheduled => stats.rescheduled += 1,
                EntryOutcome::Parked => stats.parked += 1,
            }
        }

        if stats.claimed > 0 {
            tracing::debug!(
                claimed = stats.claimed,
                confirmed = stats.confirmed,
                rolled_back = stats.rolled_back,
                rescheduled = stats.rescheduled,
                "verification cycle finished"
            );
        }
        Ok(stats)
    }

    /// Settle one claimed entry, absorbing store errors into the retry or
    /// parking path so the batch keeps moving.
    pub async fn process_entry(&self, entry: &VerificationEntry, now: Timestamp) -> EntryOutcome {
        match self.settle_entry(entry, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    entry = %entry.id,
                    action = %entry.action_id,
                    "verification bookkeeping failed: {e}"
                );
                self.park_entry(entry, &e.to_string(), now)
            }
        }
    }

    async fn settle_entry(
        &self,
        entry: &VerificationEntry,
        now: Timestamp,
    ) -> Result<EntryOutcome, StoreError> {
        let record = self.store.get_action(&entry.action_id)?;

        match self.classify(entry, &record).await {
            Verdict::Confirmed => {
                let effect = confirm_mutation_for(&record);
                let updated = self.store.complete_entry(&entry.id, effect.as_ref(), now)?;
                tracing::info!(
                    action = %updated.id,
                    kind = %updated.kind,
                    tx = %entry.tx_hash,
                    "action confirmed on-chain"
                );
                Ok(EntryOutcome::Confirmed(updated))
            }
            Verdict::TxReverted => {
                self.roll_back(entry, &record, "transaction reverted".to_string(), now)
            }
            Verdict::LogMismatch(detail) => self.roll_back(entry, &record, detail, now),
            Verdict::NotYetFinal(why) => {
                if entry.attempts_exhausted() {
                    self.roll_back(
                        entry,
                        &record,
                        "verification attempts exhausted".to_string(),
                        now,
                    )
                } else {
                    let next_poll = now.plus_secs(self.config.retry_delay_secs);
                    self.store.release_entry_for_retry(&entry.id, next_poll, &why)?;
                    tracing::debug!(
                        entry = %entry.id,
                        attempts = entry.attempts,
                        max_attempts = entry.max_attempts,
                        "not yet final, rescheduled: {why}"
                    );
                    Ok(EntryOutcome::Rescheduled)
                }
            }
        }
    }

    /// Fetch the receipt and judge it against the action.
    async fn classify(&self, entry: &VerificationEntry, record: &ActionRecord) -> Verdict {
        let receipt = match self
            .chain
            .receipt(&entry.tx_hash, self.config.min_confirmations)
            .await
        {
            Ok(Some(receipt)) => receipt,
            Ok(None) => return Verdict::NotYetFinal("transaction not yet final".to_string()),
            Err(e) => return Verdict::NotYetFinal(format!("receipt lookup failed: {e}")),
        };

        if receipt.status == ReceiptStatus::Reverted {
            return Verdict::TxReverted;
        }

        let expected = ChainEvent::expected_for(record.kind);
        let Some(decoded) = find_event(&receipt.logs, expected) else {
            return Verdict::LogMismatch(format!(
                "receipt has no {} event",
                expected.signature()
            ));
        };
        if decoded.actor != record.actor {
            return Verdict::LogMismatch(format!(
                "event actor {} does not match action wallet {}",
                decoded.actor, record.actor
            ));
        }
        if decoded.amount != record.payload.amount() {
            return Verdict::LogMismatch(format!(
                "event amount {} does not match action amount {}",
                decoded.amount,
                record.payload.amount()
            ));
        }
        Verdict::Confirmed
    }

    /// Terminal failure path: compensation and rollback in one transaction.
    /// The store's status guard makes a repeat call an error, so the
    /// compensation cannot double-apply.
    fn roll_back(
        &self,
        entry: &VerificationEntry,
        record: &ActionRecord,
        reason: String,
        now: Timestamp,
    ) -> Result<EntryOutcome, StoreError> {
        let compensation = compensation_for(record);
        let updated = self.store.fail_entry(&entry.id, &compensation, &reason, now)?;
        tracing::warn!(
            action = %updated.id,
            kind = %updated.kind,
            reason = %reason,
            "action rolled back"
        );
        Ok(EntryOutcome::RolledBack {
            record: updated,
            reason,
        })
    }

    /// Last-resort handling when settling itself failed: retry if budget
    /// remains, otherwise fail the entry, and if even that fails park the
    /// record so an operator can reconcile it.
    fn park_entry(&self, entry: &VerificationEntry, error: &str, now: Timestamp) -> EntryOutcome {
        if !entry.attempts_exhausted() {
            let next_poll = now.plus_secs(self.config.retry_delay_secs);
            match self.store.release_entry_for_retry(&entry.id, next_poll, error) {
                Ok(()) => return EntryOutcome::Rescheduled,
                Err(e) => {
                    tracing::error!(entry = %entry.id, "release after error failed: {e}");
                }
            }
        }

        match self.store.get_action(&entry.action_id) {
            Ok(record) => {
                let compensation = compensation_for(&record);
                match self.store.fail_entry(&entry.id, &compensation, error, now) {
                    Ok(updated) => {
                        return EntryOutcome::RolledBack {
                            record: updated,
                            reason: error.to_string(),
                        };
                    }
                    Err(e) => {
                        tracing::error!(entry = %entry.id, "terminal failure path failed: {e}");
                    }
                }
            }
            Err(e) => {
                tracing::error!(action = %entry.action_id, "record lookup for compensation failed: {e}");
            }
        }

        if let Err(e) = self.store.mark_action_failed(&entry.action_id, error, now) {
            tracing::error!(action = %entry.action_id, "could not park action as failed: {e}");
        }
        EntryOutcome::Parked
    }

    async fn announce(&self, record: &ActionRecord, reason: Option<&str>) -> DeliveryReport {
        let event = BroadcastEvent::for_action(record, reason);
        self.broadcaster.broadcast(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use merit_actions::{ActionDispatcher, ActionRequest, DispatcherConfig};
    use merit_chain::{ChainError, EventLog, TxReceipt};
    use merit_store::{ActionStore, DomainStore, VerificationStore};
    use merit_store_lmdb::LmdbStore;
    use merit_types::{ActionStatus, TxHash, VerificationStatus, WalletAddress};
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    type Scripted = Result<Option<TxReceipt>, ChainError>;

    /// Receipt provider answering from a per-tx script, `Ok(None)` once the
    /// script (or the tx) is unknown.
    struct MockChain {
        scripts: Mutex<HashMap<TxHash, VecDeque<Scripted>>>,
    }

    impl MockChain {
        fn new(scripts: Vec<(TxHash, Vec<Scripted>)>) -> Self {
            Self {
                scripts: Mutex::new(
                    scripts
                        .into_iter()
                        .map(|(tx, outcomes)| (tx, outcomes.into_iter().collect()))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl ReceiptProvider for MockChain {
        async fn receipt(
            &self,
            tx_hash: &TxHash,
            _min_confirmations: u64,
        ) -> Result<Option<TxReceipt>, ChainError> {
            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .get_mut(tx_hash)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(Ok(None))
        }
    }

    struct Fixture {
        service: VerificationService,
        store: Arc<LmdbStore>,
        dispatcher: ActionDispatcher,
        _dir: TempDir,
    }

    /// Store, dispatcher (max 2 verification attempts) and service sharing
    /// one LMDB environment, plus a websocket stand-in receiving broadcasts.
    async fn fixture(
        scripts: Vec<(TxHash, Vec<Scripted>)>,
    ) -> (Fixture, mpsc::UnboundedReceiver<String>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap());
        let dyn_store: Arc<dyn Store> = store.clone();

        let dispatcher = ActionDispatcher::new(
            dyn_store.clone(),
            DispatcherConfig {
                commit_daily_quota: 20,
                verification_max_attempts: 2,
            },
        );
        let broadcaster = Arc::new(BroadcastManager::new());
        let service = VerificationService::new(
            dyn_store,
            Arc::new(MockChain::new(scripts)),
            broadcaster.clone(),
            VerifierConfig {
                batch_size: 20,
                retry_delay_secs: 30,
                min_confirmations: 3,
            },
        );

        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.register(tx, Timestamp::new(0)).await;

        (
            Fixture {
                service,
                store,
                dispatcher,
                _dir: dir,
            },
            rx,
        )
    }

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{:040x}", u128::from(n))).unwrap()
    }

    fn tx_hash(n: u8) -> TxHash {
        TxHash::new([n; 32])
    }

    fn tx_string(n: u8) -> String {
        format!("0x{}", hex::encode([n; 32]))
    }

    fn submit(
        fx: &Fixture,
        kind: &str,
        actor: &WalletAddress,
        payload: Value,
        tx: Option<&str>,
        now: Timestamp,
    ) -> ActionRecord {
        let request = ActionRequest::new(kind, actor.as_str(), payload, tx);
        fx.dispatcher.process(&request, now).unwrap().record
    }

    fn actor_topic(actor: &WalletAddress) -> [u8; 32] {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&hex::decode(&actor.as_str()[2..]).unwrap());
        topic
    }

    fn amount_word(amount: u128) -> Vec<u8> {
        let mut word = vec![0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        word
    }

    fn matching_log(event: ChainEvent, actor: &WalletAddress, amount: u128) -> EventLog {
        EventLog {
            address: "0xabcd000000000000000000000000000000000001".into(),
            topics: vec![event.topic(), actor_topic(actor)],
            data: amount_word(amount),
        }
    }

    fn receipt(tx: TxHash, status: ReceiptStatus, logs: Vec<EventLog>) -> TxReceipt {
        TxReceipt {
            tx_hash: tx,
            block_number: 100,
            status,
            confirmations: 6,
            logs,
        }
    }

    #[tokio::test]
    async fn confirms_a_matching_stake_receipt() {
        let actor = wallet(1);
        let tx = tx_hash(0x11);
        let (fx, mut rx) = fixture(vec![(
            tx,
            vec![Ok(Some(receipt(
                tx,
                ReceiptStatus::Success,
                vec![matching_log(ChainEvent::Staked, &actor, 500)],
            )))],
        )]).await;

        let record = submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 500 }),
            Some(&tx_string(0x11)),
            Timestamp::new(1_000),
        );
        assert_eq!(record.status, ActionStatus::Pending);

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.claimed, 1);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.broadcasts_sent, 1);

        let updated = fx.store.get_action(&record.id).unwrap();
        assert_eq!(updated.status, ActionStatus::Confirmed);
        assert!(updated.finished_at.is_some());

        let entry = fx.store.entry_for_action(&record.id).unwrap().unwrap();
        assert_eq!(entry.status, VerificationStatus::Completed);

        let envelope: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(envelope["type"], "staking_update");
        assert_eq!(envelope["payload"]["status"], "confirmed");
        assert_eq!(envelope["payload"]["wallet"], actor.to_string());
    }

    #[tokio::test]
    async fn unstake_confirmation_applies_the_settlement() {
        let actor = wallet(2);
        let tx = tx_hash(0x22);
        let (fx, _rx) = fixture(vec![(
            tx,
            vec![Ok(Some(receipt(
                tx,
                ReceiptStatus::Success,
                vec![matching_log(ChainEvent::Unstaked, &actor, 40)],
            )))],
        )]).await;

        // Off-chain stake confirms at submission and funds the position.
        submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 100 }),
            None,
            Timestamp::new(1_000),
        );
        submit(
            &fx,
            "unstake",
            &actor,
            json!({ "amount": 40 }),
            Some(&tx_string(0x22)),
            Timestamp::new(1_001),
        );

        let position = fx.store.staking_position(&actor).unwrap();
        assert_eq!(position.staked, 60);
        assert_eq!(position.unbonding, 40);

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.confirmed, 1);

        let position = fx.store.staking_position(&actor).unwrap();
        assert_eq!(position.staked, 60);
        assert_eq!(position.unbonding, 0);
    }

    #[tokio::test]
    async fn reverted_receipt_compensates_immediately() {
        let actor = wallet(3);
        let tx = tx_hash(0x33);
        let (fx, mut rx) = fixture(vec![(
            tx,
            vec![Ok(Some(receipt(tx, ReceiptStatus::Reverted, vec![])))],
        )]).await;

        let record = submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 500 }),
            Some(&tx_string(0x33)),
            Timestamp::new(1_000),
        );
        assert_eq!(fx.store.staking_position(&actor).unwrap().staked, 500);

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.rolled_back, 1);
        assert_eq!(stats.rescheduled, 0);

        let updated = fx.store.get_action(&record.id).unwrap();
        assert_eq!(updated.status, ActionStatus::RolledBack);
        assert_eq!(updated.failure_reason.as_deref(), Some("transaction reverted"));
        assert_eq!(fx.store.staking_position(&actor).unwrap().staked, 0);

        let entry = fx.store.entry_for_action(&record.id).unwrap().unwrap();
        assert_eq!(entry.status, VerificationStatus::Failed);

        let envelope: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(envelope["payload"]["status"], "rolled_back");
        assert_eq!(envelope["payload"]["reason"], "transaction reverted");

        // Terminal entries never come back, so the rollback cannot repeat.
        let stats = fx.service.run_cycle(Timestamp::new(2_000)).await.unwrap();
        assert_eq!(stats.claimed, 0);
        assert_eq!(fx.store.staking_position(&actor).unwrap().staked, 0);
    }

    #[tokio::test]
    async fn missing_event_rolls_back() {
        let actor = wallet(4);
        let tx = tx_hash(0x44);
        let (fx, _rx) = fixture(vec![(
            tx,
            vec![Ok(Some(receipt(tx, ReceiptStatus::Success, vec![])))],
        )]).await;

        let record = submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 500 }),
            Some(&tx_string(0x44)),
            Timestamp::new(1_000),
        );

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.rolled_back, 1);

        let updated = fx.store.get_action(&record.id).unwrap();
        assert_eq!(updated.status, ActionStatus::RolledBack);
        assert!(updated
            .failure_reason
            .unwrap()
            .contains("Staked(address,uint256)"));
        assert_eq!(fx.store.staking_position(&actor).unwrap().staked, 0);
    }

    #[tokio::test]
    async fn amount_mismatch_rolls_back() {
        let actor = wallet(5);
        let tx = tx_hash(0x55);
        let (fx, _rx) = fixture(vec![(
            tx,
            vec![Ok(Some(receipt(
                tx,
                ReceiptStatus::Success,
                vec![matching_log(ChainEvent::Staked, &actor, 499)],
            )))],
        )]).await;

        let record = submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 500 }),
            Some(&tx_string(0x55)),
            Timestamp::new(1_000),
        );

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.rolled_back, 1);

        let reason = fx
            .store
            .get_action(&record.id)
            .unwrap()
            .failure_reason
            .unwrap();
        assert!(reason.contains("499"), "unexpected reason: {reason}");
    }

    #[tokio::test]
    async fn pending_tx_retries_then_exhausts() {
        let actor = wallet(6);
        let tx = tx_hash(0x66);
        // Two attempts allowed, receipt never appears.
        let (fx, _rx) = fixture(vec![(tx, vec![Ok(None), Ok(None)])]).await;

        let record = submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 500 }),
            Some(&tx_string(0x66)),
            Timestamp::new(1_000),
        );

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.rescheduled, 1);

        let entry = fx.store.entry_for_action(&record.id).unwrap().unwrap();
        assert_eq!(entry.status, VerificationStatus::Pending);
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.scheduled_for, Timestamp::new(1_040));
        assert_eq!(
            entry.error_message.as_deref(),
            Some("transaction not yet final")
        );

        // Not due again until the retry delay passes.
        let stats = fx.service.run_cycle(Timestamp::new(1_020)).await.unwrap();
        assert_eq!(stats.claimed, 0);

        // Second and final attempt, still nothing: compensation fires.
        let stats = fx.service.run_cycle(Timestamp::new(1_040)).await.unwrap();
        assert_eq!(stats.rolled_back, 1);

        let updated = fx.store.get_action(&record.id).unwrap();
        assert_eq!(updated.status, ActionStatus::RolledBack);
        assert_eq!(
            updated.failure_reason.as_deref(),
            Some("verification attempts exhausted")
        );
        assert_eq!(fx.store.staking_position(&actor).unwrap().staked, 0);

        let stats = fx.service.run_cycle(Timestamp::new(2_000)).await.unwrap();
        assert_eq!(stats.claimed, 0);
    }

    #[tokio::test]
    async fn transport_errors_are_retried() {
        let actor = wallet(7);
        let tx = tx_hash(0x77);
        let (fx, _rx) = fixture(vec![(
            tx,
            vec![Err(ChainError::Transport("connection refused".to_string()))],
        )]).await;

        let record = submit(
            &fx,
            "stake",
            &actor,
            json!({ "amount": 500 }),
            Some(&tx_string(0x77)),
            Timestamp::new(1_000),
        );

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.rescheduled, 1);

        let entry = fx.store.entry_for_action(&record.id).unwrap().unwrap();
        assert_eq!(entry.status, VerificationStatus::Pending);
        assert!(entry
            .error_message
            .unwrap()
            .contains("receipt lookup failed"));
        // The optimistic position survives while retries continue.
        assert_eq!(fx.store.staking_position(&actor).unwrap().staked, 500);
    }

    #[tokio::test]
    async fn one_entrys_trouble_never_blocks_the_batch() {
        let actor_a = wallet(8);
        let actor_b = wallet(9);
        let tx_a = tx_hash(0x88);
        let tx_b = tx_hash(0x99);
        let (fx, _rx) = fixture(vec![
            (tx_a, vec![Err(ChainError::Timeout("eth_getTransactionReceipt".to_string()))]),
            (
                tx_b,
                vec![Ok(Some(receipt(
                    tx_b,
                    ReceiptStatus::Success,
                    vec![matching_log(ChainEvent::Staked, &actor_b, 200)],
                )))],
            ),
        ]).await;

        submit(
            &fx,
            "stake",
            &actor_a,
            json!({ "amount": 100 }),
            Some(&tx_string(0x88)),
            Timestamp::new(1_000),
        );
        submit(
            &fx,
            "stake",
            &actor_b,
            json!({ "amount": 200 }),
            Some(&tx_string(0x99)),
            Timestamp::new(1_001),
        );

        let stats = fx.service.run_cycle(Timestamp::new(1_010)).await.unwrap();
        assert_eq!(stats.claimed, 2);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.rescheduled, 1);
        assert_eq!(fx.store.staking_position(&actor_b).unwrap().staked, 200);
    }
}
