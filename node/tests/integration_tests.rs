//! Integration tests exercising the full action pipeline:
//! submission → optimistic effect → receipt verification → settlement or
//! rollback → realtime fanout.
//!
//! These tests wire together components that are normally only connected
//! inside `node.rs`, with a scripted receipt provider standing in for a
//! live JSON-RPC endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use merit_actions::{ActionError, ActionRequest};
use merit_chain::{ChainError, ChainEvent, EventLog, ReceiptProvider, ReceiptStatus, TxReceipt};
use merit_node::{MeritNode, NodeConfig, NodeError};
use merit_store::CommitStatus;
use merit_types::{ActionStatus, CommitHash, Timestamp, TxHash, VerificationStatus, WalletAddress};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Scripted = Result<Option<TxReceipt>, ChainError>;

/// Receipt provider that replays a per-transaction queue of responses.
/// Once a queue runs dry the transaction reads as not-yet-mined.
struct ScriptedChain {
    scripts: Mutex<HashMap<TxHash, VecDeque<Scripted>>>,
}

impl ScriptedChain {
    fn new(scripts: Vec<(TxHash, Vec<Scripted>)>) -> Self {
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(tx, queue)| (tx, queue.into_iter().collect()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ReceiptProvider for ScriptedChain {
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

fn test_config(dir: &tempfile::TempDir) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().to_path_buf(),
        verification_max_attempts: 2,
        retry_delay_secs: 30,
        lmdb_map_size_mb: 16,
        realtime_port: 0,
        ..NodeConfig::default()
    }
}

fn make_node(scripts: Vec<(TxHash, Vec<Scripted>)>) -> (MeritNode, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = test_config(&dir);
    let node = MeritNode::with_receipt_provider(config, Arc::new(ScriptedChain::new(scripts)))
        .expect("open node");
    (node, dir)
}

/// Attach a raw subscriber to the broadcaster, bypassing the WebSocket
/// transport. Every delivered envelope lands on the returned receiver.
async fn subscribe(node: &MeritNode) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    node.broadcaster.register(tx, Timestamp::now()).await;
    rx
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

fn envelope(rx: &mut mpsc::UnboundedReceiver<String>) -> Value {
    let text = rx.try_recv().expect("expected a broadcast envelope");
    serde_json::from_str(&text).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Stake: optimistic apply, on-chain confirmation, fanout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stake_settles_end_to_end() {
    let actor = wallet(1);
    let (node, _dir) = make_node(vec![(
        tx_hash(0x11),
        vec![Ok(Some(receipt(
            tx_hash(0x11),
            ReceiptStatus::Success,
            vec![matching_log(ChainEvent::Staked, &actor, 500)],
        )))],
    )]);
    let mut rx = subscribe(&node).await;

    let request = ActionRequest::new(
        "stake",
        actor.as_str(),
        json!({ "amount": 500 }),
        Some(&tx_string(0x11)),
    );
    let outcome = node.submit_action(&request).await.unwrap();

    // The effect is visible before the chain has said anything.
    assert_eq!(outcome.record.status, ActionStatus::Pending);
    let position = node.staking_position(&actor).unwrap();
    assert_eq!(position.staked, 500);
    assert_eq!(node.metrics.actions_submitted.get(), 1);

    let entry = node
        .verification_entry_for_action(&outcome.record.id)
        .unwrap()
        .expect("pending action has a verification entry");
    assert_eq!(entry.status, VerificationStatus::Pending);

    let stats = node.service.run_cycle(Timestamp::now()).await.unwrap();
    assert_eq!(stats.claimed, 1);
    assert_eq!(stats.confirmed, 1);
    assert_eq!(stats.broadcasts_sent, 1);

    let record = node.action(&outcome.record.id).unwrap();
    assert_eq!(record.status, ActionStatus::Confirmed);
    assert!(record.finished_at.is_some());

    let event = envelope(&mut rx);
    assert_eq!(event["type"], "staking_update");
    assert_eq!(event["payload"]["status"], "confirmed");
    assert_eq!(event["payload"]["wallet"], actor.to_string());
    assert_eq!(event["payload"]["amount"], "500");
}

// ---------------------------------------------------------------------------
// 2. Claim: off-chain actions confirm at submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn claim_confirms_at_submission_and_broadcasts() {
    let actor = wallet(2);
    let (node, _dir) = make_node(Vec::new());

    // Accrue a reward first; the commit itself stays pending.
    let commit = ActionRequest::new(
        "commit",
        actor.as_str(),
        json!({ "commit_hash": "ab".repeat(20), "repository": "merit/core", "reward": 40 }),
        Some(&tx_string(0x21)),
    );
    node.submit_action(&commit).await.unwrap();
    assert_eq!(node.staking_position(&actor).unwrap().rewards_accrued, 40);

    let mut rx = subscribe(&node).await;
    let claim = ActionRequest::new("claim", actor.as_str(), json!({ "amount": 40 }), None);
    let outcome = node.submit_action(&claim).await.unwrap();

    assert_eq!(outcome.record.status, ActionStatus::Confirmed);
    assert!(outcome.record.finished_at.is_some());
    assert!(node
        .verification_entry_for_action(&outcome.record.id)
        .unwrap()
        .is_none());

    let position = node.staking_position(&actor).unwrap();
    assert_eq!(position.rewards_accrued, 0);
    assert_eq!(position.rewards_claimed, 40);

    // No cycle ran; the broadcast came straight from the submission path.
    let event = envelope(&mut rx);
    assert_eq!(event["type"], "reward_update");
    assert_eq!(event["payload"]["status"], "confirmed");
    assert_eq!(event["payload"]["amount"], "40");
    assert_eq!(node.metrics.broadcasts_sent.get(), 1);
}

// ---------------------------------------------------------------------------
// 3. Commit: reverted transaction takes the reward back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reverted_commit_rolls_back_reward_and_row() {
    let actor = wallet(3);
    let (node, _dir) = make_node(vec![(
        tx_hash(0x22),
        vec![Ok(Some(receipt(tx_hash(0x22), ReceiptStatus::Reverted, vec![])))],
    )]);
    let mut rx = subscribe(&node).await;

    let commit_hash = "cd".repeat(20);
    let request = ActionRequest::new(
        "commit",
        actor.as_str(),
        json!({ "commit_hash": commit_hash.clone(), "repository": "merit/core", "reward": 75 }),
        Some(&tx_string(0x22)),
    );
    let outcome = node.submit_action(&request).await.unwrap();
    assert_eq!(node.staking_position(&actor).unwrap().rewards_accrued, 75);

    let row = node
        .commit_record(&CommitHash::parse(&commit_hash).unwrap())
        .unwrap()
        .expect("commit row inserted at submission");
    assert_eq!(row.status, CommitStatus::Pending);

    let stats = node.service.run_cycle(Timestamp::now()).await.unwrap();
    assert_eq!(stats.rolled_back, 1);

    let record = node.action(&outcome.record.id).unwrap();
    assert_eq!(record.status, ActionStatus::Failed);
    assert_eq!(record.failure_reason.as_deref(), Some("transaction reverted"));

    assert_eq!(node.staking_position(&actor).unwrap().rewards_accrued, 0);
    let row = node
        .commit_record(&CommitHash::parse(&commit_hash).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(row.status, CommitStatus::Reversed);

    let event = envelope(&mut rx);
    assert_eq!(event["type"], "commit_update");
    assert_eq!(event["payload"]["status"], "failed");
    assert_eq!(event["payload"]["reason"], "transaction reverted");
}

// ---------------------------------------------------------------------------
// 4. Unstake: retry while unmined, settle once the receipt lands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unstake_retries_then_settles() {
    let actor = wallet(4);
    let (node, _dir) = make_node(vec![(
        tx_hash(0x33),
        vec![
            Ok(None),
            Ok(Some(receipt(
                tx_hash(0x33),
                ReceiptStatus::Success,
                vec![matching_log(ChainEvent::Unstaked, &actor, 40)],
            ))),
        ],
    )]);

    let seed = ActionRequest::new("stake", actor.as_str(), json!({ "amount": 100 }), None);
    node.submit_action(&seed).await.unwrap();

    let request = ActionRequest::new(
        "unstake",
        actor.as_str(),
        json!({ "amount": 40 }),
        Some(&tx_string(0x33)),
    );
    let outcome = node.submit_action(&request).await.unwrap();
    let t0 = Timestamp::now();

    let position = node.staking_position(&actor).unwrap();
    assert_eq!(position.staked, 60);
    assert_eq!(position.unbonding, 40);

    // First look: not mined yet, rescheduled 30s out.
    let stats = node.service.run_cycle(t0).await.unwrap();
    assert_eq!(stats.rescheduled, 1);

    // Not due yet.
    let stats = node.service.run_cycle(t0.plus_secs(10)).await.unwrap();
    assert_eq!(stats.claimed, 0);

    // Due again; the receipt is there this time.
    let stats = node.service.run_cycle(t0.plus_secs(31)).await.unwrap();
    assert_eq!(stats.confirmed, 1);

    let record = node.action(&outcome.record.id).unwrap();
    assert_eq!(record.status, ActionStatus::Confirmed);
    let position = node.staking_position(&actor).unwrap();
    assert_eq!(position.staked, 60);
    assert_eq!(position.unbonding, 0);
}

// ---------------------------------------------------------------------------
// 5. Quota and validation failures surface at submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn commit_quota_rejections_count_as_errors() {
    let actor = wallet(5);
    let dir = tempfile::tempdir().expect("temp dir");
    let config = NodeConfig {
        commit_daily_quota: 2,
        ..test_config(&dir)
    };
    let node = MeritNode::with_receipt_provider(config, Arc::new(ScriptedChain::new(Vec::new())))
        .expect("open node");

    for n in 0..2u8 {
        let request = ActionRequest::new(
            "commit",
            actor.as_str(),
            json!({
                "commit_hash": format!("{:02x}", n).repeat(20),
                "repository": "merit/core",
                "reward": 10,
            }),
            None,
        );
        node.submit_action(&request).await.unwrap();
    }

    let request = ActionRequest::new(
        "commit",
        actor.as_str(),
        json!({ "commit_hash": "ff".repeat(20), "repository": "merit/core", "reward": 10 }),
        None,
    );
    let err = node.submit_action(&request).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Action(ActionError::QuotaExceeded { cap: 2, .. })
    ));

    assert_eq!(node.metrics.actions_submitted.get(), 2);
    assert_eq!(node.metrics.action_errors.get(), 1);
}

#[tokio::test]
async fn overdrawn_unstake_is_rejected() {
    let actor = wallet(6);
    let (node, _dir) = make_node(Vec::new());

    let request = ActionRequest::new(
        "unstake",
        actor.as_str(),
        json!({ "amount": 10 }),
        Some(&tx_string(0x44)),
    );
    let err = node.submit_action(&request).await.unwrap_err();
    assert!(matches!(err, NodeError::Action(ActionError::Validation(_))));

    // Nothing was written.
    assert!(node.actions_for_wallet(&actor, 10).unwrap().is_empty());
    assert_eq!(node.staking_position(&actor).unwrap().unbonding, 0);
}

// ---------------------------------------------------------------------------
// 6. Node lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn node_starts_and_stops_cleanly() {
    let (mut node, _dir) = make_node(Vec::new());
    node.start().await.unwrap();

    let actor = wallet(7);
    let request = ActionRequest::new("stake", actor.as_str(), json!({ "amount": 5 }), None);
    node.submit_action(&request).await.unwrap();

    node.stop().await.unwrap();
    assert_eq!(node.staking_position(&actor).unwrap().staked, 5);
}
