//! Durable verification queue entries.

use crate::{ActionId, ActionKind, ActionRecord, EntryId, Timestamp, TxHash, WalletAddress};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a [`VerificationEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Waiting for its `scheduled_for` time.
    Pending,
    /// Claimed by the verification loop for the current cycle.
    Processing,
    /// Receipt verified, owning record confirmed.
    Completed,
    /// Verification failed or retries exhausted; compensation applied.
    Failed,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A durable work item tracking the on-chain verification of one action.
///
/// Exactly one entry exists per tx-backed action record. Entries are never
/// deleted by the pipeline; terminal entries move to the archive table once
/// the retention window passes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    pub id: EntryId,
    pub action_id: ActionId,
    pub kind: ActionKind,
    pub actor: WalletAddress,
    pub tx_hash: TxHash,
    pub status: VerificationStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Earliest time the next poll may pick this entry up. Batches claim in
    /// ascending `scheduled_for` order.
    pub scheduled_for: Timestamp,
    pub last_attempt_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl VerificationEntry {
    /// Create a pending entry for a tx-backed record, scheduled immediately.
    pub fn new(record: &ActionRecord, tx_hash: TxHash, max_attempts: u32, now: Timestamp) -> Self {
        Self {
            id: EntryId::generate(),
            action_id: record.id,
            kind: record.kind,
            actor: record.actor.clone(),
            tx_hash,
            status: VerificationStatus::Pending,
            attempts: 0,
            max_attempts,
            scheduled_for: now,
            last_attempt_at: None,
            error_message: None,
            created_at: now,
            finished_at: None,
        }
    }

    /// Whether the retry budget is spent.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Whether a claim may pick this entry up at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == VerificationStatus::Pending
            && self.scheduled_for <= now
            && !self.attempts_exhausted()
    }
}
