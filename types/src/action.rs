//! Action records — the unit of optimistic processing.
//!
//! An [`ActionRecord`] is created for every accepted submission. Records that
//! reference an on-chain transaction start in [`ActionStatus::Pending`] and are
//! driven to a terminal status by the verification service; records without a
//! transaction confirm at submission.

use crate::error::TypeError;
use crate::{ActionId, CommitHash, Timestamp, TxHash, WalletAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a submitted action.
///
/// Closed set: adding a kind is a code change, every dispatch site matches
/// exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Stake,
    Unstake,
    Claim,
    Commit,
}

impl ActionKind {
    /// Every kind, in dispatch order.
    pub const ALL: [ActionKind; 4] = [Self::Stake, Self::Unstake, Self::Claim, Self::Commit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Claim => "claim",
            Self::Commit => "commit",
        }
    }
}

impl FromStr for ActionKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stake" => Ok(Self::Stake),
            "unstake" => Ok(Self::Unstake),
            "claim" => Ok(Self::Claim),
            "commit" => Ok(Self::Commit),
            other => Err(TypeError::UnknownActionKind(other.to_string())),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an [`ActionRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Accepted and applied optimistically, verification not yet started.
    Pending,
    /// A verification entry has been claimed at least once.
    Verifying,
    /// Verified on-chain (or confirmed at submission for off-chain actions).
    Confirmed,
    /// A terminal transition could not be applied; needs operator attention.
    Failed,
    /// Verification failed and the compensating mutation has been applied.
    RolledBack,
}

impl ActionStatus {
    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Verifying => "verifying",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        };
        write!(f, "{s}")
    }
}

/// Typed payload of an action, one variant per kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPayload {
    Stake {
        amount: u128,
    },
    Unstake {
        amount: u128,
    },
    Claim {
        amount: u128,
    },
    Commit {
        commit_hash: CommitHash,
        repository: String,
        /// Reward amount computed upstream by the scoring engine.
        reward: u128,
    },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Stake { .. } => ActionKind::Stake,
            Self::Unstake { .. } => ActionKind::Unstake,
            Self::Claim { .. } => ActionKind::Claim,
            Self::Commit { .. } => ActionKind::Commit,
        }
    }

    /// The token amount this payload moves (the reward for commits).
    pub fn amount(&self) -> u128 {
        match self {
            Self::Stake { amount } | Self::Unstake { amount } | Self::Claim { amount } => *amount,
            Self::Commit { reward, .. } => *reward,
        }
    }
}

/// An optimistically applied action and its verification lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub kind: ActionKind,
    pub actor: WalletAddress,
    pub payload: ActionPayload,
    /// On-chain transaction backing this action, if any.
    pub tx_hash: Option<TxHash>,
    pub status: ActionStatus,
    pub created_at: Timestamp,
    /// Set when the record reaches a terminal status.
    pub finished_at: Option<Timestamp>,
    /// Human-readable reason for `failed` / `rolled_back`.
    pub failure_reason: Option<String>,
}

impl ActionRecord {
    /// Create a record in its initial status: `pending` when a tx hash is
    /// present (awaits verification), `confirmed` otherwise.
    pub fn new(
        actor: WalletAddress,
        payload: ActionPayload,
        tx_hash: Option<TxHash>,
        now: Timestamp,
    ) -> Self {
        let (status, finished_at) = if tx_hash.is_some() {
            (ActionStatus::Pending, None)
        } else {
            (ActionStatus::Confirmed, Some(now))
        };
        Self {
            id: ActionId::generate(),
            kind: payload.kind(),
            actor,
            payload,
            tx_hash,
            status,
            created_at: now,
            finished_at,
            failure_reason: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_wallet() -> WalletAddress {
        WalletAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap()
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let err = "transfer".parse::<ActionKind>();
        assert!(matches!(err, Err(TypeError::UnknownActionKind(_))));
    }

    #[test]
    fn tx_backed_record_starts_pending() {
        let record = ActionRecord::new(
            test_wallet(),
            ActionPayload::Stake { amount: 100 },
            Some(TxHash::new([0x11; 32])),
            Timestamp::new(1_000),
        );
        assert_eq!(record.status, ActionStatus::Pending);
        assert_eq!(record.kind, ActionKind::Stake);
        assert!(record.finished_at.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn off_chain_record_confirms_at_creation() {
        let record = ActionRecord::new(
            test_wallet(),
            ActionPayload::Claim { amount: 5 },
            None,
            Timestamp::new(1_000),
        );
        assert_eq!(record.status, ActionStatus::Confirmed);
        assert_eq!(record.finished_at, Some(Timestamp::new(1_000)));
        assert!(record.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(ActionStatus::Confirmed.is_terminal());
        assert!(ActionStatus::RolledBack.is_terminal());
        assert!(ActionStatus::Failed.is_terminal());
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(!ActionStatus::Verifying.is_terminal());
    }
}
