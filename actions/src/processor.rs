//! The per-kind processor trait and the mutation tables shared by the
//! submission path and the verification service.

use merit_store::{CommitRecord, CommitStatus, DomainMutation, Store};
use merit_types::{ActionKind, ActionPayload, ActionRecord, Timestamp, WalletAddress};
use serde_json::Value;

use crate::dispatcher::DispatcherConfig;
use crate::error::ActionError;

/// One implementation per [`ActionKind`]. Dispatch is an exhaustive match
/// in [`crate::dispatcher::processor_for`].
pub trait ActionProcessor: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// Structural validation: turn the raw payload into a typed one, or
    /// reject it before anything touches storage.
    fn validate(&self, payload: &Value) -> Result<ActionPayload, ActionError>;

    /// Stateful pre-checks against current domain state. Advisory only:
    /// anything racy is re-checked inside the submit transaction.
    fn pre_submit(
        &self,
        _store: &dyn Store,
        _actor: &WalletAddress,
        _payload: &ActionPayload,
        _config: &DispatcherConfig,
        _now: Timestamp,
    ) -> Result<(), ActionError> {
        Ok(())
    }

    /// The optimistic mutation applied when the record is accepted.
    fn optimistic_mutation(&self, record: &ActionRecord) -> DomainMutation {
        optimistic_mutation_for(record)
    }

    /// The side effect applied when verification confirms the record.
    fn confirm_mutation(&self, record: &ActionRecord) -> Option<DomainMutation> {
        confirm_mutation_for(record)
    }

    /// The corrective mutation that undoes the optimistic write.
    fn compensation(&self, record: &ActionRecord) -> DomainMutation {
        compensation_for(record)
    }
}

/// The optimistic mutation a record applies at submission.
pub fn optimistic_mutation_for(record: &ActionRecord) -> DomainMutation {
    match &record.payload {
        ActionPayload::Stake { amount } => DomainMutation::Stake {
            wallet: record.actor.clone(),
            amount: *amount,
        },
        ActionPayload::Unstake { amount } => DomainMutation::BeginUnstake {
            wallet: record.actor.clone(),
            amount: *amount,
        },
        ActionPayload::Claim { amount } => DomainMutation::Claim {
            wallet: record.actor.clone(),
            amount: *amount,
        },
        ActionPayload::Commit {
            commit_hash,
            repository,
            reward,
        } => DomainMutation::RewardCommit {
            record: CommitRecord {
                commit_hash: commit_hash.clone(),
                wallet: record.actor.clone(),
                repository: repository.clone(),
                reward: *reward,
                action_id: record.id,
                // Off-chain rewards settle at submission; tx-backed ones
                // stay pending until verified.
                status: if record.tx_hash.is_some() {
                    CommitStatus::Pending
                } else {
                    CommitStatus::Rewarded
                },
                recorded_at: record.created_at,
            },
        },
    }
}

/// The side effect applied when verification confirms the record, if the
/// kind has one.
pub fn confirm_mutation_for(record: &ActionRecord) -> Option<DomainMutation> {
    match &record.payload {
        ActionPayload::Stake { .. } | ActionPayload::Claim { .. } => None,
        ActionPayload::Unstake { amount } => Some(DomainMutation::SettleUnstake {
            wallet: record.actor.clone(),
            amount: *amount,
        }),
        ActionPayload::Commit { commit_hash, .. } => Some(DomainMutation::SettleCommit {
            commit_hash: commit_hash.clone(),
        }),
    }
}

/// The corrective mutation that undoes a record's optimistic write.
pub fn compensation_for(record: &ActionRecord) -> DomainMutation {
    match &record.payload {
        ActionPayload::Stake { amount } => DomainMutation::ReverseStake {
            wallet: record.actor.clone(),
            amount: *amount,
        },
        ActionPayload::Unstake { amount } => DomainMutation::ReverseUnstake {
            wallet: record.actor.clone(),
            amount: *amount,
        },
        ActionPayload::Claim { amount } => DomainMutation::ReverseClaim {
            wallet: record.actor.clone(),
            amount: *amount,
        },
        ActionPayload::Commit {
            commit_hash, reward, ..
        } => DomainMutation::ReverseCommit {
            wallet: record.actor.clone(),
            commit_hash: commit_hash.clone(),
            reward: *reward,
        },
    }
}
