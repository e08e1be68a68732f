//! Domain state: staking positions, commit records, and the mutations the
//! pipeline applies to them.
//!
//! Mutations are closed and total. Every optimistic write, confirmation side
//! effect and compensating write in the system is one of these variants, so a
//! backend applies them with a single exhaustive match and compensation is an
//! ordinary forward write, never a storage-level rollback.

use crate::StoreError;
use merit_types::{ActionId, CommitHash, Timestamp, WalletAddress};
use serde::{Deserialize, Serialize};

/// Per-wallet staking state, zero-valued until first touched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPosition {
    pub wallet: WalletAddress,
    /// Tokens currently staked.
    pub staked: u128,
    /// Tokens moving out of the stake, awaiting on-chain settlement.
    pub unbonding: u128,
    /// Rewards earned from commits, not yet claimed.
    pub rewards_accrued: u128,
    /// Rewards paid out over the lifetime of the wallet.
    pub rewards_claimed: u128,
    pub updated_at: Timestamp,
}

impl StakingPosition {
    pub fn empty(wallet: WalletAddress) -> Self {
        Self {
            wallet,
            staked: 0,
            unbonding: 0,
            rewards_accrued: 0,
            rewards_claimed: 0,
            updated_at: Timestamp::EPOCH,
        }
    }
}

/// Settlement state of a rewarded commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    /// Reward granted optimistically, on-chain payout not yet verified.
    Pending,
    /// Reward settled (verified on-chain, or granted off-chain).
    Rewarded,
    /// Reward reversed after failed verification.
    Reversed,
}

/// A rewarded contribution commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_hash: CommitHash,
    pub wallet: WalletAddress,
    pub repository: String,
    pub reward: u128,
    /// The action that granted this reward.
    pub action_id: ActionId,
    pub status: CommitStatus,
    pub recorded_at: Timestamp,
}

/// A single corrective or forward write against the domain state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainMutation {
    /// Optimistic stake: move tokens into the position.
    Stake { wallet: WalletAddress, amount: u128 },
    /// Compensation for a failed stake.
    ReverseStake { wallet: WalletAddress, amount: u128 },
    /// Optimistic unstake: staked -> unbonding.
    BeginUnstake { wallet: WalletAddress, amount: u128 },
    /// Confirmation side effect: unbonding tokens have left the platform.
    SettleUnstake { wallet: WalletAddress, amount: u128 },
    /// Compensation for a failed unstake: unbonding -> staked.
    ReverseUnstake { wallet: WalletAddress, amount: u128 },
    /// Optimistic claim: accrued -> claimed.
    Claim { wallet: WalletAddress, amount: u128 },
    /// Compensation for a failed claim.
    ReverseClaim { wallet: WalletAddress, amount: u128 },
    /// Optimistic commit reward: insert the commit row and accrue the reward.
    RewardCommit { record: CommitRecord },
    /// Confirmation side effect: flip the commit row to `rewarded`.
    SettleCommit { commit_hash: CommitHash },
    /// Compensation for a failed commit reward: flip the row to `reversed`
    /// and take the reward back out of the accrued balance.
    ReverseCommit {
        wallet: WalletAddress,
        commit_hash: CommitHash,
        reward: u128,
    },
}

impl DomainMutation {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stake { .. } => "stake",
            Self::ReverseStake { .. } => "reverse_stake",
            Self::BeginUnstake { .. } => "begin_unstake",
            Self::SettleUnstake { .. } => "settle_unstake",
            Self::ReverseUnstake { .. } => "reverse_unstake",
            Self::Claim { .. } => "claim",
            Self::ReverseClaim { .. } => "reverse_claim",
            Self::RewardCommit { .. } => "reward_commit",
            Self::SettleCommit { .. } => "settle_commit",
            Self::ReverseCommit { .. } => "reverse_commit",
        }
    }

    /// The wallet whose staking position this mutation touches, if any.
    pub fn position_wallet(&self) -> Option<&WalletAddress> {
        match self {
            Self::Stake { wallet, .. }
            | Self::ReverseStake { wallet, .. }
            | Self::BeginUnstake { wallet, .. }
            | Self::SettleUnstake { wallet, .. }
            | Self::ReverseUnstake { wallet, .. }
            | Self::Claim { wallet, .. }
            | Self::ReverseClaim { wallet, .. }
            | Self::ReverseCommit { wallet, .. } => Some(wallet),
            Self::RewardCommit { record } => Some(&record.wallet),
            Self::SettleCommit { .. } => None,
        }
    }
}

/// The commit-row effect of a mutation, if it has one.
pub enum CommitRowEffect<'a> {
    Insert(&'a CommitRecord),
    SetStatus(&'a CommitHash, CommitStatus),
}

/// Extract the commit-row effect of `mutation`.
pub fn commit_row_effect(mutation: &DomainMutation) -> Option<CommitRowEffect<'_>> {
    match mutation {
        DomainMutation::RewardCommit { record } => Some(CommitRowEffect::Insert(record)),
        DomainMutation::SettleCommit { commit_hash } => {
            Some(CommitRowEffect::SetStatus(commit_hash, CommitStatus::Rewarded))
        }
        DomainMutation::ReverseCommit { commit_hash, .. } => {
            Some(CommitRowEffect::SetStatus(commit_hash, CommitStatus::Reversed))
        }
        _ => None,
    }
}

/// Apply the staking-position effect of `mutation` in place.
///
/// All arithmetic saturates: compensating a balance that was already drained
/// elsewhere clamps at zero instead of underflowing.
pub fn apply_to_position(position: &mut StakingPosition, mutation: &DomainMutation, now: Timestamp) {
    match mutation {
        DomainMutation::Stake { amount, .. } => {
            position.staked = position.staked.saturating_add(*amount);
        }
        DomainMutation::ReverseStake { amount, .. } => {
            position.staked = position.staked.saturating_sub(*amount);
        }
        DomainMutation::BeginUnstake { amount, .. } => {
            position.staked = position.staked.saturating_sub(*amount);
            position.unbonding = position.unbonding.saturating_add(*amount);
        }
        DomainMutation::SettleUnstake { amount, .. } => {
            position.unbonding = position.unbonding.saturating_sub(*amount);
        }
        DomainMutation::ReverseUnstake { amount, .. } => {
            position.unbonding = position.unbonding.saturating_sub(*amount);
            position.staked = position.staked.saturating_add(*amount);
        }
        DomainMutation::Claim { amount, .. } => {
            position.rewards_accrued = position.rewards_accrued.saturating_sub(*amount);
            position.rewards_claimed = position.rewards_claimed.saturating_add(*amount);
        }
        DomainMutation::ReverseClaim { amount, .. } => {
            position.rewards_claimed = position.rewards_claimed.saturating_sub(*amount);
            position.rewards_accrued = position.rewards_accrued.saturating_add(*amount);
        }
        DomainMutation::RewardCommit { record } => {
            position.rewards_accrued = position.rewards_accrued.saturating_add(record.reward);
        }
        DomainMutation::SettleCommit { .. } => {}
        DomainMutation::ReverseCommit { reward, .. } => {
            position.rewards_accrued = position.rewards_accrued.saturating_sub(*reward);
        }
    }
    position.updated_at = now;
}

/// Snapshot of the domain state a submission touched, returned to the caller
/// for immediate UI feedback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSnapshot {
    Staking(StakingPosition),
    Commit(CommitRecord),
}

/// Read access to domain state.
pub trait DomainStore {
    /// Current staking position, zero-valued if the wallet was never touched.
    fn staking_position(&self, wallet: &WalletAddress) -> Result<StakingPosition, StoreError>;

    fn commit_record(&self, commit_hash: &CommitHash) -> Result<Option<CommitRecord>, StoreError>;

    /// Total number of commit rows.
    fn commit_count(&self) -> Result<u64, StoreError>;
}
