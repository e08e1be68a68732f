//! Action record storage trait.

use crate::{DomainMutation, DomainSnapshot, StoreError};
use merit_types::{ActionId, ActionRecord, CommitHash, Timestamp, TxHash, VerificationEntry, WalletAddress};

/// Trait for action record storage.
///
/// `submit_action` is the single write path for new records; everything else
/// here is read access plus the operator escape hatch.
pub trait ActionStore {
    /// Atomically persist one submission: the record, its verification entry
    /// (for tx-backed actions), and the optimistic domain mutation, in one
    /// storage transaction.
    ///
    /// The transaction also enforces uniqueness of the commit hash and tx
    /// hash, and, when `quota_cap` is given, the actor's daily commit quota
    /// (checked and bumped inside the same transaction, so two racing
    /// submissions cannot both slip under the cap).
    ///
    /// Returns the post-mutation snapshot of the touched domain state.
    fn submit_action(
        &self,
        record: &ActionRecord,
        entry: Option<&VerificationEntry>,
        mutation: &DomainMutation,
        quota_cap: Option<u32>,
    ) -> Result<DomainSnapshot, StoreError>;

    fn get_action(&self, id: &ActionId) -> Result<ActionRecord, StoreError>;

    /// The action that rewarded this commit, if one exists.
    fn find_action_by_commit(&self, commit_hash: &CommitHash)
        -> Result<Option<ActionId>, StoreError>;

    /// The action backed by this transaction, if one exists.
    fn find_action_by_tx(&self, tx_hash: &TxHash) -> Result<Option<ActionId>, StoreError>;

    /// Most recent actions for a wallet, newest first, up to `limit`.
    fn actions_for_wallet(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<ActionRecord>, StoreError>;

    /// Number of commit actions the wallet submitted on the given UTC day.
    fn commit_count_for_day(&self, wallet: &WalletAddress, day: u64) -> Result<u32, StoreError>;

    fn action_count(&self) -> Result<u64, StoreError>;

    /// Park a non-terminal record in `failed` when a terminal transition
    /// could not be applied. Operator reconciliation path, not the normal
    /// rollback route.
    fn mark_action_failed(
        &self,
        id: &ActionId,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError>;
}
