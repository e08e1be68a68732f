//! Verification queue storage trait.

use crate::{DomainMutation, StoreError};
use merit_types::{ActionId, ActionRecord, EntryId, Timestamp, VerificationEntry};

/// Trait for the durable verification queue.
///
/// Every method that transitions an entry also transitions the owning action
/// record in the same storage transaction, and every transition is guarded by
/// the current status, so a terminal entry can never be completed or failed a
/// second time.
pub trait VerificationStore {
    fn get_entry(&self, id: &EntryId) -> Result<VerificationEntry, StoreError>;

    /// The entry owned by this action, if one exists.
    fn entry_for_action(&self, action_id: &ActionId)
        -> Result<Option<VerificationEntry>, StoreError>;

    /// Claim up to `limit` due entries, oldest `scheduled_for` first.
    ///
    /// For each claimed entry, in one transaction: status `pending` ->
    /// `processing`, `attempts += 1`, `last_attempt_at = now`, and the owning
    /// record moves `pending` -> `verifying` on the first claim. An entry
    /// whose status changed since it became due is skipped, so no two
    /// claimants can hold the same entry.
    fn claim_due_entries(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<VerificationEntry>, StoreError>;

    /// Return a `processing` entry to `pending`, rescheduled for
    /// `next_poll`, recording why this attempt did not settle it.
    fn release_entry_for_retry(
        &self,
        id: &EntryId,
        next_poll: Timestamp,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Terminal success: entry -> `completed`, record -> `confirmed`, and
    /// the kind's confirmation side effect (if any) applied, atomically.
    /// Returns the updated record.
    fn complete_entry(
        &self,
        id: &EntryId,
        effect: Option<&DomainMutation>,
        now: Timestamp,
    ) -> Result<ActionRecord, StoreError>;

    /// Terminal failure: entry -> `failed` with `reason`, record ->
    /// `rolled_back`, and the compensating mutation applied, atomically.
    /// The status guard makes a second call an `InvalidTransition` error,
    /// so compensation runs at most once per entry. Returns the updated
    /// record.
    fn fail_entry(
        &self,
        id: &EntryId,
        compensation: &DomainMutation,
        reason: &str,
        now: Timestamp,
    ) -> Result<ActionRecord, StoreError>;

    /// Entries currently waiting or claimed (not terminal, not archived).
    fn live_entry_count(&self) -> Result<u64, StoreError>;

    /// Move terminal entries finished before `cutoff` to the archive table.
    /// Returns how many were moved. The pipeline never reads the archive.
    fn archive_finished_entries(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    fn archived_entry_count(&self) -> Result<u64, StoreError>;
}
