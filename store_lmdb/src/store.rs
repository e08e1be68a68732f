//! LMDB implementation of the pipeline store traits.
//!
//! Every logical step — submission, claim, retry release, terminal
//! transition, archival — runs inside one `RwTxn` spanning all tables it
//! touches. LMDB allows a single write transaction at a time, so the
//! conditional checks inside each step (uniqueness guards, quota counter,
//! status guards) are authoritative: a racing writer observes either all of
//! a step or none of it.

use std::ops::Bound;
use std::path::Path;

use heed::{RoTxn, RwTxn};

use merit_store::{
    apply_to_position, commit_row_effect, ActionStore, CommitRecord, CommitRowEffect,
    DomainMutation, DomainSnapshot, DomainStore, StakingPosition, StoreError, VerificationStore,
};
use merit_types::{
    ActionId, ActionPayload, ActionRecord, ActionStatus, CommitHash, EntryId, Timestamp, TxHash,
    VerificationEntry, VerificationStatus, WalletAddress,
};

use crate::environment::LmdbEnvironment;
use crate::keys;
use crate::LmdbError;

/// Database handles the environment is opened with (includes headroom).
const MAX_DBS: u32 = 16;

/// The production storage backend.
pub struct LmdbStore {
    env: LmdbEnvironment,
}

impl LmdbStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        let env = LmdbEnvironment::open(path, MAX_DBS, map_size)?;
        Ok(Self { env })
    }

    fn load_action(&self, txn: &RoTxn, id: &ActionId) -> Result<ActionRecord, LmdbError> {
        let bytes = self
            .env
            .actions_db
            .get(txn, id.as_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("action {id}")))?;
        Ok(bincode::deserialize(bytes)?)
    }

    fn put_action(&self, txn: &mut RwTxn, record: &ActionRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.env.actions_db.put(txn, record.id.as_bytes(), &bytes)?;
        Ok(())
    }

    fn load_entry(&self, txn: &RoTxn, id: &EntryId) -> Result<VerificationEntry, LmdbError> {
        let bytes = self
            .env
            .entries_db
            .get(txn, id.as_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("verification entry {id}")))?;
        Ok(bincode::deserialize(bytes)?)
    }

    fn put_entry(&self, txn: &mut RwTxn, entry: &VerificationEntry) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(entry)?;
        self.env.entries_db.put(txn, entry.id.as_bytes(), &bytes)?;
        Ok(())
    }

    fn load_position_or_empty(
        &self,
        txn: &RoTxn,
        wallet: &WalletAddress,
    ) -> Result<StakingPosition, LmdbError> {
        match self.env.positions_db.get(txn, wallet.as_str().as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(bytes)?),
            None => Ok(StakingPosition::empty(wallet.clone())),
        }
    }

    fn load_commit(
        &self,
        txn: &RoTxn,
        hash: &CommitHash,
    ) -> Result<Option<CommitRecord>, LmdbError> {
        match self.env.commits_db.get(txn, hash.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Apply a domain mutation's position and commit-row effects inside `txn`.
    fn apply_mutation_in(
        &self,
        txn: &mut RwTxn,
        mutation: &DomainMutation,
        now: Timestamp,
    ) -> Result<(), LmdbError> {
        if let Some(wallet) = mutation.position_wallet() {
            let mut position = self.load_position_or_empty(txn, wallet)?;
            apply_to_position(&mut position, mutation, now);
            let bytes = bincode::serialize(&position)?;
            self.env
                .positions_db
                .put(txn, wallet.as_str().as_bytes(), &bytes)?;
        }

        match commit_row_effect(mutation) {
            Some(CommitRowEffect::Insert(record)) => {
                let bytes = bincode::serialize(record)?;
                self.env
                    .commits_db
                    .put(txn, record.commit_hash.as_str().as_bytes(), &bytes)?;
            }
            Some(CommitRowEffect::SetStatus(hash, status)) => {
                match self.load_commit(txn, hash)? {
                    Some(mut row) => {
                        row.status = status;
                        let bytes = bincode::serialize(&row)?;
                        self.env
                            .commits_db
                            .put(txn, hash.as_str().as_bytes(), &bytes)?;
                    }
                    None => {
                        // Saturating semantics: a missing row cannot fail the
                        // surrounding transition.
                        tracing::warn!(
                            commit = %hash,
                            mutation = mutation.name(),
                            "commit row missing, skipping status update"
                        );
                    }
                }
            }
            None => {}
        }
        Ok(())
    }
}

impl ActionStore for LmdbStore {
    fn submit_action(
        &self,
        record: &ActionRecord,
        entry: Option<&VerificationEntry>,
        mutation: &DomainMutation,
        quota_cap: Option<u32>,
    ) -> Result<DomainSnapshot, StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;

        // Uniqueness guards. Early returns drop the txn, aborting it.
        if let ActionPayload::Commit { commit_hash, .. } = &record.payload {
            if self
                .env
                .action_by_commit_db
                .get(&wtxn, commit_hash.as_str().as_bytes())
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(StoreError::Duplicate(format!("commit {commit_hash}")));
            }
        }
        if let Some(tx_hash) = &record.tx_hash {
            if self
                .env
                .action_by_tx_db
                .get(&wtxn, tx_hash.as_bytes())
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(StoreError::Duplicate(format!("tx {tx_hash}")));
            }
        }

        // Daily commit quota: checked and bumped in the same transaction so
        // two racing submissions cannot both slip under the cap.
        if let Some(cap) = quota_cap {
            let key = keys::wallet_day_key(&record.actor, record.created_at.day_number());
            let count = self
                .env
                .commit_quota_db
                .get(&wtxn, &key)
                .map_err(LmdbError::from)?
                .and_then(|b| b.try_into().ok().map(u32::from_be_bytes))
                .unwrap_or(0);
            if count >= cap {
                return Err(StoreError::QuotaExceeded {
                    wallet: record.actor.to_string(),
                    cap,
                });
            }
            self.env
                .commit_quota_db
                .put(&mut wtxn, &key, &(count + 1).to_be_bytes())
                .map_err(LmdbError::from)?;
        }

        // The record and its indexes.
        self.put_action(&mut wtxn, record)?;
        let wk = keys::wallet_time_key(&record.actor, record.created_at, &record.id);
        self.env
            .actions_by_wallet_db
            .put(&mut wtxn, &wk, &[])
            .map_err(LmdbError::from)?;
        if let ActionPayload::Commit { commit_hash, .. } = &record.payload {
            self.env
                .action_by_commit_db
                .put(&mut wtxn, commit_hash.as_str().as_bytes(), record.id.as_bytes())
                .map_err(LmdbError::from)?;
        }
        if let Some(tx_hash) = &record.tx_hash {
            self.env
                .action_by_tx_db
                .put(&mut wtxn, tx_hash.as_bytes(), record.id.as_bytes())
                .map_err(LmdbError::from)?;
        }

        // The verification entry and its indexes.
        if let Some(entry) = entry {
            self.put_entry(&mut wtxn, entry)?;
            let dk = keys::due_key(entry.scheduled_for, &entry.id);
            self.env
                .entries_due_db
                .put(&mut wtxn, &dk[..], &[])
                .map_err(LmdbError::from)?;
            self.env
                .entry_by_action_db
                .put(&mut wtxn, entry.action_id.as_bytes(), entry.id.as_bytes())
                .map_err(LmdbError::from)?;
        }

        // The optimistic domain mutation, last, so the snapshot below reads
        // back exactly what this transaction wrote.
        self.apply_mutation_in(&mut wtxn, mutation, record.created_at)?;

        let snapshot = match &record.payload {
            ActionPayload::Commit { commit_hash, .. } => {
                let row = self.load_commit(&wtxn, commit_hash)?.ok_or_else(|| {
                    StoreError::Corruption(format!("commit row missing after submit: {commit_hash}"))
                })?;
                DomainSnapshot::Commit(row)
            }
            _ => DomainSnapshot::Staking(self.load_position_or_empty(&wtxn, &record.actor)?),
        };

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(snapshot)
    }

    fn get_action(&self, id: &ActionId) -> Result<ActionRecord, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.load_action(&rtxn, id)?)
    }

    fn find_action_by_commit(
        &self,
        commit_hash: &CommitHash,
    ) -> Result<Option<ActionId>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self
            .env
            .action_by_commit_db
            .get(&rtxn, commit_hash.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(val) => {
                let arr: [u8; 16] = val
                    .try_into()
                    .map_err(|_| LmdbError::Serialization("invalid action id length".into()))?;
                Ok(Some(ActionId::from_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn find_action_by_tx(&self, tx_hash: &TxHash) -> Result<Option<ActionId>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self
            .env
            .action_by_tx_db
            .get(&rtxn, tx_hash.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(val) => {
                let arr: [u8; 16] = val
                    .try_into()
                    .map_err(|_| LmdbError::Serialization("invalid action id length".into()))?;
                Ok(Some(ActionId::from_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn actions_for_wallet(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<ActionRecord>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let prefix = wallet.as_str().as_bytes().to_vec();
        let mut upper = prefix.clone();
        keys::increment_prefix(&mut upper);
        let bounds = (
            Bound::Included(prefix.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self
            .env
            .actions_by_wallet_db
            .rev_range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for result in iter {
            if records.len() >= limit {
                break;
            }
            let (key, _) = result.map_err(LmdbError::from)?;
            if key.len() < 16 {
                continue;
            }
            let mut arr = [0u8; 16];
            arr.copy_from_slice(&key[key.len() - 16..]);
            records.push(self.load_action(&rtxn, &ActionId::from_bytes(arr))?);
        }
        Ok(records)
    }

    fn commit_count_for_day(&self, wallet: &WalletAddress, day: u64) -> Result<u32, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let key = keys::wallet_day_key(wallet, day);
        Ok(self
            .env
            .commit_quota_db
            .get(&rtxn, &key)
            .map_err(LmdbError::from)?
            .and_then(|b| b.try_into().ok().map(u32::from_be_bytes))
            .unwrap_or(0))
    }

    fn action_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.actions_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn mark_action_failed(
        &self,
        id: &ActionId,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        let mut record = self.load_action(&wtxn, id)?;
        if record.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "action {} is already {}",
                id, record.status
            )));
        }
        record.status = ActionStatus::Failed;
        record.finished_at = Some(now);
        record.failure_reason = Some(reason.to_string());
        self.put_action(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl VerificationStore for LmdbStore {
    fn get_entry(&self, id: &EntryId) -> Result<VerificationEntry, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.load_entry(&rtxn, id)?)
    }

    fn entry_for_action(
        &self,
        action_id: &ActionId,
    ) -> Result<Option<VerificationEntry>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self
            .env
            .entry_by_action_db
            .get(&rtxn, action_id.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(val) => {
                let arr: [u8; 16] = val
                    .try_into()
                    .map_err(|_| LmdbError::Serialization("invalid entry id length".into()))?;
                Ok(Some(self.load_entry(&rtxn, &EntryId::from_bytes(arr))?))
            }
            None => Ok(None),
        }
    }

    fn claim_due_entries(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<VerificationEntry>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;

        // Everything scheduled at or before `now`, oldest first.
        let upper = keys::due_key(now.plus_secs(1), &EntryId::from_bytes([0u8; 16]));
        let bounds = (Bound::<&[u8]>::Unbounded, Bound::Excluded(&upper[..]));
        let mut due_keys: Vec<Vec<u8>> = Vec::new();
        {
            let iter = self
                .env
                .entries_due_db
                .range(&wtxn, &bounds)
                .map_err(LmdbError::from)?;
            for result in iter.take(limit) {
                let (key, _) = result.map_err(LmdbError::from)?;
                due_keys.push(key.to_vec());
            }
        }

        let mut claimed = Vec::new();
        for key in due_keys {
            // The index entry is consumed whether or not the claim succeeds;
            // a released entry gets a fresh key at its new schedule.
            self.env
                .entries_due_db
                .delete(&mut wtxn, &key)
                .map_err(LmdbError::from)?;
            if key.len() != 24 {
                continue;
            }
            let mut arr = [0u8; 16];
            arr.copy_from_slice(&key[8..]);
            let entry_id = EntryId::from_bytes(arr);

            let mut entry = match self.load_entry(&wtxn, &entry_id) {
                Ok(entry) => entry,
                Err(LmdbError::NotFound(_)) => {
                    tracing::warn!(entry = %entry_id, "due index points at missing entry");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            // Conditional claim: only still-pending entries with budget left.
            if entry.status != VerificationStatus::Pending || entry.attempts_exhausted() {
                continue;
            }
            entry.status = VerificationStatus::Processing;
            entry.attempts += 1;
            entry.last_attempt_at = Some(now);
            self.put_entry(&mut wtxn, &entry)?;

            match self.load_action(&wtxn, &entry.action_id) {
                Ok(mut record) if record.status == ActionStatus::Pending => {
                    record.status = ActionStatus::Verifying;
                    self.put_action(&mut wtxn, &record)?;
                }
                Ok(_) => {}
                Err(LmdbError::NotFound(_)) => {
                    tracing::warn!(
                        entry = %entry_id,
                        action = %entry.action_id,
                        "claimed entry has no action record"
                    );
                }
                Err(e) => return Err(e.into()),
            }
            claimed.push(entry);
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(claimed)
    }

    fn release_entry_for_retry(
        &self,
        id: &EntryId,
        next_poll: Timestamp,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        let mut entry = self.load_entry(&wtxn, id)?;
        if entry.status != VerificationStatus::Processing {
            return Err(StoreError::InvalidTransition(format!(
                "entry {} is {}, expected processing",
                id, entry.status
            )));
        }
        entry.status = VerificationStatus::Pending;
        entry.scheduled_for = next_poll;
        entry.error_message = Some(error.to_string());
        self.put_entry(&mut wtxn, &entry)?;
        let dk = keys::due_key(next_poll, &entry.id);
        self.env
            .entries_due_db
            .put(&mut wtxn, &dk[..], &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn complete_entry(
        &self,
        id: &EntryId,
        effect: Option<&DomainMutation>,
        now: Timestamp,
    ) -> Result<ActionRecord, StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        let mut entry = self.load_entry(&wtxn, id)?;
        if entry.status != VerificationStatus::Processing {
            return Err(StoreError::InvalidTransition(format!(
                "entry {} is {}, expected processing",
                id, entry.status
            )));
        }
        let mut record = self.load_action(&wtxn, &entry.action_id)?;
        if record.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "action {} is already {}",
                record.id, record.status
            )));
        }

        entry.status = VerificationStatus::Completed;
        entry.finished_at = Some(now);
        entry.error_message = None;
        record.status = ActionStatus::Confirmed;
        record.finished_at = Some(now);

        if let Some(effect) = effect {
            self.apply_mutation_in(&mut wtxn, effect, now)?;
        }
        self.put_entry(&mut wtxn, &entry)?;
        self.put_action(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn fail_entry(
        &self,
        id: &EntryId,
        compensation: &DomainMutation,
        reason: &str,
        now: Timestamp,
    ) -> Result<ActionRecord, StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        let mut entry = self.load_entry(&wtxn, id)?;
        if entry.status != VerificationStatus::Processing {
            return Err(StoreError::InvalidTransition(format!(
                "entry {} is {}, expected processing",
                id, entry.status
            )));
        }
        let mut record = self.load_action(&wtxn, &entry.action_id)?;
        if record.is_terminal() {
            return Err(StoreError::InvalidTransition(format!(
                "action {} is already {}",
                record.id, record.status
            )));
        }

        entry.status = VerificationStatus::Failed;
        entry.finished_at = Some(now);
        entry.error_message = Some(reason.to_string());
        record.status = ActionStatus::RolledBack;
        record.finished_at = Some(now);
        record.failure_reason = Some(reason.to_string());

        // The compensating mutation rides the same transaction as the
        // terminal transition: rollback is all-or-nothing.
        self.apply_mutation_in(&mut wtxn, compensation, now)?;
        self.put_entry(&mut wtxn, &entry)?;
        self.put_action(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn live_entry_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let mut count = 0u64;
        let iter = self.env.entries_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (_, val) = result.map_err(LmdbError::from)?;
            let entry: VerificationEntry =
                bincode::deserialize(val).map_err(LmdbError::from)?;
            if !entry.status.is_terminal() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn archive_finished_entries(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        let mut to_move: Vec<(Vec<u8>, Vec<u8>, ActionId)> = Vec::new();
        {
            let iter = self.env.entries_db.iter(&wtxn).map_err(LmdbError::from)?;
            for result in iter {
                let (key, val) = result.map_err(LmdbError::from)?;
                let entry: VerificationEntry =
                    bincode::deserialize(val).map_err(LmdbError::from)?;
                let done_before_cutoff =
                    entry.status.is_terminal() && entry.finished_at.is_some_and(|t| t < cutoff);
                if done_before_cutoff {
                    to_move.push((key.to_vec(), val.to_vec(), entry.action_id));
                }
            }
        }
        for (key, val, action_id) in &to_move {
            self.env
                .entries_archive_db
                .put(&mut wtxn, key, val)
                .map_err(LmdbError::from)?;
            self.env
                .entries_db
                .delete(&mut wtxn, key)
                .map_err(LmdbError::from)?;
            self.env
                .entry_by_action_db
                .delete(&mut wtxn, action_id.as_bytes())
                .map_err(LmdbError::from)?;
        }
        let moved = to_move.len() as u64;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(moved)
    }

    fn archived_entry_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .entries_archive_db
            .len(&rtxn)
            .map_err(LmdbError::from)?)
    }
}

impl DomainStore for LmdbStore {
    fn staking_position(&self, wallet: &WalletAddress) -> Result<StakingPosition, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.load_position_or_empty(&rtxn, wallet)?)
    }

    fn commit_record(&self, commit_hash: &CommitHash) -> Result<Option<CommitRecord>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.load_commit(&rtxn, commit_hash)?)
    }

    fn commit_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.commits_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
