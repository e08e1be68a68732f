//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::LmdbError;

/// Schema version stamped into `meta` on first open.
const SCHEMA_VERSION: u32 = 1;

/// Wraps the LMDB environment and all database handles.
///
/// One environment holds every table, so a single `RwTxn` can span an action
/// record, its verification entry, the secondary indexes and the domain rows.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    /// action_id(16) -> bincode(ActionRecord)
    pub(crate) actions_db: Database<Bytes, Bytes>,
    /// commit_hash(40, utf8) -> action_id(16). Uniqueness guard for commits.
    pub(crate) action_by_commit_db: Database<Bytes, Bytes>,
    /// tx_hash(32) -> action_id(16). Uniqueness guard for tx-backed actions.
    pub(crate) action_by_tx_db: Database<Bytes, Bytes>,
    /// wallet(42, utf8) ++ created_at_be(8) ++ action_id(16) -> empty.
    /// Reverse range scan lists a wallet's actions newest first.
    pub(crate) actions_by_wallet_db: Database<Bytes, Bytes>,
    /// wallet(42, utf8) ++ day_be(8) -> count_be(4). Daily commit quota.
    pub(crate) commit_quota_db: Database<Bytes, Bytes>,
    /// entry_id(16) -> bincode(VerificationEntry)
    pub(crate) entries_db: Database<Bytes, Bytes>,
    /// scheduled_for_be(8) ++ entry_id(16) -> empty. Due index; big-endian
    /// seconds sort lexicographically in time order, so ascending scans are
    /// FIFO by schedule.
    pub(crate) entries_due_db: Database<Bytes, Bytes>,
    /// action_id(16) -> entry_id(16). One verification lifecycle per action.
    pub(crate) entry_by_action_db: Database<Bytes, Bytes>,
    /// entry_id(16) -> bincode(VerificationEntry). Terminal entries past the
    /// retention window. Never read by the pipeline.
    pub(crate) entries_archive_db: Database<Bytes, Bytes>,
    /// wallet(42, utf8) -> bincode(StakingPosition)
    pub(crate) positions_db: Database<Bytes, Bytes>,
    /// commit_hash(40, utf8) -> bincode(CommitRecord)
    pub(crate) commits_db: Database<Bytes, Bytes>,
    /// Miscellaneous metadata (schema version).
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Heed(e.to_string()))?;

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(max_dbs);
        // SAFETY: each environment path is opened once per process; the node
        // owns its data directory exclusively.
        let env = unsafe { options.open(path) }?;

        let mut wtxn = env.write_txn()?;
        let actions_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("actions"))?;
        let action_by_commit_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("action_by_commit"))?;
        let action_by_tx_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("action_by_tx"))?;
        let actions_by_wallet_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("actions_by_wallet"))?;
        let commit_quota_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("commit_quota"))?;
        let entries_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("entries"))?;
        let entries_due_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("entries_due"))?;
        let entry_by_action_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("entry_by_action"))?;
        let entries_archive_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("entries_archive"))?;
        let positions_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some("positions"))?;
        let commits_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("commits"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        if meta_db.get(&wtxn, b"schema_version")?.is_none() {
            meta_db.put(&mut wtxn, b"schema_version", &SCHEMA_VERSION.to_be_bytes())?;
        }
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            actions_db,
            action_by_commit_db,
            action_by_tx_db,
            actions_by_wallet_db,
            commit_quota_db,
            entries_db,
            entries_due_db,
            entry_by_action_db,
            entries_archive_db,
            positions_db,
            commits_db,
            meta_db,
        })
    }

    /// The raw heed environment, for opening transactions.
    pub fn env(&self) -> &Env {
        &self.env
    }
}
