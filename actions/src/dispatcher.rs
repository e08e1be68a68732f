//! Closed-kind dispatch: parse, validate, pre-check, persist.

use std::sync::Arc;

use merit_store::Store;
use merit_types::{ActionKind, ActionRecord, Timestamp, TxHash, VerificationEntry, WalletAddress};

use crate::claim::ClaimProcessor;
use crate::commit::CommitProcessor;
use crate::error::ActionError;
use crate::processor::ActionProcessor;
use crate::request::{ActionRequest, SubmitOutcome};
use crate::stake::StakeProcessor;
use crate::unstake::UnstakeProcessor;

/// Tunables for the submission path.
#[derive(Clone, Copy, Debug)]
pub struct DispatcherConfig {
    /// Commit submissions allowed per wallet per UTC day.
    pub commit_daily_quota: u32,
    /// Verification attempts before an entry is failed and compensated.
    pub verification_max_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            commit_daily_quota: 20,
            verification_max_attempts: 10,
        }
    }
}

/// Resolve the processor for a kind.
///
/// Adding a kind means adding a variant and an arm here; there is no
/// runtime registry to fall out of sync with.
pub fn processor_for(kind: ActionKind) -> &'static dyn ActionProcessor {
    match kind {
        ActionKind::Stake => &StakeProcessor,
        ActionKind::Unstake => &UnstakeProcessor,
        ActionKind::Claim => &ClaimProcessor,
        ActionKind::Commit => &CommitProcessor,
    }
}

/// The submission entry point of the pipeline.
pub struct ActionDispatcher {
    store: Arc<dyn Store>,
    config: DispatcherConfig,
}

impl ActionDispatcher {
    pub fn new(store: Arc<dyn Store>, config: DispatcherConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Validate, pre-check and persist one submission.
    ///
    /// On success the record, its verification entry (tx-backed actions
    /// only) and the optimistic mutation are all durable, written in one
    /// storage transaction.
    pub fn process(
        &self,
        request: &ActionRequest,
        now: Timestamp,
    ) -> Result<SubmitOutcome, ActionError> {
        let kind: ActionKind = request
            .kind
            .parse()
            .map_err(|_| ActionError::UnknownKind(request.kind.clone()))?;
        let actor = WalletAddress::parse(&request.wallet)
            .map_err(|e| ActionError::Validation(e.to_string()))?;
        let tx_hash = request
            .tx_hash
            .as_deref()
            .map(TxHash::parse)
            .transpose()
            .map_err(|e| ActionError::Validation(e.to_string()))?;

        let processor = processor_for(kind);
        let payload = processor.validate(&request.payload)?;
        processor.pre_submit(self.store.as_ref(), &actor, &payload, &self.config, now)?;

        let record = ActionRecord::new(actor, payload, tx_hash, now);
        let entry = record.tx_hash.map(|tx_hash| {
            VerificationEntry::new(&record, tx_hash, self.config.verification_max_attempts, now)
        });
        let mutation = processor.optimistic_mutation(&record);
        let quota_cap = match kind {
            ActionKind::Commit => Some(self.config.commit_daily_quota),
            _ => None,
        };

        let snapshot = self
            .store
            .submit_action(&record, entry.as_ref(), &mutation, quota_cap)?;
        tracing::debug!(
            action = %record.id,
            kind = %kind,
            wallet = %record.actor,
            status = %record.status,
            "action accepted"
        );
        Ok(SubmitOutcome { record, snapshot })
    }
}
