//! Commit action: reward a scored contribution commit.

use merit_store::Store;
use merit_types::{ActionKind, ActionPayload, CommitHash, Timestamp, WalletAddress};
use serde::Deserialize;
use serde_json::Value;

use crate::dispatcher::DispatcherConfig;
use crate::error::ActionError;
use crate::processor::ActionProcessor;

#[derive(Deserialize)]
struct CommitParams {
    commit_hash: String,
    repository: String,
    reward: u128,
}

/// Processor for `commit` actions.
pub struct CommitProcessor;

impl ActionProcessor for CommitProcessor {
    fn kind(&self) -> ActionKind {
        ActionKind::Commit
    }

    fn validate(&self, payload: &Value) -> Result<ActionPayload, ActionError> {
        let params: CommitParams = serde_json::from_value(payload.clone())
            .map_err(|e| ActionError::Validation(format!("invalid commit payload: {e}")))?;
        let commit_hash = CommitHash::parse(&params.commit_hash)
            .map_err(|e| ActionError::Validation(e.to_string()))?;
        if params.repository.trim().is_empty() {
            return Err(ActionError::Validation(
                "commit repository must not be empty".into(),
            ));
        }
        if params.reward == 0 {
            return Err(ActionError::Validation(
                "commit reward must be positive".into(),
            ));
        }
        Ok(ActionPayload::Commit {
            commit_hash,
            repository: params.repository,
            reward: params.reward,
        })
    }

    /// Duplicate and quota checks. Both are re-checked inside the submit
    /// transaction; this pass exists to reject cheaply before building the
    /// record.
    fn pre_submit(
        &self,
        store: &dyn Store,
        actor: &WalletAddress,
        payload: &ActionPayload,
        config: &DispatcherConfig,
        now: Timestamp,
    ) -> Result<(), ActionError> {
        if let ActionPayload::Commit { commit_hash, .. } = payload {
            if store.find_action_by_commit(commit_hash)?.is_some() {
                return Err(ActionError::Duplicate(format!("commit {commit_hash}")));
            }
            let used = store.commit_count_for_day(actor, now.day_number())?;
            if used >= config.commit_daily_quota {
                return Err(ActionError::QuotaExceeded {
                    wallet: actor.to_string(),
                    cap: config.commit_daily_quota,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "commit_hash": "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3",
            "repository": "merit-dao/contracts",
            "reward": 25,
        })
    }

    #[test]
    fn accepts_valid_commit() {
        let payload = CommitProcessor.validate(&valid_payload()).unwrap();
        match payload {
            ActionPayload::Commit {
                commit_hash,
                repository,
                reward,
            } => {
                assert_eq!(
                    commit_hash.as_str(),
                    "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3"
                );
                assert_eq!(repository, "merit-dao/contracts");
                assert_eq!(reward, 25);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_commit_hash() {
        let err = CommitProcessor.validate(&json!({
            "commit_hash": "not-a-hash",
            "repository": "merit-dao/contracts",
            "reward": 25,
        }));
        assert!(matches!(err, Err(ActionError::Validation(_))));
    }

    #[test]
    fn rejects_empty_repository() {
        let err = CommitProcessor.validate(&json!({
            "commit_hash": "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3",
            "repository": "  ",
            "reward": 25,
        }));
        assert!(matches!(err, Err(ActionError::Validation(_))));
    }

    #[test]
    fn rejects_zero_reward() {
        let err = CommitProcessor.validate(&json!({
            "commit_hash": "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3",
            "repository": "merit-dao/contracts",
            "reward": 0,
        }));
        assert!(matches!(err, Err(ActionError::Validation(_))));
    }
}
