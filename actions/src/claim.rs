//! Claim action: pay out accrued commit rewards.

use merit_store::Store;
use merit_types::{ActionKind, ActionPayload, Timestamp, WalletAddress};
use serde::Deserialize;
use serde_json::Value;

use crate::dispatcher::DispatcherConfig;
use crate::error::ActionError;
use crate::processor::ActionProcessor;

#[derive(Deserialize)]
struct ClaimParams {
    amount: u128,
}

/// Processor for `claim` actions.
pub struct ClaimProcessor;

impl ActionProcessor for ClaimProcessor {
    fn kind(&self) -> ActionKind {
        ActionKind::Claim
    }

    fn validate(&self, payload: &Value) -> Result<ActionPayload, ActionError> {
        let params: ClaimParams = serde_json::from_value(payload.clone())
            .map_err(|e| ActionError::Validation(format!("invalid claim payload: {e}")))?;
        if params.amount == 0 {
            return Err(ActionError::Validation(
                "claim amount must be positive".into(),
            ));
        }
        Ok(ActionPayload::Claim {
            amount: params.amount,
        })
    }

    fn pre_submit(
        &self,
        store: &dyn Store,
        actor: &WalletAddress,
        payload: &ActionPayload,
        _config: &DispatcherConfig,
        _now: Timestamp,
    ) -> Result<(), ActionError> {
        if let ActionPayload::Claim { amount } = payload {
            let position = store.staking_position(actor)?;
            if position.rewards_accrued < *amount {
                return Err(ActionError::Validation(format!(
                    "claim amount {} exceeds accrued rewards {}",
                    amount, position.rewards_accrued
                )));
            }
        }
        Ok(())
    }
}
