//! Unstake action: move staked tokens into unbonding, pending on-chain
//! settlement.

use merit_store::Store;
use merit_types::{ActionKind, ActionPayload, Timestamp, WalletAddress};
use serde::Deserialize;
use serde_json::Value;

use crate::dispatcher::DispatcherConfig;
use crate::error::ActionError;
use crate::processor::ActionProcessor;

#[derive(Deserialize)]
struct UnstakeParams {
    amount: u128,
}

/// Processor for `unstake` actions.
pub struct UnstakeProcessor;

impl ActionProcessor for UnstakeProcessor {
    fn kind(&self) -> ActionKind {
        ActionKind::Unstake
    }

    fn validate(&self, payload: &Value) -> Result<ActionPayload, ActionError> {
        let params: UnstakeParams = serde_json::from_value(payload.clone())
            .map_err(|e| ActionError::Validation(format!("invalid unstake payload: {e}")))?;
        if params.amount == 0 {
            return Err(ActionError::Validation(
                "unstake amount must be positive".into(),
            ));
        }
        Ok(ActionPayload::Unstake {
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
        if let ActionPayload::Unstake { amount } = payload {
            let position = store.staking_position(actor)?;
            if position.staked < *amount {
                return Err(ActionError::Validation(format!(
                    "unstake amount {} exceeds staked balance {}",
                    amount, position.staked
                )));
            }
        }
        Ok(())
    }
}
