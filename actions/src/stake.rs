//! Stake action: lock tokens into the actor's staking position.

use merit_types::{ActionKind, ActionPayload};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ActionError;
use crate::processor::ActionProcessor;

#[derive(Deserialize)]
struct StakeParams {
    amount: u128,
}

/// Processor for `stake` actions.
pub struct StakeProcessor;

impl ActionProcessor for StakeProcessor {
    fn kind(&self) -> ActionKind {
        ActionKind::Stake
    }

    fn validate(&self, payload: &Value) -> Result<ActionPayload, ActionError> {
        let params: StakeParams = serde_json::from_value(payload.clone())
            .map_err(|e| ActionError::Validation(format!("invalid stake payload: {e}")))?;
        if params.amount == 0 {
            return Err(ActionError::Validation(
                "stake amount must be positive".into(),
            ));
        }
        Ok(ActionPayload::Stake {
            amount: params.amount,
        })
    }
}
