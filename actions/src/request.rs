//! Submission request and outcome types.

use merit_store::DomainSnapshot;
use merit_types::ActionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw action submission, as it arrives from the API edge.
///
/// Everything is untyped here; the dispatcher parses and validates before
/// anything touches storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action kind string (`stake`, `unstake`, `claim`, `commit`).
    pub kind: String,
    /// Actor wallet address, `0x`-prefixed hex.
    pub wallet: String,
    /// Kind-specific payload.
    pub payload: Value,
    /// Backing on-chain transaction, if the action has one.
    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl ActionRequest {
    pub fn new(kind: &str, wallet: &str, payload: Value, tx_hash: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            wallet: wallet.to_string(),
            payload,
            tx_hash: tx_hash.map(str::to_string),
        }
    }
}

/// Result of an accepted submission: the stored record plus the domain state
/// it touched, read back from the same transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub record: ActionRecord,
    pub snapshot: DomainSnapshot,
}
