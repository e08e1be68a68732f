use merit_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action kind: {0}")]
    UnknownKind(String),

    #[error("invalid action: {0}")]
    Validation(String),

    #[error("duplicate submission: {0}")]
    Duplicate(String),

    #[error("daily commit quota ({cap}) exhausted for {wallet}")]
    QuotaExceeded { wallet: String, cap: u32 },

    #[error("storage error: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        // The in-transaction guards surface as the same errors as the
        // dispatcher's own pre-checks.
        match err {
            StoreError::Duplicate(what) => Self::Duplicate(what),
            StoreError::QuotaExceeded { wallet, cap } => Self::QuotaExceeded { wallet, cap },
            other => Self::Persistence(other),
        }
    }
}
