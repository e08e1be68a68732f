use thiserror::Error;

/// Failure modes surfaced by the action, verification and domain stores.
///
/// Backends fold their native errors into [`Backend`](Self::Backend) and
/// [`Serialization`](Self::Serialization); the remaining variants carry
/// store semantics the dispatcher and verifier match on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    /// A wallet hit its per-day commit cap.
    #[error("daily quota ({cap}) exhausted for {wallet}")]
    QuotaExceeded { wallet: String, cap: u32 },

    /// A status change the record's lifecycle does not allow.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("storage backend: {0}")]
    Backend(String),

    #[error("serialization: {0}")]
    Serialization(String),

    /// A stored value failed to decode or an index points at a missing row.
    #[error("store corrupted: {0}")]
    Corruption(String),
}
