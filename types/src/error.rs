//! Parse errors for the core types.

use thiserror::Error;

/// Errors produced when parsing wire representations of core types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("invalid commit hash: {0}")]
    InvalidCommitHash(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("unknown action kind: {0}")]
    UnknownActionKind(String),
}
