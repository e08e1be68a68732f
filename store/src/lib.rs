//! Abstract storage traits for the merit rewards pipeline.
//!
//! Every storage backend (LMDB in production, in-memory for tests) implements
//! these traits. The rest of the codebase depends only on the traits.
//!
//! Atomicity lives at this boundary: each composite operation
//! ([`ActionStore::submit_action`], [`VerificationStore::claim_due_entries`],
//! [`VerificationStore::complete_entry`], [`VerificationStore::fail_entry`])
//! is specified as a single storage transaction, so callers never see a
//! half-applied logical step.

pub mod action;
pub mod domain;
pub mod error;
pub mod verification;

pub use action::ActionStore;
pub use domain::{
    apply_to_position, commit_row_effect, CommitRecord, CommitRowEffect, CommitStatus,
    DomainMutation, DomainSnapshot, DomainStore, StakingPosition,
};
pub use error::StoreError;
pub use verification::VerificationStore;

/// Everything the pipeline needs from a storage backend.
pub trait Store: ActionStore + VerificationStore + DomainStore + Send + Sync {}

impl<T: ActionStore + VerificationStore + DomainStore + Send + Sync> Store for T {}
