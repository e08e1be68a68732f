//! Action processing for the merit rewards pipeline.
//!
//! Action kinds:
//! - **Stake**: lock tokens into the actor's staking position
//! - **Unstake**: move staked tokens into unbonding, settled on confirmation
//! - **Claim**: pay out accrued commit rewards
//! - **Commit**: reward a scored contribution commit (quota- and
//!   duplicate-guarded)
//!
//! The dispatcher parses and validates raw requests, runs per-kind
//! pre-checks, and persists the record, verification entry and optimistic
//! mutation in one storage transaction.

pub mod claim;
pub mod commit;
pub mod dispatcher;
pub mod error;
pub mod processor;
pub mod request;
pub mod stake;
pub mod unstake;

pub use dispatcher::{processor_for, ActionDispatcher, DispatcherConfig};
pub use error::ActionError;
pub use processor::{
    compensation_for, confirm_mutation_for, optimistic_mutation_for, ActionProcessor,
};
pub use request::{ActionRequest, SubmitOutcome};
