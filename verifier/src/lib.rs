//! Background verification for the merit rewards pipeline.
//!
//! Tx-backed actions are applied optimistically at submission; this crate
//! settles them afterwards by polling chain receipts. A matching receipt
//! confirms the action, a reverted or contradicted one rolls it back with
//! the kind's compensating mutation, and anything inconclusive is retried
//! until the attempt budget is spent.

pub mod service;

pub use service::{CycleStats, EntryOutcome, VerificationService, VerifierConfig};
