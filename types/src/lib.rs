//! Core types for the merit rewards pipeline.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! wallet addresses, transaction and commit hashes, opaque ids, timestamps,
//! action records and verification queue entries.

pub mod action;
pub mod address;
pub mod error;
pub mod hash;
pub mod id;
pub mod time;
pub mod verification;

pub use action::{ActionKind, ActionPayload, ActionRecord, ActionStatus};
pub use address::WalletAddress;
pub use error::TypeError;
pub use hash::{CommitHash, TxHash};
pub use id::{ActionId, EntryId};
pub use time::{Timestamp, SECS_PER_DAY};
pub use verification::{VerificationEntry, VerificationStatus};
