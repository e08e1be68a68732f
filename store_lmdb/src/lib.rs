//! LMDB storage backend for the merit rewards pipeline.
//!
//! Implements the storage traits from `merit-store` using the `heed` LMDB
//! bindings. One environment holds all tables; every composite operation runs
//! in a single write transaction.

pub mod environment;
pub mod error;
mod keys;
pub mod store;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use store::LmdbStore;
