//! Merit node — orchestrates the full action pipeline.
//!
//! The node is the central coordinator that:
//! - Accepts user actions and applies their effects optimistically
//! - Polls the chain for transaction receipts and settles pending actions
//! - Rolls back actions whose transactions revert or never finalize
//! - Fans lifecycle events out to WebSocket subscribers
//! - Archives finished verification work and evicts stale connections

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::MeritNode;
pub use shutdown::ShutdownController;
