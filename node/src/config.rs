//! Node configuration loaded from TOML.
//!
//! Every field has a serde default, so a partial (or empty) config file is
//! valid: unspecified fields fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// JSON-RPC endpoint of the chain the contract lives on.
    #[serde(default = "default_chain_rpc_url")]
    pub chain_rpc_url: String,

    /// Per-request timeout for chain RPC calls, in seconds.
    #[serde(default = "default_chain_request_timeout_secs")]
    pub chain_request_timeout_secs: u64,

    /// Confirmations a receipt needs before it settles an action.
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,

    /// Delay between verification cycles when the previous cycle succeeded.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Shortened delay after a cycle that failed outright (store errors).
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Maximum entries claimed per verification cycle.
    #[serde(default = "default_verification_batch_size")]
    pub verification_batch_size: usize,

    /// Receipt lookups an entry gets before its action is rolled back.
    #[serde(default = "default_verification_max_attempts")]
    pub verification_max_attempts: u32,

    /// Delay before a not-yet-final entry becomes due again, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Age at which finished verification entries move to the archive.
    #[serde(default = "default_archive_after_secs")]
    pub archive_after_secs: u64,

    /// Interval between archive sweeps, in seconds.
    #[serde(default = "default_archive_sweep_interval_secs")]
    pub archive_sweep_interval_secs: u64,

    /// Commits a wallet may submit per UTC day.
    #[serde(default = "default_commit_daily_quota")]
    pub commit_daily_quota: u32,

    /// Port the realtime WebSocket server listens on.
    #[serde(default = "default_realtime_port")]
    pub realtime_port: u16,

    /// Idle time after which a WebSocket connection is presumed dead.
    #[serde(default = "default_stale_connection_secs")]
    pub stale_connection_secs: u64,

    /// Interval between stale-connection sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Log level filter (`trace`, `debug`, `info`, `warn`, `error`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: `human` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// LMDB map size in megabytes.
    #[serde(default = "default_lmdb_map_size_mb")]
    pub lmdb_map_size_mb: usize,
}

// ── Serde default helpers ───────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("merit-data")
}

fn default_chain_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_chain_request_timeout_secs() -> u64 {
    10
}

fn default_min_confirmations() -> u64 {
    3
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_error_backoff_secs() -> u64 {
    5
}

fn default_verification_batch_size() -> usize {
    20
}

fn default_verification_max_attempts() -> u32 {
    10
}

fn default_retry_delay_secs() -> u64 {
    30
}

fn default_archive_after_secs() -> u64 {
    604_800
}

fn default_archive_sweep_interval_secs() -> u64 {
    3_600
}

fn default_commit_daily_quota() -> u32 {
    20
}

fn default_realtime_port() -> u16 {
    9700
}

fn default_stale_connection_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_lmdb_map_size_mb() -> usize {
    1024
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig serializes to TOML")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chain_rpc_url: default_chain_rpc_url(),
            chain_request_timeout_secs: default_chain_request_timeout_secs(),
            min_confirmations: default_min_confirmations(),
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            verification_batch_size: default_verification_batch_size(),
            verification_max_attempts: default_verification_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            archive_after_secs: default_archive_after_secs(),
            archive_sweep_interval_secs: default_archive_sweep_interval_secs(),
            commit_daily_quota: default_commit_daily_quota(),
            realtime_port: default_realtime_port(),
            stale_connection_secs: default_stale_connection_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            lmdb_map_size_mb: default_lmdb_map_size_mb(),
        }
    }
}
