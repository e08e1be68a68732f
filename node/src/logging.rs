//! Tracing setup for the merit node.
//!
//! The daemon calls [`init_logging`] once, before any subsystem starts, with
//! the format and level taken from [`NodeConfig`](crate::NodeConfig). A
//! `RUST_LOG` environment variable, when present, takes precedence over the
//! configured level and supports per-target directives such as
//! `"warn,merit_verifier=debug"`.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::NodeError;

/// Output format for structured logs.
///
/// Parsed from the `log_format` config field; accepts `"human"` and `"json"`
/// in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact, coloured lines for terminals.
    Human,
    /// Newline-delimited JSON for log aggregation pipelines.
    Json,
}

impl FromStr for LogFormat {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Config(format!(
                "unknown log format {other:?}, expected \"human\" or \"json\""
            ))),
        }
    }
}

/// Install the global tracing subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Call it exactly once,
/// from `main`.
pub fn init_logging(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Human => {
            registry
                .with(fmt::layer().compact().with_target(true))
                .init();
        }
        LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(false),
                )
                .init();
        }
    }
}
