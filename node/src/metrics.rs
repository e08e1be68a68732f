//! Prometheus metrics for the merit node.
//!
//! Covers the action lifecycle (submitted, confirmed, rolled back), the
//! verification loop, and realtime delivery.  The [`NodeMetrics`] struct
//! owns a dedicated [`Registry`] that the realtime server's `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total actions accepted by the dispatcher.
    pub actions_submitted: IntCounter,
    /// Total actions whose on-chain transaction was confirmed.
    pub actions_confirmed: IntCounter,
    /// Total actions rolled back after verification failed.
    pub actions_rolled_back: IntCounter,
    /// Total submissions rejected by validation or quota checks.
    pub action_errors: IntCounter,
    /// Total verification entries claimed across all cycles.
    pub verification_attempts: IntCounter,
    /// Total realtime events delivered to connected clients.
    pub broadcasts_sent: IntCounter,
    /// Total realtime deliveries that failed (dead connections).
    pub broadcast_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current number of live (unarchived, unfinished) verification entries.
    pub pending_verifications: IntGauge,
    /// Current number of connected WebSocket clients.
    pub ws_connections: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall-clock duration of a verification cycle, in seconds.
    pub verification_cycle_seconds: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let actions_submitted = register_int_counter_with_registry!(
            Opts::new(
                "merit_actions_submitted_total",
                "Total actions accepted by the dispatcher"
            ),
            registry
        )
        .expect("failed to register actions_submitted counter");

        let actions_confirmed = register_int_counter_with_registry!(
            Opts::new(
                "merit_actions_confirmed_total",
                "Total actions confirmed on-chain"
            ),
            registry
        )
        .expect("failed to register actions_confirmed counter");

        let actions_rolled_back = register_int_counter_with_registry!(
            Opts::new(
                "merit_actions_rolled_back_total",
                "Total actions rolled back after failed verification"
            ),
            registry
        )
        .expect("failed to register actions_rolled_back counter");

        let action_errors = register_int_counter_with_registry!(
            Opts::new(
                "merit_action_errors_total",
                "Total submissions rejected by validation or quota checks"
            ),
            registry
        )
        .expect("failed to register action_errors counter");

        let verification_attempts = register_int_counter_with_registry!(
            Opts::new(
                "merit_verification_attempts_total",
                "Total verification entries claimed across all cycles"
            ),
            registry
        )
        .expect("failed to register verification_attempts counter");

        let broadcasts_sent = register_int_counter_with_registry!(
            Opts::new(
                "merit_broadcasts_sent_total",
                "Total realtime events delivered to clients"
            ),
            registry
        )
        .expect("failed to register broadcasts_sent counter");

        let broadcast_failures = register_int_counter_with_registry!(
            Opts::new(
                "merit_broadcast_failures_total",
                "Total realtime deliveries that failed"
            ),
            registry
        )
        .expect("failed to register broadcast_failures counter");

        // Gauges
        let pending_verifications = register_int_gauge_with_registry!(
            Opts::new(
                "merit_pending_verifications",
                "Current number of live verification entries"
            ),
            registry
        )
        .expect("failed to register pending_verifications gauge");

        let ws_connections = register_int_gauge_with_registry!(
            Opts::new(
                "merit_ws_connections",
                "Current number of connected WebSocket clients"
            ),
            registry
        )
        .expect("failed to register ws_connections gauge");

        // Histograms – exponential buckets covering 1 ms → ~16 s.
        let verification_cycle_seconds = register_histogram_with_registry!(
            HistogramOpts::new(
                "merit_verification_cycle_seconds",
                "Verification cycle duration in seconds"
            )
            .buckets(prometheus::exponential_buckets(0.001, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register verification_cycle_seconds histogram");

        Self {
            registry,
            actions_submitted,
            actions_confirmed,
            actions_rolled_back,
            action_errors,
            verification_attempts,
            broadcasts_sent,
            broadcast_failures,
            pending_verifications,
            ws_connections,
            verification_cycle_seconds,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
