//! The main merit node struct — wires all pipeline subsystems together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use merit_actions::{ActionDispatcher, ActionRequest, DispatcherConfig, SubmitOutcome};
use merit_chain::{ChainClient, ReceiptProvider};
use merit_realtime::{BroadcastEvent, BroadcastManager, RealtimeServer};
use merit_store::{
    ActionStore, CommitRecord, DomainStore, StakingPosition, Store, VerificationStore,
};
use merit_store_lmdb::LmdbStore;
use merit_types::{
    ActionId, ActionRecord, ActionStatus, CommitHash, Timestamp, VerificationEntry, WalletAddress,
};
use merit_verifier::{VerificationService, VerifierConfig};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running merit node.
///
/// Owns the store, the action dispatcher, the verification service and the
/// realtime broadcaster, plus the background tasks that drive them. Build
/// with [`MeritNode::new`], then call [`start`](MeritNode::start) to spawn
/// the realtime server and the polling loops.
pub struct MeritNode {
    pub config: NodeConfig,
    pub store: Arc<LmdbStore>,
    pub dispatcher: ActionDispatcher,
    pub service: Arc<VerificationService>,
    pub broadcaster: Arc<BroadcastManager>,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: Arc<ShutdownController>,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl MeritNode {
    /// Create and initialize a new merit node.
    ///
    /// Opens the LMDB environment at `config.data_dir` and prepares all
    /// subsystems. Call [`start`](MeritNode::start) to begin serving
    /// realtime clients and polling the chain.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let chain: Arc<dyn ReceiptProvider> = Arc::new(ChainClient::new(
            &config.chain_rpc_url,
            Duration::from_secs(config.chain_request_timeout_secs),
        ));
        Self::with_receipt_provider(config, chain)
    }

    /// Create a node against a caller-supplied receipt source.
    ///
    /// Tests use this with a scripted provider instead of a live JSON-RPC
    /// endpoint; [`MeritNode::new`] delegates here with a [`ChainClient`].
    pub fn with_receipt_provider(
        config: NodeConfig,
        chain: Arc<dyn ReceiptProvider>,
    ) -> Result<Self, NodeError> {
        let map_size = config.lmdb_map_size_mb * 1024 * 1024;
        let store = Arc::new(LmdbStore::open(&config.data_dir, map_size)?);
        let dyn_store: Arc<dyn Store> = store.clone();

        let broadcaster = Arc::new(BroadcastManager::new());
        let metrics = Arc::new(NodeMetrics::new());
        let shutdown = Arc::new(ShutdownController::new());

        let dispatcher = ActionDispatcher::new(
            Arc::clone(&dyn_store),
            DispatcherConfig {
                commit_daily_quota: config.commit_daily_quota,
                verification_max_attempts: config.verification_max_attempts,
            },
        );

        let service = Arc::new(VerificationService::new(
            dyn_store,
            chain,
            Arc::clone(&broadcaster),
            VerifierConfig {
                batch_size: config.verification_batch_size,
                retry_delay_secs: config.retry_delay_secs,
                min_confirmations: config.min_confirmations,
            },
        ));

        tracing::info!(
            data_dir = %config.data_dir.display(),
            chain = %config.chain_rpc_url,
            "merit node initialized"
        );

        Ok(Self {
            config,
            store,
            dispatcher,
            service,
            broadcaster,
            metrics,
            shutdown,
            task_handles: Vec::new(),
        })
    }

    /// Spawn the realtime server and all background loops.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        self.spawn_realtime_server();
        self.spawn_verification_loop();
        self.spawn_archive_sweep();
        self.spawn_stale_sweep();

        tracing::info!(
            realtime_port = self.config.realtime_port,
            poll_interval_secs = self.config.poll_interval_secs,
            "merit node started"
        );
        Ok(())
    }

    fn spawn_realtime_server(&mut self) {
        let server = RealtimeServer::new(
            self.config.realtime_port,
            Arc::clone(&self.broadcaster),
            Arc::new(self.metrics.registry.clone()),
        );
        let shutdown_rx = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            if let Err(e) = server.start(shutdown_rx).await {
                tracing::error!("realtime server exited with error: {e}");
            }
        });
        self.task_handles.push(handle);
    }

    /// The verification loop: claim due entries, settle them against chain
    /// receipts, and reschedule. Runs every `poll_interval_secs`; a cycle
    /// that fails outright (store trouble) retries after the shorter
    /// `error_backoff_secs`.
    fn spawn_verification_loop(&mut self) {
        let service = Arc::clone(&self.service);
        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();

        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let error_backoff = Duration::from_secs(self.config.error_backoff_secs);

        let handle = tokio::spawn(async move {
            let mut delay = poll_interval;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("verification loop shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        let started = Instant::now();
                        match service.run_cycle(Timestamp::now()).await {
                            Ok(stats) => {
                                metrics
                                    .verification_cycle_seconds
                                    .observe(started.elapsed().as_secs_f64());
                                metrics.verification_attempts.inc_by(stats.claimed as u64);
                                metrics.actions_confirmed.inc_by(stats.confirmed as u64);
                                metrics.actions_rolled_back.inc_by(stats.rolled_back as u64);
                                metrics.broadcasts_sent.inc_by(stats.broadcasts_sent as u64);
                                metrics
                                    .broadcast_failures
                                    .inc_by(stats.broadcast_failures as u64);
                                match store.live_entry_count() {
                                    Ok(live) => metrics.pending_verifications.set(live as i64),
                                    Err(e) => {
                                        tracing::warn!("live entry count unavailable: {e}")
                                    }
                                }
                                delay = poll_interval;
                            }
                            Err(e) => {
                                tracing::error!("verification cycle failed: {e}");
                                delay = error_backoff;
                            }
                        }
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    /// Periodically move old finished verification entries out of the live
    /// table so due-entry scans stay small.
    fn spawn_archive_sweep(&mut self) {
        let store = Arc::clone(&self.store);
        let mut shutdown_rx = self.shutdown.subscribe();
        let archive_after = self.config.archive_after_secs;
        let sweep_interval = Duration::from_secs(self.config.archive_sweep_interval_secs);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("archive sweep shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let cutoff = Timestamp::new(
                            Timestamp::now().as_secs().saturating_sub(archive_after),
                        );
                        match store.archive_finished_entries(cutoff) {
                            Ok(0) => {}
                            Ok(archived) => {
                                tracing::info!(archived, "finished verification entries archived");
                            }
                            Err(e) => tracing::warn!("archive sweep failed: {e}"),
                        }
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    /// Periodically evict WebSocket connections that have gone quiet and
    /// refresh the connection gauge.
    fn spawn_stale_sweep(&mut self) {
        let broadcaster = Arc::clone(&self.broadcaster);
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();
        let max_idle = self.config.stale_connection_secs;
        let sweep_interval = Duration::from_secs(self.config.sweep_interval_secs);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("stale-connection sweep shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        broadcaster.sweep_stale(Timestamp::now(), max_idle).await;
                        let connected = broadcaster.connection_count().await;
                        metrics.ws_connections.set(connected as i64);
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    /// Submit one action through the dispatcher.
    ///
    /// On success the record and its optimistic effect are durable. Actions
    /// without an on-chain transaction confirm right here, and subscribers
    /// hear about them immediately; tx-backed actions stay pending until the
    /// verification loop settles them.
    pub async fn submit_action(&self, request: &ActionRequest) -> Result<SubmitOutcome, NodeError> {
        let outcome = match self.dispatcher.process(request, Timestamp::now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.action_errors.inc();
                return Err(e.into());
            }
        };
        self.metrics.actions_submitted.inc();

        if outcome.record.status == ActionStatus::Confirmed {
            let event = BroadcastEvent::for_action(&outcome.record, None);
            let report = self.broadcaster.broadcast(&event).await;
            self.metrics.broadcasts_sent.inc_by(report.sent as u64);
            self.metrics.broadcast_failures.inc_by(report.failed as u64);
        }

        Ok(outcome)
    }

    // ── Read accessors ──────────────────────────────────────────────────

    pub fn action(&self, id: &ActionId) -> Result<ActionRecord, NodeError> {
        Ok(self.store.get_action(id)?)
    }

    pub fn actions_for_wallet(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<ActionRecord>, NodeError> {
        Ok(self.store.actions_for_wallet(wallet, limit)?)
    }

    pub fn staking_position(&self, wallet: &WalletAddress) -> Result<StakingPosition, NodeError> {
        Ok(self.store.staking_position(wallet)?)
    }

    pub fn commit_record(&self, commit_hash: &CommitHash) -> Result<Option<CommitRecord>, NodeError> {
        Ok(self.store.commit_record(commit_hash)?)
    }

    pub fn verification_entry_for_action(
        &self,
        action_id: &ActionId,
    ) -> Result<Option<VerificationEntry>, NodeError> {
        Ok(self.store.entry_for_action(action_id)?)
    }

    /// Signal shutdown and wait for the background tasks to finish.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("merit node stopping");

        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err()
        {
            tracing::warn!(
                "shutdown timeout ({:?}) — some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        if let (Ok(actions), Ok(pending)) =
            (self.store.action_count(), self.store.live_entry_count())
        {
            tracing::info!(actions, pending_verifications = pending, "merit node stopped");
        } else {
            tracing::info!("merit node stopped");
        }
        Ok(())
    }
}
