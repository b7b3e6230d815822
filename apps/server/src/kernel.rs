//! [apps/server/src/kernel.rs]
//! Lifecycle / Wiring (C9): composition root. Builds every component in
//! the startup order the design calls for and drives the shutdown
//! sequence on Ctrl-C.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::config::WardenConfig;
use crate::routes::build_router;
use crate::services::run_retention_sweeper;
use crate::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct ServerKernel {
    listen_addr: String,
    retention_horizon_days: i64,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

impl ServerKernel {
    /// Opens the store, constructs every component and reconstructs alert
    /// state from unresolved records. Does not yet accept connections.
    #[instrument(skip(config))]
    pub async fn build(config: WardenConfig) -> anyhow::Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(&config, shutdown_rx).await?;
        state.evaluator.bootstrap(crate::util::now_ms()).await?;

        info!(event = "kernel_built", listen_addr = %config.listen_addr, "core components constructed");

        Ok(Self {
            listen_addr: config.listen_addr,
            retention_horizon_days: config.retention.horizon_days,
            state,
            shutdown_tx,
        })
    }

    /// Starts the background loops and the HTTP/WebSocket listener, and
    /// blocks until a shutdown signal is observed and the grace period for
    /// in-flight probe sessions elapses.
    pub async fn run(self) -> anyhow::Result<()> {
        let ServerKernel { listen_addr, retention_horizon_days, state, shutdown_tx } = self;

        tokio::spawn(state.sessions.clone().run_supervisor());

        let evaluator = state.evaluator.clone();
        let reload_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { evaluator.run_reload_loop(reload_shutdown).await });

        tokio::spawn(run_retention_sweeper(state.clone(), retention_horizon_days, shutdown_tx.subscribe()));

        let router = build_router(state.clone());
        let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
        info!(event = "server_listening", addr = %listen_addr, "accepting probe and query connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                info!(event = "server_shutdown_signal", "ctrl-c received, closing probe sessions");
                let _ = shutdown_tx.send(true);
                tokio::time::sleep(SHUTDOWN_GRACE).await;
            })
            .await?;

        info!(event = "server_shutdown_complete", "clean shutdown");
        Ok(())
    }
}
