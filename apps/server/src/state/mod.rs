//! [apps/server/src/state/mod.rs]
//! Shared application state: repositories, the time-series client, the
//! session table and the alert evaluator. Constructed once at startup and
//! cloned cheaply (every field is an `Arc` or already internally shared)
//! into every request handler and probe session task.

use std::sync::Arc;
use tokio::sync::watch;
use warden_infra_store::{
    AlertRecordRepository, AlertRuleRepository, AuditResultRepository, HostSnapshotRepository,
    ProbeRepository, StoreClient,
};
use warden_infra_timeseries::TimeSeriesClient;

use crate::alerting::AlertEvaluator;
use crate::config::WardenConfig;
use crate::notifier::Notifier;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub probes: Arc<ProbeRepository>,
    pub host_snapshots: Arc<HostSnapshotRepository>,
    pub audit_results: Arc<AuditResultRepository>,
    pub timeseries: TimeSeriesClient,
    pub sessions: Arc<SessionManager>,
    pub evaluator: Arc<AlertEvaluator>,
    /// Root shutdown signal, threaded into every probe session so a server
    /// shutdown closes sockets instead of waiting out their read deadline.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub async fn new(config: &WardenConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<Self> {
        let store = StoreClient::connect(&config.database.url, config.database.auth_token.clone()).await?;

        let notifier = Notifier::new(config.notification.clone());
        let evaluator = Arc::new(AlertEvaluator::new(
            AlertRuleRepository::new(store.clone()),
            AlertRecordRepository::new(store.clone()),
            ProbeRepository::new(store.clone()),
            notifier,
        ));

        Ok(Self {
            probes: Arc::new(ProbeRepository::new(store.clone())),
            host_snapshots: Arc::new(HostSnapshotRepository::new(store.clone())),
            audit_results: Arc::new(AuditResultRepository::new(store.clone())),
            timeseries: TimeSeriesClient::new(config.timeseries.base_url.clone()),
            sessions: Arc::new(SessionManager::new()),
            evaluator,
            shutdown,
        })
    }
}
