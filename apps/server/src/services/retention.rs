//! [apps/server/src/services/retention.rs]
//! Retention Sweeper (C8): an hourly loop that instructs the time-series
//! backend to delete samples older than the configured horizon.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[instrument(skip(state, shutdown))]
pub async fn run_retention_sweeper(state: AppState, horizon_days: i64, mut shutdown: watch::Receiver<bool>) {
    let horizon_ms = horizon_days * 24 * 60 * 60 * 1000;
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cutoff_ms = crate::util::now_ms() - horizon_ms;
                match state.timeseries.delete_before(cutoff_ms).await {
                    Ok(deleted) => info!(event = "retention_sweep_complete", deleted, cutoff_ms, "retention sweep applied"),
                    Err(error) => warn!(event = "retention_sweep_failed", error = %error, "retention sweep request failed"),
                }
            }
            _ = shutdown.changed() => {
                info!(event = "retention_sweeper_shutdown", "retention sweeper stopping");
                return;
            }
        }
    }
}
