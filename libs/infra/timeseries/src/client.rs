// [libs/infra/timeseries/src/client.rs]
/*!
 * Stateless HTTP client for the time-series backend. Writes are
 * best-effort at the batch level: one retry after a fixed backoff, then
 * the batch is logged and dropped rather than blocking the caller.
 */

use crate::errors::TimeSeriesError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use warden_domain_models::{Aggregation, Sample, Series};

const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
const DELETE_BATCH_ROWS: u32 = 1000;

#[derive(Clone)]
pub struct TimeSeriesClient {
    http: Client,
    base_url: String,
}

impl TimeSeriesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("warden-server/timeseries")
            .build()
            .expect("failed to build time-series http client");

        Self { http, base_url: base_url.into() }
    }

    /// Writes a batch of samples, preserving intra-batch order. A single
    /// transient failure is retried once after a fixed backoff; no
    /// ordering guarantee is made across separate calls to `write`.
    #[instrument(skip(self, samples))]
    pub async fn write(&self, samples: &[Sample]) -> Result<(), TimeSeriesError> {
        if samples.is_empty() {
            return Ok(());
        }

        match self.post_batch(samples).await {
            Ok(()) => Ok(()),
            Err(TimeSeriesError::Transient(reason)) => {
                warn!(event = "ts_write_retry", reason = %reason, "retrying batch write after backoff");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.post_batch(samples).await
            }
            Err(other) => Err(other),
        }
    }

    async fn post_batch(&self, samples: &[Sample]) -> Result<(), TimeSeriesError> {
        let url = format!("{}/write", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(WRITE_TIMEOUT)
            .json(samples)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        classify_status(response.status())
    }

    /// Range query with aggregation, used by the read API only.
    #[instrument(skip(self, labels_filter))]
    pub async fn read(
        &self,
        metric_name: &str,
        labels_filter: &[(&str, &str)],
        start_ms: i64,
        end_ms: i64,
        step_ms: i64,
        agg: Aggregation,
    ) -> Result<Vec<Series>, TimeSeriesError> {
        let url = format!("{}/query", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("name", metric_name.to_string()),
            ("start_ms", start_ms.to_string()),
            ("end_ms", end_ms.to_string()),
            ("step_ms", step_ms.to_string()),
            ("agg", agg_to_str(agg).to_string()),
        ];
        for (k, v) in labels_filter {
            query.push(("label", format!("{}={}", k, v)));
        }

        let response = self
            .http
            .get(&url)
            .timeout(READ_TIMEOUT)
            .query(&query)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        classify_status(response.status())?;

        response
            .json::<Vec<Series>>()
            .await
            .map_err(|e| TimeSeriesError::Malformed(e.to_string()))
    }

    /// Deletes samples older than `cutoff_ms`, batched at `DELETE_BATCH_ROWS`
    /// per call so the retention sweeper never holds a single long-running
    /// transaction against the backend.
    #[instrument(skip(self))]
    pub async fn delete_before(&self, cutoff_ms: i64) -> Result<u64, TimeSeriesError> {
        let url = format!("{}/delete", self.base_url);
        let mut total_deleted: u64 = 0;

        loop {
            let response = self
                .http
                .post(&url)
                .timeout(WRITE_TIMEOUT)
                .json(&serde_json::json!({ "before_ms": cutoff_ms, "limit": DELETE_BATCH_ROWS }))
                .send()
                .await
                .map_err(|e| classify_transport_error(&e))?;

            classify_status(response.status())?;

            let body: serde_json::Value =
                response.json().await.map_err(|e| TimeSeriesError::Malformed(e.to_string()))?;
            let deleted = body.get("deleted").and_then(|v| v.as_u64()).unwrap_or(0);
            total_deleted += deleted;

            debug!(event = "retention_batch_deleted", deleted, total_deleted, "retention batch applied");

            if deleted < DELETE_BATCH_ROWS as u64 {
                break;
            }
        }

        Ok(total_deleted)
    }
}

fn agg_to_str(agg: Aggregation) -> &'static str {
    match agg {
        Aggregation::Avg => "avg",
        Aggregation::Min => "min",
        Aggregation::Max => "max",
        Aggregation::Sum => "sum",
        Aggregation::Last => "last",
    }
}

fn classify_transport_error(error: &reqwest::Error) -> TimeSeriesError {
    if error.is_timeout() || error.is_connect() {
        TimeSeriesError::Transient(error.to_string())
    } else {
        TimeSeriesError::BackendUnavailable(error.to_string())
    }
}

fn classify_status(status: StatusCode) -> Result<(), TimeSeriesError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(TimeSeriesError::Transient(format!("backend returned {}", status)))
    } else if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        Err(TimeSeriesError::Malformed(format!("backend rejected request: {}", status)))
    } else {
        Err(TimeSeriesError::BackendUnavailable(format!("unexpected status: {}", status)))
    }
}
