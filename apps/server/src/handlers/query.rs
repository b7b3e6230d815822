//! [apps/server/src/handlers/query.rs]
//! Read-only range query endpoint over the time-series backend. Not part
//! of the ingest path; used by dashboards and ad-hoc inspection only.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use warden_domain_models::Aggregation;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub name: String,
    /// Comma-separated `key=value` pairs, e.g. `mount_point=/,agent_id=...`.
    pub labels: Option<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub step_ms: i64,
    pub agg: Aggregation,
}

pub async fn query(State(state): State<AppState>, Query(params): Query<QueryParams>) -> impl IntoResponse {
    let label_pairs = parse_labels(params.labels.as_deref());
    let labels_filter: Vec<(&str, &str)> = label_pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    match state
        .timeseries
        .read(&params.name, &labels_filter, params.start_ms, params.end_ms, params.step_ms, params.agg)
        .await
    {
        Ok(series) => Json(series).into_response(),
        Err(error) => (StatusCode::BAD_GATEWAY, error.to_string()).into_response(),
    }
}

fn parse_labels(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|s| {
        s.split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labels_splits_comma_and_equals() {
        let parsed = parse_labels(Some("mount_point=/,agent_id=abc"));
        assert_eq!(parsed, vec![("mount_point".to_string(), "/".to_string()), ("agent_id".to_string(), "abc".to_string())]);
    }

    #[test]
    fn parse_labels_handles_absence() {
        assert!(parse_labels(None).is_empty());
    }
}
