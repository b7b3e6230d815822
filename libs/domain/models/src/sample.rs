// [libs/domain/models/src/sample.rs]
/*!
 * The canonical internal time-series record, and the closed set of
 * well-known metric names the converter is allowed to emit.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use typeshare::typeshare;

/// A single `(name, labels, value, timestamp)` tuple bound for the
/// time-series backend. `labels` always contains `agent_id`.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    #[typeshare(serialized_as = "number")]
    pub timestamp_ms: i64,
}

impl Sample {
    /// Convenience constructor that seeds `labels` with `agent_id`, the one
    /// label every sample in the system carries regardless of metric kind.
    pub fn new(name: impl Into<String>, agent_id: &str, value: f64, timestamp_ms: i64) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("agent_id".to_string(), agent_id.to_string());
        Self { name: name.into(), labels, value, timestamp_ms }
    }

    /// Attaches an additional label, returning `self` for chaining at the
    /// converter's call site.
    pub fn with_label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }
}

/// Aggregation applied by a range `Read` query against the time-series
/// backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Sum,
    Last,
}

/// One bucketed point returned by a range query.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    #[typeshare(serialized_as = "number")]
    pub timestamp_ms: i64,
    pub value: f64,
}

/// A named, labelled series as returned by `Read`.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub points: Vec<SeriesPoint>,
}
