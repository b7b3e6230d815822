// [libs/infra/timeseries/src/errors.rs]
/*! Categorical errors the writer/reader can return; the ingest path only
 * ever needs to distinguish "retry", "log and drop" and "degrade". */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeSeriesError {
    /// Network/timeout failure that may succeed on retry.
    #[error("[TS_TRANSIENT]: {0}")]
    Transient(String),

    /// The backend rejected the request body; retrying will not help.
    #[error("[TS_MALFORMED]: {0}")]
    Malformed(String),

    /// The backend has been unreachable past the transient-retry window.
    #[error("[TS_BACKEND_UNAVAILABLE]: {0}")]
    BackendUnavailable(String),
}
