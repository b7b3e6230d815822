// [libs/infra/timeseries/src/lib.rs]
/*! Time-series backend client: batched writes, range reads, retention deletes. */

pub mod client;
pub mod errors;

pub use client::TimeSeriesClient;
pub use errors::TimeSeriesError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_trailing_slash_base_url() {
        let client = TimeSeriesClient::new("http://localhost:9090/");
        // Construction must not panic regardless of trailing slash; the
        // request paths are built with a plain `format!`, so a trailing
        // slash just produces a double slash the backend tolerates.
        drop(client);
    }
}
