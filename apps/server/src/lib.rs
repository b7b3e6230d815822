//! [apps/server/src/lib.rs]
//! Probe session termination, metric ingestion, alert evaluation and
//! notification fan-out: the Warden server core as a library, so the
//! binary in `main.rs` stays a thin CLI/runtime shell.

/// Alert rule evaluation: hysteresis state machine over ingested samples.
pub mod alerting;
/// TOML configuration loading.
pub mod config;
/// HTTP-facing adapters: the probe WebSocket upgrade and the query endpoint.
pub mod handlers;
/// Raw frame decoding and side-effect dispatch for ingested probe data.
pub mod ingest;
/// Composition root: builds every component and drives the run loop.
pub mod kernel;
/// Cross-cutting HTTP layer (CORS).
pub mod middleware;
/// Outbound alert notification sinks.
pub mod notifier;
/// Router wiring.
pub mod routes;
/// Probe session lifecycle and the session table.
pub mod session;
/// Background daemons: the retention sweeper.
pub mod services;
/// Shared application state.
pub mod state;
/// Small cross-module helpers.
pub mod util;

/// Re-exports needed to start the server from `main.rs`.
pub mod prelude {
    pub use crate::config::WardenConfig;
    pub use crate::kernel::ServerKernel;
    pub use crate::state::AppState;
}
