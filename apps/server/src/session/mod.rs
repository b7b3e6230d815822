//! [apps/server/src/session/mod.rs]
//! Session Manager (C3) and Probe Session (C4): the socket-facing half of
//! the system. `manager` owns the live session table; `probe` owns the
//! per-connection read/write loops.

pub mod manager;
pub mod probe;

pub use manager::{SendOutcome, SessionManager};
pub use probe::run_probe_session;
