//! [apps/server/src/services/mod.rs]
//! Background loops that run independently of any single request: the
//! Retention Sweeper (C8). The Session Manager's supervisor tick and the
//! Alert Evaluator's reload tick are owned by their respective modules.

pub mod retention;

pub use retention::run_retention_sweeper;
