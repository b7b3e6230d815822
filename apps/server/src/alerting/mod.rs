//! [apps/server/src/alerting/mod.rs]
//! Alert Evaluator (C6): the stateful per-(probe, rule, kind) threshold
//! machine with duration hysteresis, and its 30 s rule-reload tick.

pub mod evaluator;

pub use evaluator::AlertEvaluator;
