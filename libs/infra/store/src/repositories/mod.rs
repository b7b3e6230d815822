// [libs/infra/store/src/repositories/mod.rs]
/*! Barrel for the relational store's repository layer. */

pub mod alert_record;
pub mod alert_rule;
pub mod audit_result;
pub mod host_snapshot;
pub mod probe;

pub use alert_record::AlertRecordRepository;
pub use alert_rule::AlertRuleRepository;
pub use audit_result::AuditResultRepository;
pub use host_snapshot::HostSnapshotRepository;
pub use probe::ProbeRepository;
