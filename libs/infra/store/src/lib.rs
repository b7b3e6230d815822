// [libs/infra/store/src/lib.rs]
/*! Relational store adapter: connection management, schema, repositories. */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::StoreClient;
pub use errors::StoreError;
pub use repositories::{
    AlertRecordRepository, AlertRuleRepository, AuditResultRepository, HostSnapshotRepository,
    ProbeRepository,
};
