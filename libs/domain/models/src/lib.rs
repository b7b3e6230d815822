// [libs/domain/models/src/lib.rs]
/*! Shared domain types for probes, samples, alert rules and records. */

pub mod alert;
pub mod frame;
pub mod host;
pub mod probe;
pub mod sample;

pub use alert::{
    AlertKind, AlertLevel, AlertRecord, AlertRule, AlertScope, AlertState, AlertStatus,
    NotificationTargets,
};
pub use frame::{FrameType, InboundFrame, MetricKind, MetricsEnvelope, RegisterPayload};
pub use host::{AuditResult, HostSnapshot};
pub use probe::{Probe, ProbeStatus};
pub use sample::{Aggregation, Sample, Series, SeriesPoint};
