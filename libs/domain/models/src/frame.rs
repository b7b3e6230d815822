// [libs/domain/models/src/frame.rs]
/*!
 * Wire-level envelope types for the probe protocol: `{type, data}` at the
 * outer layer, `{type, data, timestamp}` for the `metrics` sub-envelope.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The outer frame as received from a probe socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub data: serde_json::Value,
}

/// Discriminant of the outer frame envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Register,
    Heartbeat,
    Metrics,
    AuditResult,
    CommandAck,
    #[serde(other)]
    Other,
}

/// The `metrics` sub-envelope carried as `data` on a `metrics` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsEnvelope {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub data: serde_json::Value,
    pub timestamp: i64,
}

/// The closed set of metric kinds a `metrics` frame may carry. `Unknown`
/// absorbs anything else so the converter can log-and-drop rather than fail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
    NetworkConn,
    DiskIo,
    Gpu,
    Temperature,
    Load,
    HostInfo,
    Monitor,
    #[serde(other)]
    Unknown,
}

/// Payload of a `register` frame's `data` field. `id` is the stable UUID
/// the probe persists locally across restarts; everything else is a
/// descriptive field refreshed on every registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
}
